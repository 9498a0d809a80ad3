//! Benchmark configuration, loadable from JSON with per-field defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use ccl_core::dataset::{ReplicationSpec, SparsityWindow};
use ccl_core::kernel::MAX_CELLS_PER_MODULE;

use crate::strategy::{LayoutMode, ResidencyMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Binary cell stream to benchmark. When the file is missing the sweep
    /// logs and skips rather than failing.
    pub dataset_path: PathBuf,
    /// Identifier written into the results header.
    pub dataset_id: u32,
    pub output_path: PathBuf,
    pub sparsity: SparsityWindow,
    pub replication: ReplicationSpec,
    pub trial_count: u32,
    /// Kernel launches per iteration; the first launch is where lazily
    /// migrated residencies pay their transfer cost.
    pub kernel_count: u32,
    pub max_cells_per_module: u32,
    pub residencies: Vec<ResidencyMode>,
    pub layouts: Vec<LayoutMode>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/cells.bin"),
            dataset_id: 0,
            output_path: PathBuf::from("results.txt"),
            sparsity: SparsityWindow::default(),
            replication: ReplicationSpec::default(),
            trial_count: 10,
            kernel_count: 2,
            max_cells_per_module: MAX_CELLS_PER_MODULE as u32,
            residencies: ResidencyMode::ALL.to_vec(),
            layouts: LayoutMode::ALL.to_vec(),
        }
    }
}

impl BenchConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_cells_per_module as usize > MAX_CELLS_PER_MODULE {
            bail!(
                "max_cells_per_module {} exceeds kernel capacity {}",
                self.max_cells_per_module,
                MAX_CELLS_PER_MODULE
            );
        }
        if self.kernel_count == 0 {
            bail!("kernel_count must be at least 1");
        }
        if self.trial_count == 0 {
            bail!("trial_count must be at least 1");
        }
        if self.residencies.is_empty() || self.layouts.is_empty() {
            bail!("residencies and layouts must be non-empty");
        }
        Ok(())
    }
}
