//! Results table writer.
//!
//! Plain-text format: a version line, then one header row per benchmarked
//! configuration followed by its trial rows. All phase durations are in
//! microseconds with `-1` marking phases the configuration never runs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use ccl_core::dataset::Dataset;

use crate::strategy::Combo;
use crate::timing::PhaseTimings;

/// Bumped when the row layout changes.
pub const RESULTS_FORMAT_VERSION: u32 = 2;

pub struct ResultsWriter {
    writer: BufWriter<File>,
}

impl ResultsWriter {
    /// Creates the results file. An existing file is never overwritten; the
    /// sweep then runs without persisting its table.
    pub fn create(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            warn!(path = %path.display(), "results file already exists, refusing to overwrite");
            return Ok(None);
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create results file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{RESULTS_FORMAT_VERSION}")?;
        Ok(Some(Self { writer }))
    }

    /// One header row per configuration: identity of the workload and the
    /// residency/layout ids the analysis scripts key on.
    pub fn write_run_header(
        &mut self,
        dataset: &Dataset,
        trial_count: u32,
        kernel_count: u32,
        combo: Combo,
    ) -> Result<()> {
        writeln!(
            self.writer,
            "{} {} {} {} {} {} {} {}",
            dataset.dataset_id,
            dataset.in_bytes(),
            dataset.out_bytes(),
            trial_count,
            kernel_count,
            combo.residency.id(),
            combo.layout.id(),
            combo.layout.variant_flag(),
        )
        .context("failed to write run header")
    }

    pub fn write_trial(&mut self, timings: &PhaseTimings) -> Result<()> {
        writeln!(self.writer, "{}", timings.row()).context("failed to write trial row")
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().context("failed to flush results file")
    }
}
