//! Sweep orchestration: loads the dataset once, walks the residency × layout
//! cross product, runs the configured trials, validates aggregates against
//! the CPU reference totals, and streams rows into the results table.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use ccl_core::dataset::Dataset;
use ccl_core::validation;

use crate::config::BenchConfig;
use crate::gpu::GpuContext;
use crate::gpu_runner::{run_device_flattened, run_managed_flattened, run_unified_flattened};
use crate::host_runner::{run_host_flattened, run_host_merged, run_host_split, IterationResult};
use crate::report::ResultsWriter;
use crate::strategy::{Combo, LayoutMode, ResidencyMode};

/// Runs one benchmark iteration of the given combination. The caller must
/// have checked [`Combo::is_supported`] and, for GPU residencies, supplied a
/// context.
pub fn run_iteration(
    gpu: Option<&GpuContext>,
    dataset: &Dataset,
    combo: Combo,
    kernel_count: usize,
) -> Result<IterationResult> {
    match (combo.residency, combo.layout) {
        (ResidencyMode::Host, LayoutMode::Flattened) => run_host_flattened(dataset, kernel_count),
        (ResidencyMode::Host, LayoutMode::PointerGraphMerged) => {
            run_host_merged(dataset, kernel_count)
        }
        (ResidencyMode::Host, LayoutMode::PointerGraphSplit) => {
            run_host_split(dataset, kernel_count)
        }
        (residency, LayoutMode::Flattened) => {
            let gpu = gpu.context("GPU residency requested without a backend context")?;
            match residency {
                ResidencyMode::Unified => run_unified_flattened(gpu, dataset, kernel_count),
                ResidencyMode::DeviceExplicit => run_device_flattened(gpu, dataset, kernel_count),
                ResidencyMode::Managed => run_managed_flattened(gpu, dataset, kernel_count),
                ResidencyMode::Host => unreachable!(),
            }
        }
        (residency, layout) => {
            anyhow::bail!(
                "unsupported combination {} x {} reached the dispatcher",
                residency.as_str(),
                layout.as_str()
            )
        }
    }
}

/// Walks the configured cross product. Per-configuration validation is
/// advisory; a backend fault inside an iteration aborts the sweep.
pub fn run_sweep(config: &BenchConfig) -> Result<()> {
    config.validate()?;

    let dataset = match Dataset::load(&config.dataset_path, &config.sparsity, &config.replication)
    {
        Ok(mut dataset) => {
            dataset.dataset_id = config.dataset_id;
            dataset
        }
        Err(err) => {
            warn!(
                path = %config.dataset_path.display(),
                error = %err,
                "dataset unavailable, skipping sweep"
            );
            return Ok(());
        }
    };
    // Covers both no modules and all-empty modules: either way the backend
    // runners would have to bind zero-sized cell/label buffers, which wgpu
    // rejects.
    if dataset.is_empty() || dataset.total_cell_count == 0 {
        warn!("dataset holds no cells after filtering, skipping sweep");
        return Ok(());
    }
    if dataset.max_module_cell_count > config.max_cells_per_module {
        anyhow::bail!(
            "dataset holds a module of {} cells, over the configured capacity of {}",
            dataset.max_module_cell_count,
            config.max_cells_per_module
        );
    }

    // An existing results file means this sweep already ran; there is no
    // point burning trials that cannot be recorded.
    let Some(mut writer) = ResultsWriter::create(&config.output_path)? else {
        return Ok(());
    };
    let mut gpu: Option<GpuContext> = None;
    let kernel_count = config.kernel_count as usize;

    for &residency in &config.residencies {
        for &layout in &config.layouts {
            let combo = Combo { residency, layout };
            if !combo.is_supported() {
                debug!(
                    residency = residency.as_str(),
                    layout = layout.as_str(),
                    "skipping structurally invalid combination"
                );
                continue;
            }

            // The backend context is initialized lazily so a host-only sweep
            // never touches the GPU.
            if residency.uses_gpu() && gpu.is_none() {
                gpu = Some(GpuContext::new()?);
            }

            info!(
                residency = residency.as_str(),
                layout = layout.as_str(),
                trials = config.trial_count,
                "benchmarking combination"
            );
            writer.write_run_header(&dataset, config.trial_count, config.kernel_count, combo)?;

            for trial in 0..config.trial_count {
                let result = run_iteration(gpu.as_ref(), &dataset, combo, kernel_count)
                    .with_context(|| {
                        format!(
                            "trial {trial} of {} x {}",
                            residency.as_str(),
                            layout.as_str()
                        )
                    })?;

                validation::compare(result.observed, dataset.expected).emit();
                writer.write_trial(&result.timings)?;
            }
        }
    }

    writer.finish()?;
    info!(path = %config.output_path.display(), "results written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use ccl_core::dataset::write_stream_to_file;
    use ccl_core::synth::stress_stream;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ccl_sweep_{}_{}", std::process::id(), name))
    }

    #[test]
    fn missing_dataset_skips_without_error() {
        let config = BenchConfig {
            dataset_path: temp_path("does_not_exist.bin"),
            output_path: temp_path("never_written.txt"),
            residencies: vec![ResidencyMode::Host],
            layouts: vec![LayoutMode::Flattened],
            ..BenchConfig::default()
        };
        run_sweep(&config).unwrap();
        assert!(!config.output_path.exists());
    }

    #[test]
    fn existing_output_file_skips_the_sweep() {
        let dataset_path = temp_path("skip_existing.bin");
        let output_path = temp_path("skip_existing_results.txt");
        write_stream_to_file(&dataset_path, &stress_stream()).unwrap();
        fs::write(&output_path, "previous run").unwrap();

        let config = BenchConfig {
            dataset_path: dataset_path.clone(),
            output_path: output_path.clone(),
            residencies: vec![ResidencyMode::Host],
            layouts: vec![LayoutMode::Flattened],
            ..BenchConfig::default()
        };
        run_sweep(&config).unwrap();
        // No trials ran: the earlier table is untouched.
        assert_eq!(fs::read_to_string(&output_path).unwrap(), "previous run");

        fs::remove_file(&dataset_path).unwrap();
        fs::remove_file(&output_path).unwrap();
    }

    #[test]
    fn all_empty_modules_skip_the_sweep() {
        let dataset_path = temp_path("no_cells.bin");
        let output_path = temp_path("no_cells_results.txt");
        let _ = fs::remove_file(&output_path);
        // Three modules, every one holding zero cells. The GPU runners could
        // not bind buffers for this, so the sweep must bail out before
        // touching the backend.
        write_stream_to_file(&dataset_path, &[0, 0, 0]).unwrap();

        let config = BenchConfig {
            dataset_path: dataset_path.clone(),
            output_path: output_path.clone(),
            residencies: vec![ResidencyMode::Unified],
            layouts: vec![LayoutMode::Flattened],
            ..BenchConfig::default()
        };
        run_sweep(&config).unwrap();
        assert!(!output_path.exists());

        fs::remove_file(&dataset_path).unwrap();
    }

    #[test]
    fn configured_capacity_below_largest_module_is_an_error() {
        let dataset_path = temp_path("over_cap.bin");
        let output_path = temp_path("over_cap_results.txt");
        let _ = fs::remove_file(&output_path);
        // stress_stream's largest module holds 4 cells.
        write_stream_to_file(&dataset_path, &stress_stream()).unwrap();

        let config = BenchConfig {
            dataset_path: dataset_path.clone(),
            output_path: output_path.clone(),
            max_cells_per_module: 3,
            residencies: vec![ResidencyMode::Host],
            layouts: vec![LayoutMode::Flattened],
            ..BenchConfig::default()
        };
        assert!(run_sweep(&config).is_err());

        fs::remove_file(&dataset_path).unwrap();
        let _ = fs::remove_file(&output_path);
    }

    #[test]
    fn host_only_sweep_writes_header_and_trial_rows() {
        let dataset_path = temp_path("stress.bin");
        let output_path = temp_path("stress_results.txt");
        let _ = fs::remove_file(&output_path);
        write_stream_to_file(&dataset_path, &stress_stream()).unwrap();

        let config = BenchConfig {
            dataset_path: dataset_path.clone(),
            output_path: output_path.clone(),
            trial_count: 2,
            residencies: vec![ResidencyMode::Host],
            layouts: LayoutMode::ALL.to_vec(),
            ..BenchConfig::default()
        };
        run_sweep(&config).unwrap();

        let text = fs::read_to_string(&output_path).unwrap();
        // Version line, then (header + 2 trials) per layout.
        assert_eq!(text.lines().count(), 1 + 3 * 3);

        fs::remove_file(&dataset_path).unwrap();
        fs::remove_file(&output_path).unwrap();
    }
}
