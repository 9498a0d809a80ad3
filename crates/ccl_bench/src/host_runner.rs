//! Host-resident benchmark iterations: plain heap allocations, the CPU
//! reference kernel, and rayon fan-out over the module index space.

use anyhow::Result;
use rayon::prelude::*;

use ccl_core::cell::{FlatInputModule, InputCell};
use ccl_core::dataset::Dataset;
use ccl_core::kernel::{sparse_ccl, MAX_CELLS_PER_MODULE};
use ccl_core::validation::ValidationTotals;

use crate::fill::{
    alloc_merged_modules, alloc_split_modules, fill_flat_slices, fill_merged_modules,
    fill_split_modules, split_label_slices, sum_flat,
};
use crate::timing::{PhaseTimer, PhaseTimings};

/// One benchmark iteration's timings plus the totals its read phase observed.
#[derive(Debug)]
pub struct IterationResult {
    pub timings: PhaseTimings,
    pub observed: ValidationTotals,
}

/// Flattened layout in host memory: four flat arrays, kernels fan out over
/// per-module label sub-slices.
pub fn run_host_flattened(dataset: &Dataset, kernel_count: usize) -> Result<IterationResult> {
    let mut timings = PhaseTimings::new(kernel_count);
    let mut timer = PhaseTimer::start();

    let mut modules =
        vec![FlatInputModule::default(); dataset.total_module_count as usize];
    let mut cells = vec![InputCell::default(); dataset.total_cell_count as usize];
    let mut clusters = vec![0u32; dataset.total_module_count as usize];
    let mut labels = vec![0u32; dataset.total_cell_count as usize];
    timings.t_alloc_native = timer.lap_micros();

    fill_flat_slices(dataset, &mut modules, &mut cells)?;
    let mut label_slices = split_label_slices(&modules, &mut labels);
    timings.t_fill = timer.lap_micros();

    for k in 0..kernel_count {
        modules
            .par_iter()
            .zip(clusters.par_iter_mut())
            .zip(label_slices.par_iter_mut())
            .for_each(|((module, cluster), module_labels)| {
                let start = module.cell_start as usize;
                let end = start + module.cell_count as usize;
                *cluster = sparse_ccl(&cells[start..end], module_labels);
            });
        timings.t_kernel[k] = timer.lap_micros();
    }

    drop(label_slices);
    let (cluster_count, label_sum) = sum_flat(&clusters, &labels);
    timings.t_read = timer.lap_micros();

    drop(modules);
    drop(cells);
    drop(clusters);
    drop(labels);
    timings.t_dealloc_native = timer.lap_micros();

    Ok(IterationResult { timings, observed: ValidationTotals { cluster_count, label_sum } })
}

/// Merged pointer-graph layout in host memory: each module owns one cell
/// array carrying coordinates and labels together.
pub fn run_host_merged(dataset: &Dataset, kernel_count: usize) -> Result<IterationResult> {
    let mut timings = PhaseTimings::new(kernel_count);
    let mut timer = PhaseTimer::start();

    let mut modules = alloc_merged_modules(dataset);
    timings.t_alloc_native = timer.lap_micros();

    fill_merged_modules(dataset, &mut modules)?;
    timings.t_fill = timer.lap_micros();

    for k in 0..kernel_count {
        modules.par_iter_mut().for_each(|module| {
            let mut scratch = [0u32; MAX_CELLS_PER_MODULE];
            let labels = &mut scratch[..module.cells.len()];
            module.cluster_count = sparse_ccl(&module.cells, labels);
            for (cell, &label) in module.cells.iter_mut().zip(labels.iter()) {
                cell.label = label;
            }
        });
        timings.t_kernel[k] = timer.lap_micros();
    }

    let mut cluster_count = 0u64;
    let mut label_sum = 0u64;
    for module in &modules {
        cluster_count += u64::from(module.cluster_count);
        label_sum += module.cells.iter().map(|c| u64::from(c.label)).sum::<u64>();
    }
    timings.t_read = timer.lap_micros();

    drop(modules);
    timings.t_dealloc_native = timer.lap_micros();

    Ok(IterationResult { timings, observed: ValidationTotals { cluster_count, label_sum } })
}

/// Split pointer-graph layout in host memory: index-paired input and output
/// module arrays, labels written straight into the output side.
pub fn run_host_split(dataset: &Dataset, kernel_count: usize) -> Result<IterationResult> {
    let mut timings = PhaseTimings::new(kernel_count);
    let mut timer = PhaseTimer::start();

    let (mut inputs, mut outputs) = alloc_split_modules(dataset);
    timings.t_alloc_native = timer.lap_micros();

    fill_split_modules(dataset, &mut inputs)?;
    timings.t_fill = timer.lap_micros();

    for k in 0..kernel_count {
        inputs.par_iter().zip(outputs.par_iter_mut()).for_each(|(input, output)| {
            output.cluster_count = sparse_ccl(&input.cells, &mut output.labels);
        });
        timings.t_kernel[k] = timer.lap_micros();
    }

    let mut cluster_count = 0u64;
    let mut label_sum = 0u64;
    for output in &outputs {
        cluster_count += u64::from(output.cluster_count);
        label_sum += output.labels.iter().map(|&l| u64::from(l)).sum::<u64>();
    }
    timings.t_read = timer.lap_micros();

    drop(inputs);
    drop(outputs);
    timings.t_dealloc_native = timer.lap_micros();

    Ok(IterationResult { timings, observed: ValidationTotals { cluster_count, label_sum } })
}
