//! Fill-phase machinery: replaying a dataset cursor into each layout's
//! concrete storage. The same routines run over plain `Vec`s and over
//! mapped backend buffer ranges, so phase attribution stays with the
//! caller that picked the storage.

use anyhow::{bail, Result};

use ccl_core::cell::{
    FlatInputModule, InputCell, InputModule, MergedCell, MergedModule, OutputModule,
};
use ccl_core::dataset::Dataset;

/// Writes the flattened layout into pre-sized module and cell slices. The
/// slices must span exactly the dataset's totals; a disagreement means the
/// allocation phase and the dataset went out of sync.
pub fn fill_flat_slices(
    dataset: &Dataset,
    modules: &mut [FlatInputModule],
    cells: &mut [InputCell],
) -> Result<()> {
    if modules.len() != dataset.total_module_count as usize
        || cells.len() != dataset.total_cell_count as usize
    {
        bail!(
            "flattened storage sized for {}/{} but dataset holds {}/{} modules/cells",
            modules.len(),
            cells.len(),
            dataset.total_module_count,
            dataset.total_cell_count
        );
    }

    let mut cursor = dataset.cursor();
    let mut cell_pos = 0usize;
    for module in modules.iter_mut() {
        let cell_count = cursor.next_uint();
        *module = FlatInputModule { cell_count, cell_start: cell_pos as u32 };
        for _ in 0..cell_count {
            let channel0 = cursor.next_uint();
            let channel1 = cursor.next_uint();
            cells[cell_pos] = InputCell::new(channel0, channel1);
            cell_pos += 1;
        }
    }
    if cell_pos != cells.len() {
        bail!("dataset stream filled {cell_pos} cells but storage holds {}", cells.len());
    }
    Ok(())
}

/// Allocates the merged pointer-graph representation: one module entry and
/// one per-module cell array each, sized by a first pass over the stream.
pub fn alloc_merged_modules(dataset: &Dataset) -> Vec<MergedModule> {
    let mut cursor = dataset.cursor();
    let mut modules = Vec::with_capacity(dataset.total_module_count as usize);
    while !cursor.is_exhausted() {
        let cell_count = cursor.next_uint();
        cursor.skip_cells(cell_count);
        modules.push(MergedModule {
            cluster_count: 0,
            cells: vec![MergedCell::default(); cell_count as usize].into_boxed_slice(),
        });
    }
    modules
}

/// Replays the stream into merged modules allocated by
/// [`alloc_merged_modules`]. The per-module capacities were fixed at
/// allocation time, so a cell-count disagreement here is a hard failure.
pub fn fill_merged_modules(dataset: &Dataset, modules: &mut [MergedModule]) -> Result<()> {
    let mut cursor = dataset.cursor();
    for (index, module) in modules.iter_mut().enumerate() {
        let cell_count = cursor.next_uint() as usize;
        if cell_count != module.cells.len() {
            bail!(
                "module {index} was sized for {} cells but the stream now claims {cell_count}",
                module.cells.len()
            );
        }
        module.cluster_count = 0;
        for cell in module.cells.iter_mut() {
            let channel0 = cursor.next_uint();
            let channel1 = cursor.next_uint();
            *cell = MergedCell { channel0, channel1, label: 0 };
        }
    }
    Ok(())
}

/// Allocates the split pointer-graph representation as index-paired input and
/// output module arrays.
pub fn alloc_split_modules(dataset: &Dataset) -> (Vec<InputModule>, Vec<OutputModule>) {
    let mut cursor = dataset.cursor();
    let count = dataset.total_module_count as usize;
    let mut inputs = Vec::with_capacity(count);
    let mut outputs = Vec::with_capacity(count);
    while !cursor.is_exhausted() {
        let cell_count = cursor.next_uint() as usize;
        cursor.skip_cells(cell_count as u32);
        inputs.push(InputModule { cells: vec![InputCell::default(); cell_count].into_boxed_slice() });
        outputs.push(OutputModule {
            cluster_count: 0,
            labels: vec![0u32; cell_count].into_boxed_slice(),
        });
    }
    (inputs, outputs)
}

/// Replays the stream into split input modules. Output modules are already
/// zeroed by allocation.
pub fn fill_split_modules(dataset: &Dataset, inputs: &mut [InputModule]) -> Result<()> {
    let mut cursor = dataset.cursor();
    for (index, module) in inputs.iter_mut().enumerate() {
        let cell_count = cursor.next_uint() as usize;
        if cell_count != module.cells.len() {
            bail!(
                "module {index} was sized for {} cells but the stream now claims {cell_count}",
                module.cells.len()
            );
        }
        for cell in module.cells.iter_mut() {
            let channel0 = cursor.next_uint();
            let channel1 = cursor.next_uint();
            *cell = InputCell::new(channel0, channel1);
        }
    }
    Ok(())
}

/// Splits a flat label array into per-module sub-slices the kernel can label
/// independently. Borrows end when the returned vector is dropped.
pub fn split_label_slices<'a>(
    modules: &[FlatInputModule],
    mut labels: &'a mut [u32],
) -> Vec<&'a mut [u32]> {
    let mut slices = Vec::with_capacity(modules.len());
    for module in modules {
        let (head, tail) = labels.split_at_mut(module.cell_count as usize);
        slices.push(head);
        labels = tail;
    }
    slices
}

/// Aggregate read over flattened outputs: total clusters and label sum.
pub fn sum_flat(clusters: &[u32], labels: &[u32]) -> (u64, u64) {
    let cluster_count = clusters.iter().map(|&c| u64::from(c)).sum();
    let label_sum = labels.iter().map(|&l| u64::from(l)).sum();
    (cluster_count, label_sum)
}
