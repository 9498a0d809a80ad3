//! Cell and module types shared between host code and the WGSL kernel.

use bytemuck::{Pod, Zeroable};

/// A sparse sensor hit. Input cells within one module are sorted in
/// column major order: ascending `channel1`, then ascending `channel0`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct InputCell {
    pub channel0: u32,
    pub channel1: u32,
}

impl InputCell {
    pub fn new(channel0: u32, channel1: u32) -> Self {
        Self { channel0, channel1 }
    }
}

/// Flattened-layout module entry: a window into the global cell arrays.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FlatInputModule {
    pub cell_count: u32,
    /// Start index into the single global cell array shared by all modules.
    pub cell_start: u32,
}

/// Pointer-graph cell carrying input coordinates and the output label in
/// one struct (the "merged" module representation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergedCell {
    pub channel0: u32,
    pub channel1: u32,
    pub label: u32,
}

/// Pointer-graph module owning its own merged cell array.
#[derive(Debug, Default)]
pub struct MergedModule {
    pub cluster_count: u32,
    pub cells: Box<[MergedCell]>,
}

/// Pointer-graph input module of the split representation: coordinates only.
#[derive(Debug, Default)]
pub struct InputModule {
    pub cells: Box<[InputCell]>,
}

/// Pointer-graph output module of the split representation: labels only,
/// cross-referenced with its [`InputModule`] by identical index.
#[derive(Debug, Default)]
pub struct OutputModule {
    pub cluster_count: u32,
    pub labels: Box<[u32]>,
}

/// Read access to cell coordinates, so the kernel can run unchanged over
/// merged pointer-graph cells, split input cells and flattened sub-slices.
pub trait CellCoords {
    fn channel0(&self) -> u32;
    fn channel1(&self) -> u32;
}

impl CellCoords for InputCell {
    fn channel0(&self) -> u32 {
        self.channel0
    }
    fn channel1(&self) -> u32 {
        self.channel1
    }
}

impl CellCoords for MergedCell {
    fn channel0(&self) -> u32 {
        self.channel0
    }
    fn channel1(&self) -> u32 {
        self.channel1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_module_entry_is_two_words() {
        // The WGSL kernel indexes the module array as pairs of u32.
        assert_eq!(core::mem::size_of::<FlatInputModule>(), 8);
        assert_eq!(core::mem::size_of::<InputCell>(), 8);
    }
}
