//! Core SparseCCL domain logic that remains independent of the compute
//! backend and the benchmark harness.
//!
//! This crate hosts:
//! - the cell/module data model shared between host code and WGSL kernels
//! - the dataset repository (binary loading, sparsity filtering, replication)
//! - the CPU reference implementation of SparseCCL
//! - the validation totals every benchmark configuration must reproduce

pub mod cell;
pub mod dataset;
pub mod kernel;
pub mod synth;
pub mod validation;

pub use cell::{
    CellCoords, FlatInputModule, InputCell, InputModule, MergedCell, MergedModule, OutputModule,
};
pub use dataset::{Dataset, ReplicationSpec, SparsityWindow, StreamCursor};
pub use kernel::{is_adjacent, is_far_enough, sparse_ccl, MAX_CELLS_PER_MODULE};
pub use validation::{ValidationOutcome, ValidationTotals};
