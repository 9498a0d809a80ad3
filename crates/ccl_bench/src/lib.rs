//! Benchmark harness measuring how memory residency and data layout choices
//! affect the SparseCCL clustering kernel on host and GPU backends.

pub mod config;
pub mod fill;
pub mod gpu;
pub mod gpu_runner;
pub mod host_runner;
pub mod orchestrator;
pub mod report;
pub mod strategy;
pub mod timing;

pub use config::BenchConfig;
pub use host_runner::IterationResult;
pub use orchestrator::{run_iteration, run_sweep};
pub use strategy::{Combo, LayoutMode, ResidencyMode};
pub use timing::{PhaseTimings, NOT_APPLICABLE};
