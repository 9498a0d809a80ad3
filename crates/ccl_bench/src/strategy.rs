//! The two independent configuration axes of the benchmark: where
//! allocations live (residency) and how modules/cells are arranged (layout).

use serde::{Deserialize, Serialize};

/// Where an allocation lives and what transfer obligations it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidencyMode {
    /// Plain process memory; the kernel runs data parallel on the host.
    Host,
    /// Storage buffers created mapped so the fill phase writes into them
    /// directly; no separate transfer phase.
    Unified,
    /// Host shadow arrays plus device-local buffers with explicit, blocking,
    /// separately timed copy-in/copy-out.
    DeviceExplicit,
    /// Host arrays wrapped by queue-managed buffers; upload is implicit at
    /// kernel submission, readback is an explicit acquisition before the
    /// read phase.
    Managed,
}

impl ResidencyMode {
    pub const ALL: [ResidencyMode; 4] = [
        ResidencyMode::Host,
        ResidencyMode::Unified,
        ResidencyMode::DeviceExplicit,
        ResidencyMode::Managed,
    ];

    /// Stable id written into the results table header.
    pub fn id(self) -> u32 {
        match self {
            ResidencyMode::Host => 1,
            ResidencyMode::Unified => 2,
            ResidencyMode::DeviceExplicit => 3,
            ResidencyMode::Managed => 4,
        }
    }

    pub fn uses_gpu(self) -> bool {
        !matches!(self, ResidencyMode::Host)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResidencyMode::Host => "host",
            ResidencyMode::Unified => "unified",
            ResidencyMode::DeviceExplicit => "device_explicit",
            ResidencyMode::Managed => "managed",
        }
    }
}

/// Module/cell arrangement in memory, including the pointer-graph module
/// representation variant (one merged cell type vs split input/output pairs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    Flattened,
    PointerGraphMerged,
    PointerGraphSplit,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 3] = [
        LayoutMode::Flattened,
        LayoutMode::PointerGraphMerged,
        LayoutMode::PointerGraphSplit,
    ];

    /// Stable id written into the results table header.
    pub fn id(self) -> u32 {
        match self {
            LayoutMode::PointerGraphMerged | LayoutMode::PointerGraphSplit => 1,
            LayoutMode::Flattened => 2,
        }
    }

    /// Distinguishes the two pointer-graph module representations.
    pub fn variant_flag(self) -> u32 {
        match self {
            LayoutMode::PointerGraphMerged => 1,
            LayoutMode::Flattened | LayoutMode::PointerGraphSplit => 0,
        }
    }

    pub fn is_pointer_graph(self) -> bool {
        !matches!(self, LayoutMode::Flattened)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Flattened => "flattened",
            LayoutMode::PointerGraphMerged => "pointer_graph_merged",
            LayoutMode::PointerGraphSplit => "pointer_graph_split",
        }
    }
}

/// One point of the residency × layout cross product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combo {
    pub residency: ResidencyMode,
    pub layout: LayoutMode,
}

impl Combo {
    /// Pointer-graph layouts need per-module variable-sized native
    /// allocations, which wgpu buffers cannot address uniformly, so every
    /// non-host residency is structurally invalid for them and the sweep
    /// skips those pairs.
    pub fn is_supported(self) -> bool {
        match self.layout {
            LayoutMode::Flattened => true,
            LayoutMode::PointerGraphMerged | LayoutMode::PointerGraphSplit => {
                self.residency == ResidencyMode::Host
            }
        }
    }
}
