//! Aggregate totals used to cross-check every benchmark configuration.

use tracing::{error, info};

/// Run-wide sums every (layout, residency) combination must reproduce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationTotals {
    /// Sum of `cluster_count` over all modules.
    pub cluster_count: u64,
    /// Sum of all output labels over all cells.
    pub label_sum: u64,
}

/// Outcome of comparing observed aggregates against the expected totals.
/// Advisory by design: a mismatch marks the configuration, never aborts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub observed: ValidationTotals,
    pub expected: ValidationTotals,
}

impl ValidationOutcome {
    pub fn passed(&self) -> bool {
        self.observed == self.expected
    }

    /// Emits the pass/fail signal with both observed aggregates.
    pub fn emit(&self) {
        if self.passed() {
            info!(
                clusters = self.observed.cluster_count,
                labels = self.observed.label_sum,
                "validation passed"
            );
        } else {
            error!(
                observed_clusters = self.observed.cluster_count,
                expected_clusters = self.expected.cluster_count,
                observed_labels = self.observed.label_sum,
                expected_labels = self.expected.label_sum,
                "validation failed"
            );
        }
    }
}

pub fn compare(observed: ValidationTotals, expected: ValidationTotals) -> ValidationOutcome {
    ValidationOutcome { observed, expected }
}
