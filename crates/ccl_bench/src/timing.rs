//! Per-phase wall-clock timing. A phase timer stops only after the phase's
//! blocking synchronization has completed, so backend time is attributed to
//! the phase that caused it.

use std::time::Instant;

/// Sentinel for "this phase has no meaning in this residency/layout
/// combination". Distinct from 0, which is a real measurement.
pub const NOT_APPLICABLE: i64 = -1;

/// Restartable stopwatch; `lap_micros` returns the time since the previous
/// lap (or construction) and resets.
#[derive(Debug)]
pub struct PhaseTimer {
    last: Instant,
}

impl PhaseTimer {
    pub fn start() -> Self {
        Self { last: Instant::now() }
    }

    pub fn lap_micros(&mut self) -> i64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed.as_micros().min(i64::MAX as u128) as i64
    }
}

/// One benchmark iteration's phase durations in microseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTimings {
    pub t_alloc_native: i64,
    pub t_alloc_backend: i64,
    pub t_fill: i64,
    /// Explicit copy-in for device-resident transfers.
    pub t_copy: i64,
    /// Read phase, including any copy-out/acquisition it forces.
    pub t_read: i64,
    pub t_dealloc_backend: i64,
    pub t_dealloc_native: i64,
    pub t_kernel: Vec<i64>,
}

impl PhaseTimings {
    pub fn new(kernel_count: usize) -> Self {
        Self {
            t_alloc_native: NOT_APPLICABLE,
            t_alloc_backend: NOT_APPLICABLE,
            t_fill: NOT_APPLICABLE,
            t_copy: NOT_APPLICABLE,
            t_read: NOT_APPLICABLE,
            t_dealloc_backend: NOT_APPLICABLE,
            t_dealloc_native: NOT_APPLICABLE,
            t_kernel: vec![NOT_APPLICABLE; kernel_count],
        }
    }

    /// Space-separated trial row for the results table.
    pub fn row(&self) -> String {
        let mut row = format!(
            "{} {} {} {} {} {} {} {}",
            self.t_alloc_native,
            self.t_alloc_backend,
            self.t_fill,
            self.t_copy,
            self.t_read,
            self.t_dealloc_backend,
            self.t_dealloc_native,
            self.t_kernel.len(),
        );
        for t in &self.t_kernel {
            row.push(' ');
            row.push_str(&t.to_string());
        }
        row
    }
}
