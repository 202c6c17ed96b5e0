//! Timing utilities for synthesis phases.
//!
//! This module provides an RAII timer that records elapsed time when
//! dropped, and the per-phase totals that [`crate::Stack::synth`] logs.

use std::time::{Duration, Instant};

use serde::Serialize;

/// RAII timer that records elapsed time to a mutable slot on Drop.
///
/// The elapsed time is added to the slot even if the timed phase returns
/// early through `?`.
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// let mut total = Duration::ZERO;
/// {
///     let _timer = PhaseTimer::new(&mut total);
///     // ... work being measured ...
/// } // timer is dropped here, total is updated
/// ```
pub struct PhaseTimer<'a> {
    start: Instant,
    slot: &'a mut Duration,
}

impl<'a> PhaseTimer<'a> {
    /// Create a new timer that will accumulate elapsed time to `slot`.
    pub fn new(slot: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            slot,
        }
    }
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        *self.slot += self.start.elapsed();
    }
}

/// Time spent in each synthesis phase.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SynthTimings {
    /// Resource and graph-level validation
    pub validate: Duration,
    /// Rendering resources into template declarations
    pub render: Duration,
    /// Checking that every reference resolves
    pub check_references: Duration,
}

impl SynthTimings {
    pub fn total(&self) -> Duration {
        self.validate + self.render + self.check_references
    }

    pub fn total_ms(&self) -> f64 {
        self.total().as_secs_f64() * 1000.0
    }
}
