//! Phase budget and hard-deadline tracking

use std::time::{Duration, Instant};

/// Started at the top of each phase
///
/// Workers consult it before picking up the next agent: past the behavior
/// budget they defer, past the hard deadline they stop taking work so the
/// barrier can complete and report the stall.
#[derive(Debug, Clone, Copy)]
pub struct PhaseWatchdog {
    started: Instant,
    deadline: Duration,
}

impl PhaseWatchdog {
    pub fn start(deadline: Duration) -> Self {
        Self {
            started: Instant::now(),
            deadline,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn over(&self, budget: Duration) -> bool {
        self.elapsed() >= budget
    }

    /// The hard deadline has passed
    pub fn expired(&self) -> bool {
        self.elapsed() > self.deadline
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}
