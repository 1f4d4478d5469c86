//! Per-tick counters for the observation API

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::core::types::{Phase, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub micros: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickStats {
    pub tick: Tick,
    pub agents_live: usize,
    pub agents_evaluated: usize,
    pub agents_deferred: usize,
    pub commands_rejected: usize,
    pub messages_delivered: usize,
    pub messages_failed: usize,
    pub messages_pending: usize,
    /// Unread messages dropped because an inbox was full
    pub messages_overflowed: usize,
    pub chunks_loaded: usize,
    pub chunks_in_flight: usize,
    pub associations_pruned: usize,
    pub phases: Vec<PhaseTiming>,
}

impl TickStats {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    pub fn record_phase(&mut self, phase: Phase, elapsed: Duration) {
        self.phases.push(PhaseTiming {
            phase,
            micros: elapsed.as_micros() as u64,
        });
    }

    pub fn phase_micros(&self, phase: Phase) -> Option<u64> {
        self.phases.iter().find(|p| p.phase == phase).map(|p| p.micros)
    }

    pub fn total_micros(&self) -> u64 {
        self.phases.iter().map(|p| p.micros).sum()
    }
}

impl fmt::Display for TickStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {:>6} | agents {:>5} (eval {}, deferred {}) | msgs {} delivered, {} failed, {} pending | chunks {} (+{} loading) | {}us",
            self.tick,
            self.agents_live,
            self.agents_evaluated,
            self.agents_deferred,
            self.messages_delivered,
            self.messages_failed,
            self.messages_pending,
            self.chunks_loaded,
            self.chunks_in_flight,
            self.total_micros()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_timings() {
        let mut stats = TickStats::new(4);
        stats.record_phase(Phase::StreamUpdate, Duration::from_micros(30));
        stats.record_phase(Phase::Behavior, Duration::from_micros(70));
        assert_eq!(stats.phase_micros(Phase::Behavior), Some(70));
        assert_eq!(stats.phase_micros(Phase::MemoryDecay), None);
        assert_eq!(stats.total_micros(), 100);
        assert!(stats.to_string().starts_with("tick      4"));
    }
}
