//! Fixed-timestep accumulator
//!
//! Wall time is fed in per frame; whole timesteps are drained out as ticks.
//! The number of simulated ticks depends only on accumulated time, never on
//! how it was split across frames.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
    paused: bool,
}

impl FixedTimestep {
    pub fn new(step: Duration, max_ticks_per_frame: u32) -> Self {
        Self {
            step,
            max_ticks_per_frame: max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
            paused: false,
        }
    }

    /// Add a frame's elapsed time and return how many ticks are due
    ///
    /// At most `max_ticks_per_frame` ticks are released per frame; the rest
    /// stays in the accumulator for later frames. While paused, elapsed time
    /// is discarded and the accumulator is left as it was.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.paused || self.step.is_zero() {
            return 0;
        }
        self.accumulator += elapsed;
        let due = (self.accumulator.as_nanos() / self.step.as_nanos()) as u64;
        let ticks = due.min(self.max_ticks_per_frame as u64) as u32;
        self.accumulator -= self.step * ticks;
        ticks
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Fraction of a step left over, for interpolating observations
    pub fn alpha(&self) -> f32 {
        if self.step.is_zero() {
            return 0.0;
        }
        (self.accumulator.as_secs_f64() / self.step.as_secs_f64()) as f32
    }
}
