//! Simulation loop: fixed-timestep clock, phased tick scheduler, and the
//! per-tick systems it drives

pub mod clock;
pub mod context;
pub mod events;
pub mod fairness;
pub mod perception;
pub mod stats;
pub mod tick;
pub mod watchdog;

pub use clock::FixedTimestep;
pub use context::SimulationContext;
pub use events::{EventLog, KernelEvent, TickEvent};
pub use perception::{perception_system, PerceivedAgent, Perception};
pub use stats::{PhaseTiming, TickStats};
pub use tick::{FrameReport, TickScheduler};
