//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Stable identifier for agents
///
/// Assigned sequentially by the registry, so ordering by id is the
/// deterministic tie-break used everywhere agents are scheduled.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "agent#{}", _0)]
pub struct AgentId(pub u64);

/// Simulation tick counter (simulation time unit)
pub type Tick = u64;

/// Liveness of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Liveness {
    /// Scheduled normally
    Active,
    /// Missed its behavior budget last tick; evaluated first next tick
    Deferred,
    /// Received a death event; removed from the registry at the end of the phase
    Dead,
}

impl Liveness {
    /// Alive agents hold chunks and receive messages
    pub fn is_alive(&self) -> bool {
        !matches!(self, Liveness::Dead)
    }
}

/// Delivery priority for messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MessagePriority {
    #[default]
    Normal,
    Priority,
}

/// The six ordered phases of a tick
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[display(fmt = "stream")]
    StreamUpdate,
    #[display(fmt = "perception")]
    Perception,
    #[display(fmt = "behavior")]
    Behavior,
    #[display(fmt = "action")]
    ActionExecution,
    #[display(fmt = "message")]
    MessageFlush,
    #[display(fmt = "decay")]
    MemoryDecay,
}

impl Phase {
    /// Phases in execution order
    pub const ORDER: [Phase; 6] = [
        Phase::StreamUpdate,
        Phase::Perception,
        Phase::Behavior,
        Phase::ActionExecution,
        Phase::MessageFlush,
        Phase::MemoryDecay,
    ];
}
