use thiserror::Error;

use crate::core::types::{AgentId, Phase, Tick};
use crate::spatial::hex::{ChunkCoord, HexCoord};
use crate::world::chunk::ResourceKind;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Invalid override: {0}")]
    InvalidOverride(String),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Chunk not ready: {0}")]
    ChunkNotReady(ChunkCoord),

    #[error("Cannot gather {kind:?} at {at:?}: none left or no room to carry it")]
    ResourceExhausted { at: HexCoord, kind: ResourceKind },

    #[error("Invalid behavior tree: {0}")]
    InvalidTree(String),

    #[error("Unknown behavior template: {0}")]
    UnknownTemplate(String),

    #[error("Snapshot schema version {found} is incompatible with {expected} and no migration is registered")]
    SerializationVersionMismatch { found: u32, expected: u32 },

    #[error("Scheduler deadlock in {} phase of tick {}", .0.phase, .0.tick)]
    SchedulerDeadlock(Box<DeadlockReport>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl KernelError {
    /// Only scheduler-level failures stop the loop
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KernelError::SchedulerDeadlock(_) | KernelError::SerializationVersionMismatch { .. }
        )
    }
}

/// Diagnostic state captured when a phase barrier misses its hard deadline
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeadlockReport {
    pub tick: Tick,
    pub phase: Phase,
    pub elapsed_ms: u128,
    pub deadline_ms: u128,
    /// Agents whose work for the phase never completed
    pub unfinished_agents: Vec<AgentId>,
    pub deferred_queue: Vec<AgentId>,
    pub chunks_in_flight: Vec<ChunkCoord>,
    pub pending_messages: usize,
    pub live_agents: usize,
}

pub type Result<T> = std::result::Result<T, KernelError>;
