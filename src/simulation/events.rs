//! Kernel event stream
//!
//! Structured, ordered events for external logging and telemetry. This is
//! separate from `tracing` output: events are data the host drains and can
//! serialize (the CLI prints them as JSON lines).

use serde::Serialize;

use crate::core::types::{AgentId, Phase, Tick};
use crate::messaging::bus::{Message, MessageSender, Recipient};
use crate::spatial::hex::ChunkCoord;
use crate::world::chunk::ResourceKind;

/// Emitted at each phase barrier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickEvent {
    pub tick: Tick,
    pub phase: Phase,
    /// Wall time the phase took
    pub elapsed_us: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KernelEvent {
    Tick(TickEvent),
    MessageDeliveryFailure {
        tick: Tick,
        seq: u64,
        sender: MessageSender,
        recipient: Option<AgentId>,
        payload: String,
    },
    ChunkGenerationError {
        tick: Tick,
        coord: ChunkCoord,
        reason: String,
        /// Placeholder terrain was committed
        placeholder: bool,
    },
    TickOverrunWarning {
        tick: Tick,
        phase: Phase,
        budget_ms: u64,
        deferred: Vec<AgentId>,
    },
    /// A command or intent targeted something that could not take it
    CommandRejected {
        tick: Tick,
        agent: AgentId,
        reason: String,
    },
    AgentSpawned {
        tick: Tick,
        agent: AgentId,
        name: String,
    },
    AgentDied {
        tick: Tick,
        agent: AgentId,
        archived: bool,
    },
    ResourceGathered {
        tick: Tick,
        agent: AgentId,
        resource: ResourceKind,
        amount: f32,
    },
    ChunkLoaded {
        tick: Tick,
        coord: ChunkCoord,
        degraded: bool,
    },
    ChunkUnloaded {
        tick: Tick,
        coord: ChunkCoord,
    },
}

impl KernelEvent {
    pub fn delivery_failure(tick: Tick, message: &Message) -> Self {
        let recipient = match message.recipient {
            Recipient::Agent(id) => Some(id),
            Recipient::Broadcast => None,
        };
        KernelEvent::MessageDeliveryFailure {
            tick,
            seq: message.seq,
            sender: message.sender,
            recipient,
            payload: message.payload.clone(),
        }
    }

    pub fn tick(&self) -> Tick {
        match self {
            KernelEvent::Tick(e) => e.tick,
            KernelEvent::MessageDeliveryFailure { tick, .. }
            | KernelEvent::ChunkGenerationError { tick, .. }
            | KernelEvent::TickOverrunWarning { tick, .. }
            | KernelEvent::CommandRejected { tick, .. }
            | KernelEvent::AgentSpawned { tick, .. }
            | KernelEvent::AgentDied { tick, .. }
            | KernelEvent::ResourceGathered { tick, .. }
            | KernelEvent::ChunkLoaded { tick, .. }
            | KernelEvent::ChunkUnloaded { tick, .. } => *tick,
        }
    }
}

/// Ordered buffer of events until the host drains it
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<KernelEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: KernelEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<KernelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KernelEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
