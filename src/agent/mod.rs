//! Agents and the registry that indexes them by chunk

pub mod inventory;
pub mod registry;

pub use inventory::{Inventory, DEFAULT_CARRY_CAPACITY};
pub use registry::AgentRegistry;

use serde::{Deserialize, Serialize};

use crate::behavior::{BehaviorTree, ExecutionState};
use crate::core::types::{AgentId, Liveness, Tick};
use crate::memory::MemoryStore;
use crate::messaging::bus::Message;
use crate::simulation::perception::PerceivedAgent;
use crate::spatial::hex::{ChunkCoord, HexPosition};

/// A simulated agent
///
/// Owns its tree, execution state and memory outright; nothing else holds
/// a reference into them, so distinct agents can be processed in parallel.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub position: HexPosition,
    /// Owning chunk, kept in step with `position` by the registry
    pub chunk: ChunkCoord,
    pub status: Liveness,
    pub tree: BehaviorTree,
    pub exec: ExecutionState,
    pub memory: MemoryStore,
    /// Archive the memory instead of dropping it on death
    pub persistent_memory: bool,
    /// Messages delivered but not yet read
    pub inbox: Vec<Message>,
    pub inventory: Inventory,
    /// Agents seen in the last perception phase
    pub perceived: Vec<PerceivedAgent>,
    pub spawned_at: Tick,
    /// Last tick the agent's tree was evaluated
    pub last_processed: Tick,
}

impl Agent {
    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    /// Ticks elapsed since the tree was last evaluated
    pub fn staleness(&self, tick: Tick) -> Tick {
        tick.saturating_sub(self.last_processed)
    }
}

/// Where a new agent's tree comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeSource {
    Inline { tree: BehaviorTree },
    Template { name: String },
}

/// Explicit request to create an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub name: String,
    pub position: HexPosition,
    pub tree: TreeSource,
    #[serde(default)]
    pub persistent_memory: bool,
    /// Seed the new memory from this dead agent's archived store
    #[serde(default)]
    pub inherit_memory: Option<AgentId>,
}

impl SpawnRequest {
    pub fn new(name: impl Into<String>, position: HexPosition, tree: TreeSource) -> Self {
        Self {
            name: name.into(),
            position,
            tree,
            persistent_memory: false,
            inherit_memory: None,
        }
    }

    pub fn from_template(name: impl Into<String>, position: HexPosition, template: impl Into<String>) -> Self {
        Self::new(name, position, TreeSource::Template { name: template.into() })
    }

    pub fn persistent(mut self) -> Self {
        self.persistent_memory = true;
        self
    }

    pub fn inheriting(mut self, from: AgentId) -> Self {
        self.inherit_memory = Some(from);
        self
    }
}
