//! Versioned kernel snapshots
//!
//! A snapshot is a `StateBlob`: a schema version, a unique id, and the
//! kernel state as a JSON value. Terrain is not stored; loaded chunks are
//! regenerated from the seed on restore unless agents edited them, in which
//! case their tiles are kept verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::agent::{Agent, Inventory};
use crate::behavior::{BehaviorTree, ExecutionState, TemplateLibrary};
use crate::core::error::{KernelError, Result};
use crate::core::types::{AgentId, Liveness, Tick};
use crate::memory::{MemoryArchive, MemoryStore};
use crate::messaging::{Message, MessageBus};
use crate::simulation::context::SimulationContext;
use crate::spatial::hex::{ChunkCoord, HexPosition};
use crate::world::chunk::TileSet;

/// Current snapshot schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Serialized kernel state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBlob {
    pub version: u32,
    pub snapshot_id: Uuid,
    pub state: Value,
}

impl StateBlob {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Everything needed to resume an agent, cursors and resume path included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub name: String,
    pub position: HexPosition,
    pub status: Liveness,
    pub tree: BehaviorTree,
    pub exec: ExecutionState,
    pub memory: MemoryStore,
    pub persistent_memory: bool,
    #[serde(default)]
    pub inbox: Vec<Message>,
    #[serde(default)]
    pub inventory: Inventory,
    pub spawned_at: Tick,
    pub last_processed: Tick,
}

impl AgentRecord {
    fn capture(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            position: agent.position,
            status: agent.status,
            tree: agent.tree.clone(),
            exec: agent.exec.clone(),
            memory: agent.memory.clone(),
            persistent_memory: agent.persistent_memory,
            inbox: agent.inbox.clone(),
            inventory: agent.inventory.clone(),
            spawned_at: agent.spawned_at,
            last_processed: agent.last_processed,
        }
    }

    fn into_agent(self) -> Agent {
        Agent {
            id: self.id,
            name: self.name,
            position: self.position,
            // Recomputed by the registry on insert
            chunk: ChunkCoord::default(),
            status: self.status,
            tree: self.tree,
            exec: self.exec,
            memory: self.memory,
            persistent_memory: self.persistent_memory,
            inbox: self.inbox,
            inventory: self.inventory,
            perceived: Vec::new(),
            spawned_at: self.spawned_at,
            last_processed: self.last_processed,
        }
    }
}

/// A loaded chunk; tiles are only stored when agents changed them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub coord: ChunkCoord,
    pub degraded: bool,
    #[serde(default)]
    pub edited_tiles: Option<TileSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelState {
    pub tick: Tick,
    pub seed: u64,
    pub chunk_size: u32,
    pub next_agent_id: u64,
    pub agents: Vec<AgentRecord>,
    #[serde(default)]
    pub archive: MemoryArchive,
    #[serde(default)]
    pub templates: TemplateLibrary,
    pub chunks: Vec<ChunkRecord>,
    #[serde(default)]
    pub bus: MessageBus,
}

impl KernelState {
    /// Capture the context between ticks
    pub fn capture(ctx: &SimulationContext) -> Self {
        let chunks = ctx
            .chunks
            .chunks()
            .map(|chunk| ChunkRecord {
                coord: chunk.coord,
                degraded: chunk.degraded,
                edited_tiles: chunk.edited.then(|| chunk.terrain.snapshot()),
            })
            .collect();

        Self {
            tick: ctx.tick,
            seed: ctx.chunks.seed(),
            chunk_size: ctx.chunks.chunk_size(),
            next_agent_id: ctx.registry.next_id(),
            agents: ctx.registry.iter().map(AgentRecord::capture).collect(),
            archive: ctx.archive.clone(),
            templates: ctx.templates.clone(),
            chunks,
            bus: ctx.bus.clone(),
        }
    }

    pub fn into_blob(self) -> Result<StateBlob> {
        Ok(StateBlob {
            version: SCHEMA_VERSION,
            snapshot_id: Uuid::new_v4(),
            state: serde_json::to_value(self)?,
        })
    }

    /// Decode a blob already at the current version
    pub fn from_blob(blob: &StateBlob) -> Result<Self> {
        if blob.version != SCHEMA_VERSION {
            return Err(KernelError::SerializationVersionMismatch {
                found: blob.version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(serde_json::from_value(blob.state.clone())?)
    }

    /// Rebuild a fresh context (created with this state's seed and chunk size)
    ///
    /// Blocks the calling thread while loaded chunks are regenerated.
    pub fn apply(self, ctx: &mut SimulationContext) -> Result<()> {
        if ctx.chunks.chunk_size() != self.chunk_size || ctx.chunks.seed() != self.seed {
            return Err(KernelError::Config(format!(
                "snapshot expects seed {} and chunk size {}",
                self.seed, self.chunk_size
            )));
        }
        ctx.tick = self.tick;

        for record in self.chunks {
            let edited = record.edited_tiles.is_some();
            let (tiles, degraded) = match record.edited_tiles {
                Some(tiles) => (tiles, record.degraded),
                None if record.degraded => (TileSet::placeholder(record.coord, self.chunk_size), true),
                None => match ctx.chunks.generate_blocking(record.coord) {
                    Ok(tiles) => (tiles, false),
                    Err(e) => {
                        tracing::warn!("Regenerating {} on restore failed: {}", record.coord, e);
                        (TileSet::placeholder(record.coord, self.chunk_size), true)
                    }
                },
            };
            ctx.chunks.insert_restored(tiles, degraded, edited, self.tick);
        }

        for record in self.agents {
            record.tree.check()?;
            let agent = record.into_agent();
            let chunk = ctx.registry.chunk_of(agent.position.coord);
            if !ctx.chunks.is_ready(chunk) {
                tracing::warn!("Restored {} stands in unloaded {}", agent.id, chunk);
            }
            ctx.registry.insert(agent);
        }
        ctx.registry.set_next_id(self.next_agent_id);
        ctx.archive = self.archive;
        ctx.templates = self.templates;
        ctx.bus = self.bus;

        tracing::info!(
            "Restored tick {} with {} agents and {} chunks",
            ctx.tick,
            ctx.registry.len(),
            ctx.chunks.loaded_count()
        );
        Ok(())
    }
}
