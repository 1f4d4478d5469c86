//! Agent records plus a chunk → agents spatial index
//!
//! Every live agent is in exactly one chunk bucket, the one containing its
//! position. All mutation goes through `create`, `destroy` and `move_agent`,
//! which keep the index consistent.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;

use crate::agent::{Agent, Inventory};
use crate::behavior::{BehaviorTree, ExecutionState};
use crate::core::error::{KernelError, Result};
use crate::core::types::{AgentId, Liveness, Tick};
use crate::memory::{MemoryArchive, MemoryStore};
use crate::spatial::hex::{ChunkCoord, HexCoord, HexPosition};
use crate::world::view::ChunkReadiness;

pub struct AgentRegistry {
    agents: BTreeMap<AgentId, Agent>,
    by_chunk: AHashMap<ChunkCoord, BTreeSet<AgentId>>,
    next_id: u64,
    chunk_size: u32,
}

impl AgentRegistry {
    pub fn new(chunk_size: u32) -> Self {
        Self {
            agents: BTreeMap::new(),
            by_chunk: AHashMap::new(),
            next_id: 1,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn chunk_of(&self, hex: HexCoord) -> ChunkCoord {
        ChunkCoord::containing(hex, self.chunk_size)
    }

    /// Insert a new agent; the caller ensures its chunk is Ready
    pub fn create(
        &mut self,
        name: impl Into<String>,
        position: HexPosition,
        tree: BehaviorTree,
        memory: MemoryStore,
        persistent_memory: bool,
        tick: Tick,
    ) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        let chunk = self.chunk_of(position.coord);
        let agent = Agent {
            id,
            name: name.into(),
            position,
            chunk,
            status: Liveness::Active,
            tree,
            exec: ExecutionState::new(),
            memory,
            persistent_memory,
            inbox: Vec::new(),
            inventory: Inventory::default(),
            perceived: Vec::new(),
            spawned_at: tick,
            last_processed: tick,
        };
        self.insert(agent);
        tracing::debug!("Created {} at {:?} in {}", id, position.coord, chunk);
        id
    }

    /// Insert a fully built record (restore path), keeping ids monotonic
    pub fn insert(&mut self, agent: Agent) {
        let chunk = self.chunk_of(agent.position.coord);
        self.next_id = self.next_id.max(agent.id.0 + 1);
        self.by_chunk.entry(chunk).or_default().insert(agent.id);
        let mut agent = agent;
        agent.chunk = chunk;
        self.agents.insert(agent.id, agent);
    }

    /// Remove an agent, archiving its memory if it asked for persistence
    pub fn destroy(&mut self, id: AgentId, archive: &mut MemoryArchive, tick: Tick) -> Result<Agent> {
        let mut agent = self.agents.remove(&id).ok_or(KernelError::AgentNotFound(id))?;
        self.unindex(id, agent.chunk);
        agent.status = Liveness::Dead;
        if agent.persistent_memory {
            archive.archive(id, agent.name.clone(), agent.memory.clone(), tick);
        }
        tracing::info!("{} ({}) destroyed at tick {}", id, agent.name, tick);
        Ok(agent)
    }

    /// Move an agent, failing with ChunkNotReady if the destination chunk isn't Ready
    pub fn move_agent(&mut self, id: AgentId, to: HexPosition, chunks: &impl ChunkReadiness) -> Result<()> {
        let destination = self.chunk_of(to.coord);
        if !chunks.is_chunk_ready(destination) {
            return Err(KernelError::ChunkNotReady(destination));
        }
        let agent = self.agents.get_mut(&id).ok_or(KernelError::AgentNotFound(id))?;
        let from = agent.chunk;
        agent.position = to;
        agent.chunk = destination;

        if from != destination {
            self.unindex(id, from);
            self.by_chunk.entry(destination).or_default().insert(id);
        }
        Ok(())
    }

    fn unindex(&mut self, id: AgentId, chunk: ChunkCoord) {
        if let Some(bucket) = self.by_chunk.get_mut(&chunk) {
            bucket.remove(&id);
            if bucket.is_empty() {
                self.by_chunk.remove(&chunk);
            }
        }
    }

    /// Agents within hex distance `radius` of `center`, in id order
    pub fn query_radius(&self, center: HexCoord, radius: u32) -> Vec<AgentId> {
        // Rounding to parallelogram chunks costs up to one chunk per axis
        let chunk_radius = radius / self.chunk_size.max(1) + 2;
        let mut found: Vec<AgentId> = self
            .chunk_of(center)
            .chunks_in_range(chunk_radius)
            .into_iter()
            .filter_map(|c| self.by_chunk.get(&c))
            .flatten()
            .copied()
            .filter(|id| {
                self.agents
                    .get(id)
                    .map(|a| a.position.coord.distance(&center) <= radius)
                    .unwrap_or(false)
            })
            .collect();
        found.sort_unstable();
        found
    }

    // === ACCESS ===

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    pub(crate) fn agents_mut(&mut self) -> &mut BTreeMap<AgentId, Agent> {
        &mut self.agents
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn live_ids(&self) -> BTreeSet<AgentId> {
        self.agents
            .values()
            .filter(|a| a.is_alive())
            .map(|a| a.id)
            .collect()
    }

    pub fn agents_in_chunk(&self, chunk: ChunkCoord) -> impl Iterator<Item = AgentId> + '_ {
        self.by_chunk.get(&chunk).into_iter().flatten().copied()
    }

    /// Chunks holding at least one live agent
    pub fn occupied_chunks(&self) -> BTreeSet<ChunkCoord> {
        self.agents
            .values()
            .filter(|a| a.is_alive())
            .map(|a| a.chunk)
            .collect()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub(crate) fn set_next_id(&mut self, next: u64) {
        self.next_id = self.next_id.max(next);
    }

    /// Check the index against agent positions (used by tests and debug assertions)
    pub fn index_consistent(&self) -> bool {
        let indexed: usize = self.by_chunk.values().map(|b| b.len()).sum();
        indexed == self.agents.len()
            && self.agents.values().all(|a| {
                a.chunk == self.chunk_of(a.position.coord)
                    && self
                        .by_chunk
                        .get(&a.chunk)
                        .map(|b| b.contains(&a.id))
                        .unwrap_or(false)
            })
    }
}
