//! Kernel facade
//!
//! Owns the simulation context and the scheduler, and is the only surface
//! hosts talk to: spawning and killing agents, external edits, messages
//! from outside, snapshots, observation queries and the tick loop.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;

use crate::agent::{Agent, Inventory, SpawnRequest, TreeSource};
use crate::behavior::BehaviorTree;
use crate::command::{apply_intent, parse_intent, Intent, IntentOutcome};
use crate::core::config::KernelConfig;
use crate::core::error::{DeadlockReport, KernelError, Result};
use crate::core::types::{AgentId, MessagePriority, Tick};
use crate::memory::MemoryStore;
use crate::messaging::{MessageSender, Recipient};
use crate::persistence::{KernelState, MigrationRegistry, StateBlob};
use crate::simulation::{FrameReport, KernelEvent, SimulationContext, TickScheduler, TickStats};
use crate::spatial::hex::ChunkCoord;
use crate::world::chunk::{ChunkSummary, LoadState};
use crate::world::streaming::StreamReport;
use crate::world::terrain::{SeededTerrain, TerrainGenerator};

/// Read-only view of a loaded chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkInfo {
    pub coord: ChunkCoord,
    pub state: LoadState,
    pub summary: ChunkSummary,
    pub degraded: bool,
    pub edited: bool,
    pub idle_ticks: u64,
    pub agents: Vec<AgentId>,
}

pub struct Kernel {
    ctx: SimulationContext,
    scheduler: TickScheduler,
}

impl Kernel {
    /// Build a kernel; chunk generation runs on `runtime`
    ///
    /// Blocking calls (`spawn`, `settle`, `restore`) wait on that runtime
    /// and must not be made from one of its worker threads.
    pub fn new(config: KernelConfig, generator: Arc<dyn TerrainGenerator>, runtime: Handle) -> Result<Self> {
        config.validate().map_err(KernelError::Config)?;
        let scheduler = TickScheduler::new(&config.scheduler)?;
        tracing::info!(
            "Kernel created: seed {}, chunk size {}, {} workers",
            config.streaming.seed,
            config.streaming.chunk_size,
            config.scheduler.worker_threads
        );
        Ok(Self {
            ctx: SimulationContext::new(config, generator, runtime),
            scheduler,
        })
    }

    pub fn with_default_terrain(config: KernelConfig, runtime: Handle) -> Result<Self> {
        Self::new(config, Arc::new(SeededTerrain), runtime)
    }

    // === AGENTS ===

    /// Create an agent once its chunk is Ready
    pub fn spawn(&mut self, request: SpawnRequest) -> Result<AgentId> {
        let tick = self.ctx.tick;
        let tree = match request.tree {
            TreeSource::Inline { tree } => {
                tree.check()?;
                tree
            }
            TreeSource::Template { name } => self.ctx.templates.instantiate(&name)?,
        };

        let mut memory = MemoryStore::new();
        if let Some(from) = request.inherit_memory {
            let archived = self.ctx.archive.get(from).ok_or(KernelError::AgentNotFound(from))?;
            memory.inherit(from, &archived.memory, tick);
        }

        let chunk = self.ctx.registry.chunk_of(request.position.coord);
        let (_, report) = self.ctx.chunks.load_now(chunk, tick)?;
        self.ctx.record_stream_report(&report, tick);

        let id = self.ctx.registry.create(
            request.name.clone(),
            request.position,
            tree,
            memory,
            request.persistent_memory,
            tick,
        );
        if let Some(agent) = self.ctx.registry.get_mut(id) {
            agent.inventory = Inventory::with_capacity(self.ctx.config.resources.carry_capacity);
        }
        self.ctx.events.push(KernelEvent::AgentSpawned {
            tick,
            agent: id,
            name: request.name,
        });
        Ok(id)
    }

    /// Destroy an agent outside the tick loop
    pub fn kill(&mut self, id: AgentId) -> Result<()> {
        let tick = self.ctx.tick;
        let dead = self.ctx.registry.destroy(id, &mut self.ctx.archive, tick)?;
        self.ctx.events.push(KernelEvent::AgentDied {
            tick,
            agent: id,
            archived: dead.persistent_memory,
        });
        Ok(())
    }

    /// Queue a message from outside the loop; it is delivered next tick
    pub fn send(
        &mut self,
        sender: MessageSender,
        recipient: Recipient,
        payload: impl Into<String>,
        priority: MessagePriority,
    ) -> Result<u64> {
        if let Some(id) = sender.agent() {
            if !self.ctx.registry.contains(id) {
                return Err(KernelError::AgentNotFound(id));
            }
        }
        Ok(self
            .ctx
            .bus
            .send(sender, recipient, payload, priority, self.ctx.tick))
    }

    /// Apply a structured edit to one agent
    pub fn apply_intent(&mut self, id: AgentId, intent: Intent) -> Result<IntentOutcome> {
        let tick = self.ctx.tick;
        let kind = intent.name();
        let ctx = &mut self.ctx;
        let result = match ctx.registry.get_mut(id) {
            Some(agent) => apply_intent(agent, &mut ctx.templates, &ctx.schema, intent, tick),
            None => Err(KernelError::AgentNotFound(id)),
        };

        match &result {
            Ok(outcome) => tracing::debug!("{} applied to {}: {:?}", kind, id, outcome),
            Err(error) => {
                tracing::warn!("{} rejected for {}: {}", kind, id, error);
                ctx.events.push(KernelEvent::CommandRejected {
                    tick,
                    agent: id,
                    reason: error.to_string(),
                });
            }
        }
        result
    }

    /// Parse and apply an intent given as JSON text
    pub fn apply_intent_json(&mut self, id: AgentId, text: &str) -> Result<IntentOutcome> {
        let intent = parse_intent(text)?;
        self.apply_intent(id, intent)
    }

    pub fn register_template(&mut self, name: impl Into<String>, tree: &BehaviorTree) -> Result<()> {
        tree.check()?;
        self.ctx.templates.save(name, tree);
        Ok(())
    }

    // === LOOP ===

    pub fn run_tick(&mut self) -> Result<TickStats> {
        self.scheduler.run_tick(&mut self.ctx)
    }

    pub fn run_ticks(&mut self, n: u64) -> Result<TickStats> {
        let mut last = self.scheduler.last_stats().clone();
        for _ in 0..n {
            last = self.run_tick()?;
        }
        Ok(last)
    }

    pub fn frame(&mut self, elapsed: Duration) -> Result<FrameReport> {
        self.scheduler.frame(&mut self.ctx, elapsed)
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn resume(&mut self) {
        self.scheduler.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    pub fn halted(&self) -> Option<&DeadlockReport> {
        self.scheduler.halted()
    }

    /// Wait (bounded) for in-flight chunk loads and commit them
    pub fn settle(&mut self, timeout: Duration) -> StreamReport {
        let tick = self.ctx.tick;
        let report = self.ctx.chunks.settle(timeout, tick);
        self.ctx.record_stream_report(&report, tick);
        report
    }

    // === OBSERVATION ===

    pub fn tick(&self) -> Tick {
        self.ctx.tick
    }

    pub fn get_agent(&self, id: AgentId) -> Option<&Agent> {
        self.ctx.registry.get(id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.ctx.registry.iter()
    }

    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<ChunkInfo> {
        let chunk = self.ctx.chunks.get(coord)?;
        Some(ChunkInfo {
            coord,
            state: chunk.state,
            summary: chunk.summary,
            degraded: chunk.degraded,
            edited: chunk.edited,
            idle_ticks: chunk.idle_ticks,
            agents: self.ctx.registry.agents_in_chunk(coord).collect(),
        })
    }

    pub fn chunk_state(&self, coord: ChunkCoord) -> LoadState {
        self.ctx.chunks.load_state(coord)
    }

    pub fn tick_stats(&self) -> &TickStats {
        self.scheduler.last_stats()
    }

    pub fn drain_events(&mut self) -> Vec<KernelEvent> {
        self.ctx.events.drain()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    // === PERSISTENCE ===

    /// Capture the full kernel state between ticks
    pub fn snapshot(&self) -> Result<StateBlob> {
        let blob = KernelState::capture(&self.ctx).into_blob()?;
        tracing::info!("Snapshot {} taken at tick {}", blob.snapshot_id, self.ctx.tick);
        Ok(blob)
    }

    /// Rebuild a kernel from a snapshot at the current schema version
    pub fn restore(
        blob: StateBlob,
        config: KernelConfig,
        generator: Arc<dyn TerrainGenerator>,
        runtime: Handle,
    ) -> Result<Self> {
        Self::restore_with_migrations(blob, &MigrationRegistry::new(), config, generator, runtime)
    }

    /// Rebuild a kernel, upgrading older snapshots through `migrations`
    ///
    /// The snapshot's seed and chunk size override the ones in `config`.
    pub fn restore_with_migrations(
        blob: StateBlob,
        migrations: &MigrationRegistry,
        mut config: KernelConfig,
        generator: Arc<dyn TerrainGenerator>,
        runtime: Handle,
    ) -> Result<Self> {
        let blob = migrations.upgrade(blob)?;
        let state = KernelState::from_blob(&blob)?;
        config.streaming.seed = state.seed;
        config.streaming.chunk_size = state.chunk_size;

        let mut kernel = Self::new(config, generator, runtime)?;
        state.apply(&mut kernel.ctx)?;
        Ok(kernel)
    }
}
