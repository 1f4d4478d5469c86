//! Simulation context threaded through every phase
//!
//! There is no process-wide state: everything a tick reads or writes lives
//! in this value, owned by the kernel and lent to the scheduler.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::agent::AgentRegistry;
use crate::behavior::TemplateLibrary;
use crate::core::config::KernelConfig;
use crate::core::types::Tick;
use crate::memory::{MemoryArchive, MemorySchema};
use crate::messaging::MessageBus;
use crate::simulation::events::{EventLog, KernelEvent};
use crate::spatial::hex::ChunkCoord;
use crate::world::streaming::{SpatialChunkManager, StreamReport};
use crate::world::terrain::TerrainGenerator;

pub struct SimulationContext {
    pub config: KernelConfig,
    /// Last completed tick (0 before the first tick runs)
    pub tick: Tick,
    pub registry: AgentRegistry,
    pub chunks: SpatialChunkManager,
    pub bus: MessageBus,
    pub archive: MemoryArchive,
    pub templates: TemplateLibrary,
    pub schema: MemorySchema,
    pub events: EventLog,
}

impl SimulationContext {
    pub fn new(config: KernelConfig, generator: Arc<dyn TerrainGenerator>, runtime: Handle) -> Self {
        let registry = AgentRegistry::new(config.streaming.chunk_size);
        let chunks = SpatialChunkManager::new(config.streaming.clone(), generator, runtime);
        let schema = MemorySchema::new(config.memory.schema.clone());
        Self {
            config,
            tick: 0,
            registry,
            chunks,
            bus: MessageBus::new(),
            archive: MemoryArchive::new(),
            templates: TemplateLibrary::new(),
            schema,
            events: EventLog::new(),
        }
    }

    /// Chunks holding a recipient of an undelivered message
    pub fn message_chunks(&self) -> BTreeSet<ChunkCoord> {
        self.bus
            .pending_recipients()
            .into_iter()
            .filter_map(|id| self.registry.get(id).map(|a| a.chunk))
            .collect()
    }

    /// Turn a streaming report into events
    pub fn record_stream_report(&mut self, report: &StreamReport, tick: Tick) {
        for failure in &report.failures {
            tracing::warn!("Chunk {} generation error: {}", failure.coord, failure.error);
            self.events.push(KernelEvent::ChunkGenerationError {
                tick,
                coord: failure.coord,
                reason: failure.error.to_string(),
                placeholder: failure.placeholder,
            });
        }
        for &coord in &report.loaded {
            let degraded = self.chunks.get(coord).map(|c| c.degraded).unwrap_or(false);
            self.events.push(KernelEvent::ChunkLoaded {
                tick,
                coord,
                degraded,
            });
        }
        for &coord in &report.unloaded {
            self.events.push(KernelEvent::ChunkUnloaded { tick, coord });
        }
    }
}
