//! Spatial chunk streaming
//!
//! Keeps the loaded set in step with where live agents are:
//! 1. Compute the required set (chunks within `stream_radius` of a live agent)
//! 2. Commit finished generation tasks (or cancel those no longer needed)
//! 3. Request missing required chunks as background generation tasks
//! 4. Count idle ticks for unneeded, empty chunks and unload them after the timeout
//! 5. Retry generation for degraded chunks
//!
//! Generation runs on the tokio blocking pool under a time budget and never
//! blocks the tick: an overrun commits placeholder terrain flagged degraded.
//! Exactly one task is in flight per coordinate; every ticket for that
//! coordinate observes the same committed terrain.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use crate::core::config::StreamingConfig;
use crate::core::error::{KernelError, Result};
use crate::core::types::Tick;
use crate::spatial::hex::ChunkCoord;
use crate::world::chunk::{Chunk, ChunkTerrain, LoadState, TileSet};
use crate::world::terrain::{GenerationError, TerrainGenerator};

/// What a load request finally resolved to
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Ready {
        terrain: Arc<ChunkTerrain>,
        degraded: bool,
    },
    /// The need vanished before the result was committed
    Cancelled,
}

impl LoadOutcome {
    pub fn terrain(&self) -> Option<&Arc<ChunkTerrain>> {
        match self {
            LoadOutcome::Ready { terrain, .. } => Some(terrain),
            LoadOutcome::Cancelled => None,
        }
    }
}

/// Handle on a (possibly shared) chunk load
#[derive(Debug, Clone)]
pub struct LoadTicket {
    coord: ChunkCoord,
    rx: watch::Receiver<Option<LoadOutcome>>,
}

impl LoadTicket {
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// The outcome if the load has been committed
    pub fn outcome(&self) -> Option<LoadOutcome> {
        self.rx.borrow().clone()
    }

    /// Wait for the load to be committed
    ///
    /// Resolution happens when the manager commits, so some caller must
    /// keep driving the manager (the stream phase, `settle` or `load_now`).
    pub async fn wait(mut self) -> LoadOutcome {
        loop {
            if let Some(outcome) = self.rx.borrow().clone() {
                return outcome;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone().unwrap_or(LoadOutcome::Cancelled);
            }
        }
    }
}

/// Generation failure surfaced to the event stream
#[derive(Debug, Clone)]
pub struct GenerationFailure {
    pub coord: ChunkCoord,
    pub error: GenerationError,
    /// Whether placeholder terrain was committed
    pub placeholder: bool,
}

/// What changed during one streaming pass
#[derive(Debug, Default)]
pub struct StreamReport {
    pub loaded: Vec<ChunkCoord>,
    pub regenerated: Vec<ChunkCoord>,
    pub unloaded: Vec<ChunkCoord>,
    pub cancelled: Vec<ChunkCoord>,
    pub requested: Vec<ChunkCoord>,
    pub failures: Vec<GenerationFailure>,
}

impl StreamReport {
    fn absorb(&mut self, other: StreamReport) {
        self.loaded.extend(other.loaded);
        self.regenerated.extend(other.regenerated);
        self.unloaded.extend(other.unloaded);
        self.cancelled.extend(other.cancelled);
        self.requested.extend(other.requested);
        self.failures.extend(other.failures);
    }
}

struct InFlight {
    tx: watch::Sender<Option<LoadOutcome>>,
    wanted: Arc<AtomicBool>,
    /// Explicitly requested; survives loss of streaming need
    pinned: bool,
    attempts: u32,
    /// Re-generating terrain of an already Ready (degraded) chunk
    regeneration: bool,
}

struct Completion {
    coord: ChunkCoord,
    result: std::result::Result<TileSet, GenerationError>,
}

pub struct SpatialChunkManager {
    config: StreamingConfig,
    generator: Arc<dyn TerrainGenerator>,
    runtime: Handle,
    chunks: BTreeMap<ChunkCoord, Chunk>,
    in_flight: BTreeMap<ChunkCoord, InFlight>,
    required: BTreeSet<ChunkCoord>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    tasks_spawned: u64,
}

impl SpatialChunkManager {
    /// `runtime` must have the time driver enabled (generation budgets use it)
    pub fn new(config: StreamingConfig, generator: Arc<dyn TerrainGenerator>, runtime: Handle) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            config,
            generator,
            runtime,
            chunks: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            required: BTreeSet::new(),
            completions_tx,
            completions_rx,
            tasks_spawned: 0,
        }
    }

    // === QUERIES ===

    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn is_ready(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).map(|c| c.is_ready()).unwrap_or(false)
    }

    pub fn load_state(&self, coord: ChunkCoord) -> LoadState {
        match self.chunks.get(&coord) {
            Some(chunk) => chunk.state,
            None if self.in_flight.contains_key(&coord) => LoadState::Loading,
            None => LoadState::Unloaded,
        }
    }

    pub fn loaded_coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn in_flight_coords(&self) -> Vec<ChunkCoord> {
        self.in_flight.keys().copied().collect()
    }

    /// Total generation tasks spawned (retries included)
    pub fn tasks_spawned(&self) -> u64 {
        self.tasks_spawned
    }

    pub fn chunk_size(&self) -> u32 {
        self.config.chunk_size
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    pub fn required(&self) -> &BTreeSet<ChunkCoord> {
        &self.required
    }

    /// Record that agents changed terrain in this chunk
    pub fn mark_edited(&mut self, coord: ChunkCoord) {
        if let Some(chunk) = self.chunks.get_mut(&coord) {
            chunk.edited = true;
            chunk.summary = chunk.terrain.read().summary();
        }
    }

    /// Grow renewable deposits back in loaded chunks; returns the total growth
    ///
    /// Deposits start full and only gathering draws them down, which also
    /// marks the chunk edited, so untouched chunks are skipped.
    pub fn regrow_resources(&mut self, step: f32) -> f32 {
        self.chunks
            .values()
            .filter(|c| c.edited && c.is_ready())
            .map(|c| c.terrain.write().regrow(step))
            .sum()
    }

    // === LOADING ===

    /// Request a chunk outside of streaming; duplicate requests share one task
    pub fn request_load(&mut self, coord: ChunkCoord) -> LoadTicket {
        if let Some(chunk) = self.chunks.get(&coord) {
            let (_tx, rx) = watch::channel(Some(LoadOutcome::Ready {
                terrain: Arc::clone(&chunk.terrain),
                degraded: chunk.degraded,
            }));
            return LoadTicket { coord, rx };
        }

        if let Some(flight) = self.in_flight.get_mut(&coord) {
            flight.pinned = true;
            flight.wanted.store(true, Ordering::Release);
            return LoadTicket {
                coord,
                rx: flight.tx.subscribe(),
            };
        }

        self.start_load(coord, true)
    }

    fn start_load(&mut self, coord: ChunkCoord, pinned: bool) -> LoadTicket {
        let (tx, rx) = watch::channel(None);
        let wanted = Arc::new(AtomicBool::new(true));
        self.spawn_generation(coord, Arc::clone(&wanted));
        self.in_flight.insert(
            coord,
            InFlight {
                tx,
                wanted,
                pinned,
                attempts: 1,
                regeneration: false,
            },
        );
        tracing::debug!("Requested generation of {}", coord);
        LoadTicket { coord, rx }
    }

    fn spawn_generation(&mut self, coord: ChunkCoord, wanted: Arc<AtomicBool>) {
        self.tasks_spawned += 1;
        let generator = Arc::clone(&self.generator);
        let tx = self.completions_tx.clone();
        let seed = self.config.seed;
        let size = self.config.chunk_size;
        let budget = self.config.generation_budget();
        let budget_ms = self.config.generation_budget_ms;

        self.runtime.spawn(async move {
            let work = tokio::task::spawn_blocking(move || {
                if !wanted.load(Ordering::Acquire) {
                    return Err(GenerationError::Aborted("no longer needed".into()));
                }
                generator.generate(coord, seed, size)
            });
            let result = match tokio::time::timeout(budget, work).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(GenerationError::Aborted(join_error.to_string())),
                Err(_) => Err(GenerationError::TimedOut(budget_ms)),
            };
            // The manager may have been dropped; nothing left to notify then
            let _ = tx.send(Completion { coord, result });
        });
    }

    /// Load a chunk and wait (bounded) for it to be committed
    ///
    /// Used outside the phase loop (spawning, restoring). The wait is bounded
    /// by the generation budget of every allowed attempt; overruns resolve
    /// to placeholder terrain, so the chunk is Ready on return.
    pub fn load_now(&mut self, coord: ChunkCoord, tick: Tick) -> Result<(Arc<ChunkTerrain>, StreamReport)> {
        let ticket = self.request_load(coord);
        let mut report = StreamReport::default();
        let attempts = self.config.max_generation_retries as u64 + 1;
        let limit = self.config.generation_budget() * attempts as u32 + Duration::from_millis(250);
        let deadline = Instant::now() + limit;

        while ticket.outcome().is_none() {
            let now = Instant::now();
            if now >= deadline {
                return Err(KernelError::ChunkNotReady(coord));
            }
            match self.next_completion(deadline - now) {
                Some(completion) => self.commit(completion, tick, &mut report),
                None => return Err(KernelError::ChunkNotReady(coord)),
            }
        }

        match ticket.outcome() {
            Some(LoadOutcome::Ready { terrain, .. }) => Ok((terrain, report)),
            _ => Err(KernelError::ChunkNotReady(coord)),
        }
    }

    /// Wait up to `timeout` for all in-flight loads to be committed
    pub fn settle(&mut self, timeout: Duration, tick: Tick) -> StreamReport {
        let mut report = StreamReport::default();
        let deadline = Instant::now() + timeout;
        while !self.in_flight.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.next_completion(deadline - now) {
                Some(completion) => self.commit(completion, tick, &mut report),
                None => break,
            }
        }
        report
    }

    fn next_completion(&mut self, wait: Duration) -> Option<Completion> {
        let rx = &mut self.completions_rx;
        self.runtime
            .block_on(async { tokio::time::timeout(wait, rx.recv()).await })
            .ok()
            .flatten()
    }

    fn drain_completions(&mut self, tick: Tick, report: &mut StreamReport) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.commit(completion, tick, report);
        }
    }

    fn commit(&mut self, completion: Completion, tick: Tick, report: &mut StreamReport) {
        let coord = completion.coord;
        let Some(mut flight) = self.in_flight.remove(&coord) else {
            return;
        };

        if flight.regeneration {
            self.commit_regeneration(coord, completion.result, tick, report);
            return;
        }

        let still_needed = flight.pinned || self.required.contains(&coord);
        if !still_needed {
            tracing::debug!("Cancelled load of {}: no longer needed", coord);
            flight.tx.send_replace(Some(LoadOutcome::Cancelled));
            report.cancelled.push(coord);
            return;
        }

        let (tiles, degraded) = match completion.result {
            Ok(tiles) => (tiles, false),
            Err(GenerationError::Failed(reason)) if flight.attempts <= self.config.max_generation_retries => {
                tracing::warn!("Generation of {} failed ({}), retrying", coord, reason);
                flight.attempts += 1;
                flight.wanted.store(true, Ordering::Release);
                self.spawn_generation(coord, Arc::clone(&flight.wanted));
                self.in_flight.insert(coord, flight);
                return;
            }
            Err(error) => {
                tracing::warn!("Generation of {} failed: {}; committing placeholder", coord, error);
                report.failures.push(GenerationFailure {
                    coord,
                    error,
                    placeholder: true,
                });
                (TileSet::placeholder(coord, self.config.chunk_size), true)
            }
        };

        let terrain = ChunkTerrain::new(tiles);
        self.chunks.insert(coord, Chunk::new(Arc::clone(&terrain), degraded, tick));
        flight.tx.send_replace(Some(LoadOutcome::Ready { terrain, degraded }));
        report.loaded.push(coord);
        tracing::debug!("Loaded {}{}", coord, if degraded { " (degraded)" } else { "" });
    }

    fn commit_regeneration(
        &mut self,
        coord: ChunkCoord,
        result: std::result::Result<TileSet, GenerationError>,
        tick: Tick,
        report: &mut StreamReport,
    ) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        match result {
            Ok(tiles) if !chunk.edited => {
                *chunk.terrain.write() = tiles;
                chunk.summary = chunk.terrain.read().summary();
                chunk.degraded = false;
                chunk.degraded_since = None;
                report.regenerated.push(coord);
                tracing::info!("Regenerated degraded {}", coord);
            }
            Ok(_) => {
                // Agents edited the placeholder meanwhile; keep their changes
                chunk.degraded_since = None;
            }
            Err(error) => {
                chunk.degraded_since = Some(tick);
                report.failures.push(GenerationFailure {
                    coord,
                    error,
                    placeholder: false,
                });
            }
        }
    }

    // === STREAMING ===

    /// One stream-update pass
    ///
    /// * `agent_chunks` - chunks holding live agents (with multiplicity ignored)
    /// * `message_chunks` - chunks holding recipients of undelivered messages
    pub fn update(
        &mut self,
        tick: Tick,
        agent_chunks: &BTreeSet<ChunkCoord>,
        message_chunks: &BTreeSet<ChunkCoord>,
    ) -> StreamReport {
        let mut report = StreamReport::default();

        self.required = agent_chunks
            .iter()
            .flat_map(|c| c.chunks_in_range(self.config.stream_radius))
            .collect();

        for (coord, flight) in &self.in_flight {
            if !flight.pinned && !flight.regeneration {
                flight.wanted.store(self.required.contains(coord), Ordering::Release);
            }
        }

        self.drain_completions(tick, &mut report);
        if self.config.stream_wait_ms > 0 && !self.in_flight.is_empty() {
            report.absorb(self.settle(self.config.stream_wait(), tick));
        }

        let missing: Vec<ChunkCoord> = self
            .required
            .iter()
            .filter(|&c| !self.chunks.contains_key(c) && !self.in_flight.contains_key(c))
            .copied()
            .collect();
        for coord in missing {
            self.start_load(coord, false);
            report.requested.push(coord);
        }

        let unload_after = self.config.unload_after_ticks;
        let mut expired = Vec::new();
        for (coord, chunk) in self.chunks.iter_mut() {
            let idle = !self.required.contains(coord)
                && !agent_chunks.contains(coord)
                && !message_chunks.contains(coord);
            if idle {
                chunk.state = LoadState::Unloading;
                chunk.idle_ticks += 1;
                if chunk.idle_ticks >= unload_after {
                    expired.push(*coord);
                }
            } else {
                chunk.state = LoadState::Ready;
                chunk.idle_ticks = 0;
            }
        }
        for coord in expired {
            self.chunks.remove(&coord);
            report.unloaded.push(coord);
            tracing::debug!("Unloaded {}", coord);
        }

        self.schedule_regeneration(tick);
        report
    }

    fn schedule_regeneration(&mut self, tick: Tick) {
        let retry_after = self.config.regen_retry_ticks;
        let due: Vec<ChunkCoord> = self
            .chunks
            .values()
            .filter(|c| c.degraded && !c.edited && !self.in_flight.contains_key(&c.coord))
            .filter(|c| c.degraded_since.is_some_and(|since| tick >= since + retry_after))
            .map(|c| c.coord)
            .collect();

        for coord in due {
            let (tx, _rx) = watch::channel(None);
            let wanted = Arc::new(AtomicBool::new(true));
            self.spawn_generation(coord, Arc::clone(&wanted));
            self.in_flight.insert(
                coord,
                InFlight {
                    tx,
                    wanted,
                    pinned: false,
                    attempts: 1,
                    regeneration: true,
                },
            );
        }
    }

    /// Insert a chunk rebuilt from a snapshot
    pub fn insert_restored(&mut self, tiles: TileSet, degraded: bool, edited: bool, tick: Tick) {
        let coord = tiles.coord;
        let mut chunk = Chunk::new(ChunkTerrain::new(tiles), degraded, tick);
        chunk.edited = edited;
        self.chunks.insert(coord, chunk);
    }

    /// Regenerate terrain synchronously on the calling thread (restore path)
    pub fn generate_blocking(&self, coord: ChunkCoord) -> std::result::Result<TileSet, GenerationError> {
        self.generator
            .generate(coord, self.config.seed, self.config.chunk_size)
    }
}
