//! Tick scheduler - orchestrates simulation updates
//!
//! Each tick runs six phases in order, with a barrier between them:
//! 1. Stream update (load/unload chunks around live agents)
//! 2. Perception (who can see whom)
//! 3. Behavior evaluation (one tree evaluation per agent)
//! 4. Action execution (moves and deaths, sequential in agent-id order)
//! 5. Message flush (deliver last tick's messages, queue this tick's)
//! 6. Memory decay (every `decay_interval` ticks)
//!
//! Uses rayon for per-agent work inside a phase where agents are independent.

use std::collections::BTreeSet;
use std::time::Duration;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::agent::Agent;
use crate::behavior::{evaluate, AgentMind, Effects, EvalInput};
use crate::command::{Command, CommandExecutor};
use crate::core::config::SchedulerConfig;
use crate::core::error::{DeadlockReport, KernelError, Result};
use crate::core::types::{AgentId, Liveness, Phase, Tick};
use crate::messaging::bus::OutgoingMessage;
use crate::simulation::clock::FixedTimestep;
use crate::simulation::context::SimulationContext;
use crate::simulation::events::{KernelEvent, TickEvent};
use crate::simulation::fairness::FairnessQueue;
use crate::simulation::perception::perception_system;
use crate::simulation::stats::TickStats;
use crate::simulation::watchdog::PhaseWatchdog;
use crate::spatial::hex::ChunkCoord;
use crate::world::view::TerrainView;

/// What one real frame produced
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub ticks_run: u32,
    /// Stats of the last tick run this frame (the observation point)
    pub last: Option<TickStats>,
    /// Leftover fraction of a timestep, for interpolation
    pub alpha: f32,
    pub paused: bool,
}

/// Work handed from the behavior phase to later phases of the same tick
#[derive(Default)]
struct TickScratch {
    commands: Vec<Command>,
    outboxes: Vec<(AgentId, Vec<OutgoingMessage>)>,
    edited: BTreeSet<ChunkCoord>,
}

enum BehaviorOutcome {
    Evaluated { id: AgentId, effects: Effects },
    Deferred(AgentId),
    /// Never started: the hard deadline had already passed
    Unfinished(AgentId),
}

impl BehaviorOutcome {
    fn agent(&self) -> AgentId {
        match self {
            BehaviorOutcome::Evaluated { id, .. } => *id,
            BehaviorOutcome::Deferred(id) | BehaviorOutcome::Unfinished(id) => *id,
        }
    }
}

pub struct TickScheduler {
    config: SchedulerConfig,
    clock: FixedTimestep,
    pool: rayon::ThreadPool,
    /// Set once a barrier misses its deadline; no tick runs after that
    halted: Option<Box<DeadlockReport>>,
    last_stats: TickStats,
}

impl TickScheduler {
    pub fn new(config: &SchedulerConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("hexkernel-worker-{}", i))
            .build()
            .map_err(|e| KernelError::Config(format!("Failed to build worker pool: {}", e)))?;
        Ok(Self {
            config: config.clone(),
            clock: FixedTimestep::new(config.timestep(), config.max_ticks_per_frame),
            pool,
            halted: None,
            last_stats: TickStats::default(),
        })
    }

    pub fn pause(&mut self) {
        self.clock.pause();
        tracing::info!("Scheduler paused");
    }

    pub fn resume(&mut self) {
        self.clock.resume();
        tracing::info!("Scheduler resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn clock(&self) -> &FixedTimestep {
        &self.clock
    }

    pub fn halted(&self) -> Option<&DeadlockReport> {
        self.halted.as_deref()
    }

    pub fn last_stats(&self) -> &TickStats {
        &self.last_stats
    }

    /// Feed one real frame's elapsed time and run the ticks it makes due
    pub fn frame(&mut self, ctx: &mut SimulationContext, elapsed: Duration) -> Result<FrameReport> {
        let due = self.clock.advance(elapsed);
        let mut report = FrameReport {
            ticks_run: 0,
            last: None,
            alpha: 0.0,
            paused: self.clock.is_paused(),
        };
        for _ in 0..due {
            let stats = self.run_tick(ctx)?;
            report.ticks_run += 1;
            report.last = Some(stats);
        }
        report.alpha = self.clock.alpha();
        Ok(report)
    }

    /// Run a single tick through all six phases
    pub fn run_tick(&mut self, ctx: &mut SimulationContext) -> Result<TickStats> {
        if let Some(report) = &self.halted {
            return Err(KernelError::SchedulerDeadlock(report.clone()));
        }

        ctx.tick += 1;
        let tick = ctx.tick;
        let mut stats = TickStats::new(tick);
        let mut scratch = TickScratch::default();

        for phase in Phase::ORDER {
            let watchdog = PhaseWatchdog::start(self.config.phase_deadline());
            let unfinished = match phase {
                Phase::StreamUpdate => {
                    stream_phase(ctx, tick);
                    Vec::new()
                }
                Phase::Perception => {
                    self.perception_phase(ctx);
                    Vec::new()
                }
                Phase::Behavior => self.behavior_phase(ctx, tick, &watchdog, &mut scratch, &mut stats),
                Phase::ActionExecution => {
                    action_phase(ctx, tick, &mut scratch, &mut stats);
                    Vec::new()
                }
                Phase::MessageFlush => {
                    message_phase(ctx, tick, &mut scratch, &mut stats);
                    Vec::new()
                }
                Phase::MemoryDecay => self.decay_phase(ctx, tick, &watchdog, &mut stats),
            };

            let elapsed = watchdog.elapsed();
            stats.record_phase(phase, elapsed);
            ctx.events.push(KernelEvent::Tick(TickEvent {
                tick,
                phase,
                elapsed_us: elapsed.as_micros() as u64,
            }));

            if watchdog.expired() {
                let report = Box::new(deadlock_report(ctx, tick, phase, &watchdog, unfinished));
                tracing::error!(
                    "Phase barrier {} of tick {} missed its {}ms deadline: {}",
                    phase,
                    tick,
                    report.deadline_ms,
                    serde_json::to_string(&*report).unwrap_or_default()
                );
                self.halted = Some(report.clone());
                return Err(KernelError::SchedulerDeadlock(report));
            }
        }

        stats.agents_live = ctx.registry.len();
        stats.messages_pending = ctx.bus.pending_count();
        stats.chunks_loaded = ctx.chunks.loaded_count();
        stats.chunks_in_flight = ctx.chunks.in_flight_coords().len();
        tracing::debug!("{}", stats);
        self.last_stats = stats.clone();
        Ok(stats)
    }

    fn parallel(&self, n: usize) -> bool {
        n >= self.config.parallel_threshold
    }

    // === PHASES ===

    fn perception_phase(&self, ctx: &mut SimulationContext) {
        let observers: Vec<AgentId> = ctx.registry.live_ids().into_iter().collect();
        let parallel = self.parallel(observers.len());
        let range = ctx.config.agents.perception_radius;
        let registry = &ctx.registry;
        let perceptions = self
            .pool
            .install(|| perception_system(registry, &observers, range, parallel));

        for perception in perceptions {
            if let Some(agent) = ctx.registry.get_mut(perception.observer) {
                agent.perceived = perception.perceived;
            }
        }
    }

    fn behavior_phase(
        &self,
        ctx: &mut SimulationContext,
        tick: Tick,
        watchdog: &PhaseWatchdog,
        scratch: &mut TickScratch,
        stats: &mut TickStats,
    ) -> Vec<AgentId> {
        let budget = self.config.behavior_budget();
        let terrain = TerrainView::capture(&ctx.chunks);

        // Agents deferred last tick go first and are exempt from the budget
        let mut carried = FairnessQueue::new();
        let mut normal = FairnessQueue::new();
        for agent in ctx.registry.iter() {
            match agent.status {
                Liveness::Deferred => carried.push(agent.id, agent.last_processed),
                Liveness::Active => normal.push(agent.id, agent.last_processed),
                Liveness::Dead => {}
            }
        }
        let order: AHashMap<AgentId, (usize, bool)> = carried
            .drain_ordered()
            .into_iter()
            .map(|id| (id, true))
            .chain(normal.drain_ordered().into_iter().map(|id| (id, false)))
            .enumerate()
            .map(|(rank, (id, exempt))| (id, (rank, exempt)))
            .collect();

        let mut work: Vec<(usize, bool, &mut Agent)> = ctx
            .registry
            .agents_mut()
            .values_mut()
            .filter_map(|agent| order.get(&agent.id).map(|&(rank, exempt)| (rank, exempt, agent)))
            .collect();
        work.sort_unstable_by_key(|(rank, _, _)| *rank);

        let parallel = self.parallel(work.len());
        let mut outcomes: Vec<BehaviorOutcome> = self.pool.install(|| {
            if parallel {
                work.par_iter_mut()
                    .map(|(_, exempt, agent)| evaluate_agent(agent, *exempt, tick, budget, watchdog, &terrain))
                    .collect()
            } else {
                work.iter_mut()
                    .map(|(_, exempt, agent)| evaluate_agent(agent, *exempt, tick, budget, watchdog, &terrain))
                    .collect()
            }
        });
        drop(work);

        // Merge in agent-id order so results never depend on thread timing
        outcomes.sort_unstable_by_key(BehaviorOutcome::agent);
        let mut deferred = Vec::new();
        let mut unfinished = Vec::new();
        for outcome in outcomes {
            match outcome {
                BehaviorOutcome::Evaluated { id, effects } => {
                    stats.agents_evaluated += 1;
                    scratch.commands.extend(effects.commands);
                    if !effects.outbox.is_empty() {
                        scratch.outboxes.push((id, effects.outbox));
                    }
                    scratch.edited.extend(effects.edited_chunks);
                }
                BehaviorOutcome::Deferred(id) => deferred.push(id),
                BehaviorOutcome::Unfinished(id) => unfinished.push(id),
            }
        }

        stats.agents_deferred = deferred.len();
        if !deferred.is_empty() {
            tracing::warn!(
                "Tick {}: behavior budget of {}ms exceeded, deferring {} agents",
                tick,
                self.config.behavior_budget_ms,
                deferred.len()
            );
            ctx.events.push(KernelEvent::TickOverrunWarning {
                tick,
                phase: Phase::Behavior,
                budget_ms: self.config.behavior_budget_ms,
                deferred,
            });
        }
        unfinished
    }

    fn decay_phase(
        &self,
        ctx: &mut SimulationContext,
        tick: Tick,
        watchdog: &PhaseWatchdog,
        stats: &mut TickStats,
    ) -> Vec<AgentId> {
        let memory = &ctx.config.memory;
        if tick % memory.decay_interval != 0 {
            return Vec::new();
        }
        let (factor, floor) = (memory.decay_factor, memory.prune_floor);

        let mut agents: Vec<&mut Agent> = ctx.registry.iter_mut().collect();
        let parallel = self.parallel(agents.len());
        let decay = |agent: &mut &mut Agent| -> std::result::Result<usize, AgentId> {
            if watchdog.expired() {
                return Err(agent.id);
            }
            Ok(agent.memory.decay(factor, floor, tick))
        };
        let results: Vec<std::result::Result<usize, AgentId>> = self.pool.install(|| {
            if parallel {
                agents.par_iter_mut().map(decay).collect()
            } else {
                agents.iter_mut().map(decay).collect()
            }
        });

        let mut unfinished = Vec::new();
        for result in results {
            match result {
                Ok(pruned) => stats.associations_pruned += pruned,
                Err(id) => unfinished.push(id),
            }
        }
        unfinished
    }
}

fn evaluate_agent(
    agent: &mut Agent,
    exempt: bool,
    tick: Tick,
    budget: Duration,
    watchdog: &PhaseWatchdog,
    terrain: &TerrainView,
) -> BehaviorOutcome {
    if watchdog.expired() {
        return BehaviorOutcome::Unfinished(agent.id);
    }
    if !exempt && watchdog.over(budget) {
        agent.status = Liveness::Deferred;
        return BehaviorOutcome::Deferred(agent.id);
    }

    let Agent {
        id,
        position,
        perceived,
        tree,
        exec,
        memory,
        inbox,
        inventory,
        status,
        last_processed,
        ..
    } = agent;
    let input = EvalInput {
        agent: *id,
        tick,
        position: *position,
        perceived,
        terrain,
    };
    let mind = AgentMind {
        exec,
        memory,
        inbox,
        inventory,
    };
    let (_, effects) = evaluate(tree, mind, &input);
    *status = Liveness::Active;
    *last_processed = tick;
    BehaviorOutcome::Evaluated { id: *id, effects }
}

fn stream_phase(ctx: &mut SimulationContext, tick: Tick) {
    let occupied = ctx.registry.occupied_chunks();
    let message_chunks = ctx.message_chunks();
    let report = ctx.chunks.update(tick, &occupied, &message_chunks);
    ctx.record_stream_report(&report, tick);

    let resources = &ctx.config.resources;
    if tick % resources.regrowth_interval == 0 && resources.regrowth_amount > 0.0 {
        let grown = ctx.chunks.regrow_resources(resources.regrowth_amount);
        if grown > 0.0 {
            tracing::debug!("Tick {}: deposits regrew by {:.1}", tick, grown);
        }
    }
}

fn action_phase(ctx: &mut SimulationContext, tick: Tick, scratch: &mut TickScratch, stats: &mut TickStats) {
    let commands = std::mem::take(&mut scratch.commands);
    let terrain = TerrainView::capture(&ctx.chunks);
    let result = CommandExecutor::execute(&mut ctx.registry, &terrain, &mut ctx.archive, commands, tick);

    stats.commands_rejected = result.rejected.len();
    for (command, error) in &result.rejected {
        ctx.events.push(KernelEvent::CommandRejected {
            tick,
            agent: command.agent(),
            reason: error.to_string(),
        });
    }
    for gathered in &result.gathered {
        ctx.events.push(KernelEvent::ResourceGathered {
            tick,
            agent: gathered.agent,
            resource: gathered.resource,
            amount: gathered.amount,
        });
        scratch.edited.insert(gathered.chunk);
    }
    for dead in &result.died {
        ctx.events.push(KernelEvent::AgentDied {
            tick,
            agent: dead.id,
            archived: dead.persistent_memory,
        });
    }
    for coord in std::mem::take(&mut scratch.edited) {
        ctx.chunks.mark_edited(coord);
    }
}

fn message_phase(ctx: &mut SimulationContext, tick: Tick, scratch: &mut TickScratch, stats: &mut TickStats) {
    let live = ctx.registry.live_ids();
    let report = ctx.bus.deliver(tick, &live);
    stats.messages_delivered = report.delivered.len();
    stats.messages_failed = report.failed.len();

    let max_inbox = ctx.config.agents.max_inbox;
    for (recipient, message) in report.delivered {
        if let Some(agent) = ctx.registry.get_mut(recipient) {
            agent.inbox.push(message);
            if agent.inbox.len() > max_inbox {
                let excess = agent.inbox.len() - max_inbox;
                agent.inbox.drain(..excess);
                stats.messages_overflowed += excess;
                tracing::debug!("{} inbox full, dropped {} oldest message(s)", recipient, excess);
            }
        }
    }
    for message in &report.failed {
        tracing::warn!(
            "Dropped message #{} from {:?}: recipient {:?} no longer exists",
            message.seq,
            message.sender,
            message.recipient
        );
        ctx.events.push(KernelEvent::delivery_failure(tick, message));
    }

    // Stamped with this tick; delivered in the next tick's message phase
    for (sender, outbox) in std::mem::take(&mut scratch.outboxes) {
        ctx.bus.send_all(sender, outbox, tick);
    }
}

fn deadlock_report(
    ctx: &SimulationContext,
    tick: Tick,
    phase: Phase,
    watchdog: &PhaseWatchdog,
    unfinished: Vec<AgentId>,
) -> DeadlockReport {
    DeadlockReport {
        tick,
        phase,
        elapsed_ms: watchdog.elapsed().as_millis(),
        deadline_ms: watchdog.deadline().as_millis(),
        unfinished_agents: unfinished,
        deferred_queue: ctx
            .registry
            .iter()
            .filter(|a| a.status == Liveness::Deferred)
            .map(|a| a.id)
            .collect(),
        chunks_in_flight: ctx.chunks.in_flight_coords(),
        pending_messages: ctx.bus.pending_count(),
        live_agents: ctx.registry.len(),
    }
}
