//! Command execution
//!
//! Two entry points that change shared or per-agent state:
//! - `CommandExecutor::execute` applies the commands agents produced during
//!   the behavior phase, sequentially in agent-id order, so agents gathering
//!   from the same tile are served lowest id first
//! - `apply_intent` is the single validated door for external edits

use crate::agent::{Agent, AgentRegistry};
use crate::behavior::TemplateLibrary;
use crate::command::intent::{Intent, IntentOutcome};
use crate::core::error::{KernelError, Result};
use crate::core::types::{AgentId, Tick};
use crate::memory::{MemoryArchive, MemorySchema};
use crate::spatial::hex::{ChunkCoord, HexPosition};
use crate::world::chunk::ResourceKind;
use crate::world::view::TerrainView;

/// A shared-state mutation requested by an agent's tree
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move { agent: AgentId, to: HexPosition },
    /// Take from the tile the agent stands on when the command runs
    Gather { agent: AgentId, resource: ResourceKind, amount: f32 },
    Die { agent: AgentId },
}

impl Command {
    pub fn agent(&self) -> AgentId {
        match self {
            Command::Move { agent, .. } | Command::Gather { agent, .. } | Command::Die { agent } => *agent,
        }
    }
}

/// Resources moved from a tile into an agent's inventory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gathered {
    pub agent: AgentId,
    pub resource: ResourceKind,
    pub amount: f32,
    pub chunk: ChunkCoord,
}

/// Result of executing a batch of commands
#[derive(Debug, Default)]
pub struct ExecutionResult {
    pub moved: Vec<AgentId>,
    pub gathered: Vec<Gathered>,
    pub died: Vec<Agent>,
    pub rejected: Vec<(Command, KernelError)>,
}

/// Applies agent commands to the registry
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn execute(
        registry: &mut AgentRegistry,
        terrain: &TerrainView,
        archive: &mut MemoryArchive,
        commands: Vec<Command>,
        tick: Tick,
    ) -> ExecutionResult {
        let mut result = ExecutionResult::default();
        for command in commands {
            let outcome = match &command {
                Command::Move { agent, to } => registry.move_agent(*agent, *to, terrain).map(|_| {
                    result.moved.push(*agent);
                }),
                Command::Gather { agent, resource, amount } => {
                    Self::gather(registry, terrain, *agent, *resource, *amount).map(|gathered| {
                        result.gathered.push(gathered);
                    })
                }
                Command::Die { agent } => registry.destroy(*agent, archive, tick).map(|dead| {
                    result.died.push(dead);
                }),
            };
            if let Err(error) = outcome {
                tracing::debug!("Rejected {:?}: {}", command, error);
                result.rejected.push((command, error));
            }
        }
        result
    }

    /// Move what fits from the agent's tile into its inventory
    fn gather(
        registry: &mut AgentRegistry,
        terrain: &TerrainView,
        agent: AgentId,
        resource: ResourceKind,
        wanted: f32,
    ) -> Result<Gathered> {
        let carrier = registry.get_mut(agent).ok_or(KernelError::AgentNotFound(agent))?;
        let at = carrier.position.coord;
        let room = wanted.min(carrier.inventory.space(resource));
        let taken = terrain.take_resource(at, resource, room).unwrap_or(0.0);
        if taken <= 0.0 {
            return Err(KernelError::ResourceExhausted { at, kind: resource });
        }
        carrier.inventory.add(resource, taken);
        Ok(Gathered {
            agent,
            resource,
            amount: taken,
            chunk: terrain.chunk_of(at),
        })
    }
}

/// Apply an external edit to one agent
///
/// Every intent is validated in full before anything is committed; on
/// error the agent (and the template library) are unchanged.
pub fn apply_intent(
    agent: &mut Agent,
    templates: &mut TemplateLibrary,
    schema: &MemorySchema,
    intent: Intent,
    tick: Tick,
) -> Result<IntentOutcome> {
    let outcome = match intent {
        Intent::SetFacts { facts } => {
            let entries: Vec<_> = facts.into_iter().map(|f| (f.key, f.value)).collect();
            agent.memory.apply_edit(&entries, schema, tick)?;
            IntentOutcome::FactsSet(entries.len())
        }
        Intent::Associate { a, b, delta } => {
            if a.is_empty() || b.is_empty() {
                return Err(KernelError::InvalidEdit("association endpoints must be named".into()));
            }
            if !delta.is_finite() {
                return Err(KernelError::InvalidEdit(format!("association delta {} is not finite", delta)));
            }
            let weight = agent.memory.reinforce(&a, &b, delta, tick);
            IntentOutcome::Associated { weight }
        }
        Intent::InstallOverride {
            node,
            priority,
            substitute,
        } => {
            let id = agent.tree.install_override(node, priority, substitute)?;
            // The node's definition changed: any progress it had is meaningless now
            agent.exec.cancel(node);
            IntentOutcome::OverrideInstalled(id)
        }
        Intent::RemoveOverride { id } => {
            let node = agent.tree.remove_override(id)?;
            agent.exec.cancel(node);
            IntentOutcome::OverrideRemoved { node }
        }
        Intent::PromoteTemplate { name } => {
            if name.trim().is_empty() {
                return Err(KernelError::InvalidEdit("template name must not be empty".into()));
            }
            templates.promote(name.clone(), &agent.tree);
            IntentOutcome::TemplatePromoted(name)
        }
    };
    tracing::info!("Applied intent to {}: {:?}", agent.id, outcome);
    Ok(outcome)
}
