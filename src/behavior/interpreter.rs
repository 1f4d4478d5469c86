//! Data-driven tree interpreter
//!
//! One evaluation per agent per tick, depth first from the root. The
//! interpreter only touches the agent's own state (execution cursors,
//! memory, inbox, inventory) plus the shared terrain view; anything that
//! changes shared state (moving, gathering, dying) is returned as a
//! `Command` for the action phase, and outgoing messages go to the agent's
//! outbox.

use std::collections::BTreeSet;

use crate::agent::Inventory;
use crate::behavior::cursor::{ExecutionCursor, ExecutionState};
use crate::behavior::node::{Action, Condition, DecoratorKind, MoveTarget, NodeId, NodeKind, ParallelPolicy, Status};
use crate::behavior::tree::BehaviorTree;
use crate::command::Command;
use crate::core::types::{AgentId, Tick};
use crate::memory::schema::MemoryValue;
use crate::memory::store::{MemoryEventKind, MemoryStore};
use crate::messaging::bus::{Message, OutgoingMessage};
use crate::simulation::perception::PerceivedAgent;
use crate::spatial::hex::{ChunkCoord, HexCoord, HexPosition};
use crate::world::view::{ChunkReadiness, TerrainView};

/// Read-only inputs for one evaluation
pub struct EvalInput<'a> {
    pub agent: AgentId,
    pub tick: Tick,
    pub position: HexPosition,
    pub perceived: &'a [PerceivedAgent],
    pub terrain: &'a TerrainView,
}

/// Everything an evaluation produced besides its status
#[derive(Debug, Default)]
pub struct Effects {
    pub commands: Vec<Command>,
    pub outbox: Vec<OutgoingMessage>,
    pub edited_chunks: Vec<ChunkCoord>,
}

/// Mutable per-agent state the interpreter works on
pub struct AgentMind<'a> {
    pub exec: &'a mut ExecutionState,
    pub memory: &'a mut MemoryStore,
    pub inbox: &'a mut Vec<Message>,
    pub inventory: &'a mut Inventory,
}

struct Evaluator<'a, 'm> {
    tree: &'a BehaviorTree,
    input: &'a EvalInput<'a>,
    mind: AgentMind<'m>,
    /// Resume path from the previous evaluation
    resume: BTreeSet<NodeId>,
    effects: Effects,
}

/// Evaluate `tree` once for one agent
pub fn evaluate(tree: &BehaviorTree, mind: AgentMind<'_>, input: &EvalInput<'_>) -> (Status, Effects) {
    let resume = mind.exec.begin();
    let mut evaluator = Evaluator {
        tree,
        input,
        mind,
        resume,
        effects: Effects::default(),
    };
    let status = evaluator.run(tree.root());
    evaluator.mind.exec.finish(status);
    (status, evaluator.effects)
}

impl<'a, 'm> Evaluator<'a, 'm> {
    fn run(&mut self, id: NodeId) -> Status {
        let tree = self.tree;
        let Some(node) = tree.effective(id) else {
            return Status::Failure;
        };
        let status = match &node.kind {
            NodeKind::Sequence => self.sequence(id, &node.children),
            NodeKind::Selector => self.selector(id, &node.children),
            NodeKind::Parallel(policy) => self.parallel(id, *policy, &node.children),
            NodeKind::Decorator(kind) => match node.children.first() {
                Some(&child) => self.decorator(id, kind, child),
                None => Status::Failure,
            },
            NodeKind::Condition(condition) => {
                if self.check(condition) {
                    Status::Success
                } else {
                    Status::Failure
                }
            }
            NodeKind::Action(action) => self.act(id, action),
        };
        if status == Status::Running {
            self.mind.exec.mark_running(id);
        } else {
            // Finished nodes start fresh if visited again (Repeat loops)
            self.mind.exec.drop_cursor(id);
        }
        status
    }

    /// Index to start a composite at: the child that was running, or 0
    fn resume_index(&self, children: &[NodeId]) -> usize {
        children
            .iter()
            .position(|c| self.resume.contains(c))
            .unwrap_or(0)
    }

    fn sequence(&mut self, _id: NodeId, children: &[NodeId]) -> Status {
        for &child in &children[self.resume_index(children)..] {
            match self.run(child) {
                Status::Success => continue,
                other => return other,
            }
        }
        Status::Success
    }

    fn selector(&mut self, _id: NodeId, children: &[NodeId]) -> Status {
        for &child in &children[self.resume_index(children)..] {
            match self.run(child) {
                Status::Failure => continue,
                other => return other,
            }
        }
        Status::Failure
    }

    /// Children that finished in an earlier tick keep their result and are
    /// not run again while the Parallel is still Running
    fn parallel(&mut self, id: NodeId, policy: ParallelPolicy, children: &[NodeId]) -> Status {
        let mut settled = self.mind.exec.take_settled(id);
        let mut results = Vec::with_capacity(children.len());
        for &child in children {
            let status = match settled.get(&child) {
                Some(&done) => done,
                None => self.run(child),
            };
            if status != Status::Running {
                settled.insert(child, status);
            }
            results.push(status);
        }
        let successes = results.iter().filter(|s| **s == Status::Success).count();
        let failures = results.iter().filter(|s| **s == Status::Failure).count();
        match policy {
            ParallelPolicy::RequireAll if failures > 0 => Status::Failure,
            ParallelPolicy::RequireAll if successes == results.len() => Status::Success,
            ParallelPolicy::RequireOne if successes > 0 => Status::Success,
            ParallelPolicy::RequireOne if failures == results.len() => Status::Failure,
            _ => {
                self.mind.exec.set_settled(id, settled);
                Status::Running
            }
        }
    }

    fn decorator(&mut self, id: NodeId, kind: &DecoratorKind, child: NodeId) -> Status {
        match kind {
            DecoratorKind::Invert => self.run(child).invert(),
            DecoratorKind::Gate { condition } => {
                if self.check(condition) {
                    self.run(child)
                } else {
                    Status::Failure
                }
            }
            DecoratorKind::Repeat { times } => {
                let mut cursor = self.cursor_or_new(id);
                while cursor.progress < *times {
                    match self.run(child) {
                        Status::Success => cursor.progress += 1,
                        Status::Failure => return Status::Failure,
                        Status::Running => {
                            self.mind.exec.set_cursor(id, cursor);
                            return Status::Running;
                        }
                    }
                }
                Status::Success
            }
        }
    }

    fn cursor_or_new(&self, id: NodeId) -> ExecutionCursor {
        self.mind
            .exec
            .cursor(id)
            .copied()
            .unwrap_or(ExecutionCursor {
                started_at: self.input.tick,
                progress: 0,
            })
    }

    fn resolve(&self, target: &MoveTarget) -> Option<HexCoord> {
        match target {
            MoveTarget::Hex(hex) => Some(*hex),
            MoveTarget::Fact(key) => self.mind.memory.get(key).and_then(MemoryValue::as_hex),
        }
    }

    // === CONDITIONS ===

    fn check(&self, condition: &Condition) -> bool {
        let memory = &*self.mind.memory;
        match condition {
            Condition::Constant(value) => *value,
            Condition::FactExists { key } => memory.contains(key),
            Condition::FactEquals { key, value } => memory.get(key) == Some(value),
            Condition::AgentsNearby { radius, min } => {
                self.input
                    .perceived
                    .iter()
                    .filter(|p| p.distance <= *radius)
                    .count()
                    >= *min
            }
            Condition::HasMessage { payload } => self
                .mind
                .inbox
                .iter()
                .any(|m| payload.as_ref().map_or(true, |p| *p == m.payload)),
            Condition::AtPosition { target } => {
                self.resolve(target) == Some(self.input.position.coord)
            }
            Condition::AssociationAbove { a, b, threshold } => memory.association(a, b) > *threshold,
            Condition::Carrying { resource, at_least } => self.mind.inventory.get(*resource) >= *at_least,
        }
    }

    // === ACTIONS ===

    fn act(&mut self, id: NodeId, action: &Action) -> Status {
        let tick = self.input.tick;
        match action {
            Action::MoveTo { target, ticks } => {
                let Some(target) = self.resolve(target) else {
                    return Status::Failure;
                };
                if target == self.input.position.coord {
                    return Status::Success;
                }
                let mut cursor = self.cursor_or_new(id);
                if cursor.progress < *ticks {
                    cursor.progress += 1;
                    self.mind.exec.set_cursor(id, cursor);
                    return Status::Running;
                }
                let chunk = self.input.terrain.chunk_of(target);
                if !self.input.terrain.is_chunk_ready(chunk) {
                    tracing::debug!("{} cannot enter {}: chunk not ready", self.input.agent, chunk);
                    return Status::Failure;
                }
                let elevation = self.input.terrain.elevation(target).unwrap_or(0);
                self.effects.commands.push(Command::Move {
                    agent: self.input.agent,
                    to: HexPosition::new(target, elevation),
                });
                Status::Success
            }
            Action::Wait { ticks } => {
                let mut cursor = self.cursor_or_new(id);
                if cursor.progress < *ticks {
                    cursor.progress += 1;
                    self.mind.exec.set_cursor(id, cursor);
                    Status::Running
                } else {
                    Status::Success
                }
            }
            Action::Send { to, payload, priority } => {
                self.effects.outbox.push(OutgoingMessage {
                    recipient: *to,
                    payload: payload.clone(),
                    priority: *priority,
                });
                Status::Success
            }
            Action::SetFact { key, value } => {
                self.mind.memory.set(key.clone(), value.clone(), tick);
                Status::Success
            }
            Action::Reinforce { a, b, delta } => {
                self.mind.memory.reinforce(a, b, *delta, tick);
                Status::Success
            }
            Action::ReadInbox { store_as } => {
                if self.mind.inbox.is_empty() {
                    return Status::Failure;
                }
                let messages = std::mem::take(&mut *self.mind.inbox);
                let mut last = None;
                for message in messages {
                    self.mind.memory.record(
                        tick,
                        MemoryEventKind::MessageReceived {
                            from: message.sender.agent(),
                            payload: message.payload.clone(),
                        },
                    );
                    last = Some(message.payload);
                }
                if let (Some(key), Some(payload)) = (store_as, last) {
                    self.mind.memory.set(key.clone(), MemoryValue::Text(payload), tick);
                }
                Status::Success
            }
            Action::ModifyTerrain { delta } => {
                let hex = self.input.position.coord;
                match self.input.terrain.modify_elevation(hex, *delta) {
                    Some(_) => {
                        self.effects.edited_chunks.push(self.input.terrain.chunk_of(hex));
                        Status::Success
                    }
                    None => Status::Failure,
                }
            }
            Action::Gather { resource, amount } => {
                let here = self.input.position.coord;
                if self.input.terrain.resource(here, *resource) <= 0.0
                    || self.mind.inventory.space(*resource) <= 0.0
                {
                    return Status::Failure;
                }
                self.effects.commands.push(Command::Gather {
                    agent: self.input.agent,
                    resource: *resource,
                    amount: *amount,
                });
                Status::Success
            }
            Action::Consume { resource, amount } => {
                if self.mind.inventory.consume(*resource, *amount) {
                    Status::Success
                } else {
                    Status::Failure
                }
            }
            Action::Expire => {
                self.effects.commands.push(Command::Die {
                    agent: self.input.agent,
                });
                Status::Success
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::node::Node;
    use crate::behavior::tree::TreeBuilder;
    use crate::core::types::MessagePriority;
    use crate::messaging::bus::{MessageSender, Recipient};
    use crate::world::chunk::{ChunkTerrain, ResourceDeposit, ResourceKind, TileSet};

    struct Harness {
        exec: ExecutionState,
        memory: MemoryStore,
        inbox: Vec<Message>,
        inventory: Inventory,
        terrain: TerrainView,
        position: HexPosition,
        perceived: Vec<PerceivedAgent>,
    }

    impl Harness {
        fn new() -> Self {
            let terrain = TerrainView::new(4)
                .with_chunk(ChunkTerrain::new(TileSet::placeholder(ChunkCoord::new(0, 0), 4)));
            Self {
                exec: ExecutionState::new(),
                memory: MemoryStore::new(),
                inbox: Vec::new(),
                inventory: Inventory::with_capacity(10.0),
                terrain,
                position: HexPosition::at(0, 0),
                perceived: Vec::new(),
            }
        }

        fn tick(&mut self, tree: &BehaviorTree, tick: Tick) -> (Status, Effects) {
            let input = EvalInput {
                agent: AgentId(1),
                tick,
                position: self.position,
                perceived: &self.perceived,
                terrain: &self.terrain,
            };
            let mind = AgentMind {
                exec: &mut self.exec,
                memory: &mut self.memory,
                inbox: &mut self.inbox,
                inventory: &mut self.inventory,
            };
            evaluate(tree, mind, &input)
        }
    }

    fn move_tree() -> BehaviorTree {
        let mut b = TreeBuilder::new();
        let mv = b.action(Action::MoveTo {
            target: MoveTarget::Hex(HexCoord::new(1, 0)),
            ticks: 3,
        });
        let root = b.selector(vec![mv]);
        b.build(root).unwrap()
    }

    #[test]
    fn test_move_runs_then_succeeds() {
        let tree = move_tree();
        let mut h = Harness::new();
        for tick in 1..=3 {
            let (status, effects) = h.tick(&tree, tick);
            assert_eq!(status, Status::Running);
            assert!(effects.commands.is_empty());
        }
        let (status, effects) = h.tick(&tree, 4);
        assert_eq!(status, Status::Success);
        assert_eq!(
            effects.commands,
            vec![Command::Move {
                agent: AgentId(1),
                to: HexPosition::at(1, 0)
            }]
        );
        assert!(h.exec.cursor(NodeId(0)).is_none());
    }

    #[test]
    fn test_move_into_unready_chunk_fails() {
        let mut b = TreeBuilder::new();
        let mv = b.action(Action::MoveTo {
            target: MoveTarget::Hex(HexCoord::new(40, 0)),
            ticks: 0,
        });
        let tree = b.build(mv).unwrap();
        let mut h = Harness::new();
        let (status, effects) = h.tick(&tree, 1);
        assert_eq!(status, Status::Failure);
        assert!(effects.commands.is_empty());
    }

    #[test]
    fn test_sequence_resumes_running_child() {
        let mut b = TreeBuilder::new();
        let count = b.action(Action::Reinforce {
            a: "seq".into(),
            b: "start".into(),
            delta: 1.0,
        });
        let wait = b.action(Action::Wait { ticks: 2 });
        let root = b.sequence(vec![count, wait]);
        let tree = b.build(root).unwrap();

        let mut h = Harness::new();
        assert_eq!(h.tick(&tree, 1).0, Status::Running);
        assert_eq!(h.tick(&tree, 2).0, Status::Running);
        assert_eq!(h.tick(&tree, 3).0, Status::Success);
        // The first child ran once: resumption skipped it on ticks 2 and 3
        assert!((h.memory.association("seq", "start") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cursor_cancelled_when_branch_abandoned() {
        let mut b = TreeBuilder::new();
        let alarm = b.condition(Condition::FactExists { key: "alert".into() });
        let flee = b.action(Action::SetFact {
            key: "fled".into(),
            value: true.into(),
        });
        let urgent = b.sequence(vec![alarm, flee]);
        let wait = b.action(Action::Wait { ticks: 5 });
        let root = b.selector(vec![urgent, wait]);
        let tree = b.build(root).unwrap();

        let mut h = Harness::new();
        assert_eq!(h.tick(&tree, 1).0, Status::Running);
        assert!(h.exec.cursor(wait).is_some());

        h.memory.set("alert", true.into(), 1);
        assert_eq!(h.tick(&tree, 2).0, Status::Running);
        // The selector resumes the running wait rather than re-planning
        assert!(h.exec.cursor(wait).is_some());

        // Dropping the resume path lets the selector re-plan from the top
        h.exec.cancel(wait);
        h.exec.cancel(root);
        assert_eq!(h.tick(&tree, 3).0, Status::Success);
        assert!(h.exec.cursor(wait).is_none());
        assert_eq!(h.memory.get("fled"), Some(&MemoryValue::Bool(true)));
    }

    #[test]
    fn test_parallel_policies() {
        for (policy, expected) in [
            (ParallelPolicy::RequireAll, Status::Failure),
            (ParallelPolicy::RequireOne, Status::Success),
        ] {
            let mut b = TreeBuilder::new();
            let yes = b.condition(Condition::Constant(true));
            let no = b.condition(Condition::Constant(false));
            let root = b.parallel(policy, vec![yes, no]);
            let tree = b.build(root).unwrap();
            assert_eq!(Harness::new().tick(&tree, 1).0, expected);
        }
    }

    #[test]
    fn test_parallel_keeps_finished_children() {
        let mut b = TreeBuilder::new();
        let hello = b.action(Action::Send {
            to: Recipient::Broadcast,
            payload: "hi".into(),
            priority: MessagePriority::Normal,
        });
        let short = b.action(Action::Wait { ticks: 1 });
        let long = b.action(Action::Wait { ticks: 2 });
        let root = b.parallel(ParallelPolicy::RequireAll, vec![hello, short, long]);
        let tree = b.build(root).unwrap();

        let mut h = Harness::new();
        let mut sent = 0;
        let mut statuses = Vec::new();
        for tick in 1..=3 {
            let (status, effects) = h.tick(&tree, tick);
            sent += effects.outbox.len();
            statuses.push(status);
        }
        assert_eq!(statuses, vec![Status::Running, Status::Running, Status::Success]);
        assert_eq!(sent, 1);
        assert!(h.exec.settled(root).is_none());

        // A fresh start after completion runs every child again
        let (status, effects) = h.tick(&tree, 4);
        assert_eq!(status, Status::Running);
        assert_eq!(effects.outbox.len(), 1);
    }

    #[test]
    fn test_repeat_counts_across_ticks() {
        let mut b = TreeBuilder::new();
        let wait = b.action(Action::Wait { ticks: 1 });
        let root = b.decorate(DecoratorKind::Repeat { times: 2 }, wait);
        let tree = b.build(root).unwrap();

        let mut h = Harness::new();
        assert_eq!(h.tick(&tree, 1).0, Status::Running);
        // Second repetition starts in the tick the first one finishes
        assert_eq!(h.tick(&tree, 2).0, Status::Running);
        assert_eq!(h.tick(&tree, 3).0, Status::Success);
    }

    #[test]
    fn test_gate_and_invert() {
        let mut b = TreeBuilder::new();
        let ok = b.condition(Condition::Constant(true));
        let gated = b.decorate(
            DecoratorKind::Gate {
                condition: Condition::FactEquals {
                    key: "role".into(),
                    value: "guard".into(),
                },
            },
            ok,
        );
        let root = b.decorate(DecoratorKind::Invert, gated);
        let tree = b.build(root).unwrap();

        let mut h = Harness::new();
        assert_eq!(h.tick(&tree, 1).0, Status::Success);
        h.memory.set("role", "guard".into(), 1);
        assert_eq!(h.tick(&tree, 2).0, Status::Failure);
    }

    #[test]
    fn test_override_decides_outcome() {
        let mut b = TreeBuilder::new();
        let leaf = b.condition(Condition::Constant(false));
        let tree_root = b.sequence(vec![leaf]);
        let mut tree = b.build(tree_root).unwrap();

        let mut h = Harness::new();
        assert_eq!(h.tick(&tree, 1).0, Status::Failure);

        tree.install_override(leaf, 1, Node::condition(Condition::Constant(true)))
            .unwrap();
        tree.install_override(leaf, 2, Node::condition(Condition::Constant(false)))
            .unwrap();
        assert_eq!(h.tick(&tree, 2).0, Status::Failure);

        tree.install_override(leaf, 3, Node::condition(Condition::Constant(true)))
            .unwrap();
        assert_eq!(h.tick(&tree, 3).0, Status::Success);
    }

    #[test]
    fn test_inbox_and_send() {
        let mut b = TreeBuilder::new();
        let has = b.condition(Condition::HasMessage { payload: Some("ping".into()) });
        let read = b.action(Action::ReadInbox { store_as: Some("mood".into()) });
        let reply = b.action(Action::Send {
            to: Recipient::Agent(AgentId(2)),
            payload: "pong".into(),
            priority: MessagePriority::Normal,
        });
        let root = b.sequence(vec![has, read, reply]);
        let tree = b.build(root).unwrap();

        let mut h = Harness::new();
        h.inbox.push(Message {
            seq: 0,
            sender: MessageSender::Agent(AgentId(2)),
            recipient: Recipient::Agent(AgentId(1)),
            payload: "ping".into(),
            sent_tick: 0,
            priority: MessagePriority::Normal,
        });

        let (status, effects) = h.tick(&tree, 1);
        assert_eq!(status, Status::Success);
        assert!(h.inbox.is_empty());
        assert_eq!(h.memory.get("mood"), Some(&MemoryValue::Text("ping".into())));
        assert_eq!(effects.outbox.len(), 1);
        assert_eq!(effects.outbox[0].payload, "pong");
    }

    #[test]
    fn test_modify_terrain_marks_chunk() {
        let mut b = TreeBuilder::new();
        let dig = b.action(Action::ModifyTerrain { delta: -1 });
        let tree = b.build(dig).unwrap();

        let mut h = Harness::new();
        let (status, effects) = h.tick(&tree, 1);
        assert_eq!(status, Status::Success);
        assert_eq!(effects.edited_chunks, vec![ChunkCoord::new(0, 0)]);
        assert_eq!(h.terrain.elevation(HexCoord::new(0, 0)), Some(-1));
    }

    #[test]
    fn test_terrain_overflow_fails_cleanly() {
        let mut b = TreeBuilder::new();
        let raise = b.action(Action::ModifyTerrain { delta: i32::MAX });
        let tree = b.build(raise).unwrap();

        let mut h = Harness::new();
        let (status, effects) = h.tick(&tree, 1);
        assert_eq!(status, Status::Success);
        let (status, effects_again) = h.tick(&tree, 2);
        assert_eq!(status, Status::Failure);
        assert_eq!(effects.edited_chunks.len(), 1);
        assert!(effects_again.edited_chunks.is_empty());
        assert_eq!(h.terrain.elevation(HexCoord::new(0, 0)), Some(i32::MAX));
    }

    #[test]
    fn test_gather_needs_deposit_and_room() {
        let mut b = TreeBuilder::new();
        let gather = b.action(Action::Gather { resource: ResourceKind::Water, amount: 4.0 });
        let tree = b.build(gather).unwrap();

        let mut h = Harness::new();
        assert_eq!(h.tick(&tree, 1).0, Status::Failure);

        let mut tiles = TileSet::placeholder(ChunkCoord::new(0, 0), 4);
        tiles.tiles[0].resources.push(ResourceDeposit::full(ResourceKind::Water, 20.0));
        h.terrain = TerrainView::new(4).with_chunk(ChunkTerrain::new(tiles));
        let (status, effects) = h.tick(&tree, 2);
        assert_eq!(status, Status::Success);
        assert_eq!(
            effects.commands,
            vec![Command::Gather { agent: AgentId(1), resource: ResourceKind::Water, amount: 4.0 }]
        );
        // The tile is only drawn down when the command runs
        assert_eq!(h.terrain.resource(HexCoord::new(0, 0), ResourceKind::Water), 20.0);

        h.inventory.add(ResourceKind::Water, 10.0);
        assert_eq!(h.tick(&tree, 3).0, Status::Failure);
    }

    #[test]
    fn test_consume_and_carrying() {
        let mut b = TreeBuilder::new();
        let fed = b.condition(Condition::Carrying { resource: ResourceKind::Food, at_least: 2.0 });
        let eat = b.action(Action::Consume { resource: ResourceKind::Food, amount: 2.0 });
        let root = b.sequence(vec![fed, eat]);
        let tree = b.build(root).unwrap();

        let mut h = Harness::new();
        h.inventory.add(ResourceKind::Food, 3.0);
        assert_eq!(h.tick(&tree, 1).0, Status::Success);
        assert_eq!(h.inventory.get(ResourceKind::Food), 1.0);
        assert_eq!(h.tick(&tree, 2).0, Status::Failure);
        assert_eq!(h.inventory.get(ResourceKind::Food), 1.0);
    }

    #[test]
    fn test_agents_nearby() {
        let mut b = TreeBuilder::new();
        let crowd = b.condition(Condition::AgentsNearby { radius: 2, min: 2 });
        let tree = b.build(crowd).unwrap();

        let mut h = Harness::new();
        h.perceived = vec![
            PerceivedAgent { id: AgentId(2), coord: HexCoord::new(1, 0), distance: 1 },
            PerceivedAgent { id: AgentId(3), coord: HexCoord::new(5, 0), distance: 5 },
        ];
        assert_eq!(h.tick(&tree, 1).0, Status::Failure);
        h.perceived.push(PerceivedAgent { id: AgentId(4), coord: HexCoord::new(0, 2), distance: 2 });
        assert_eq!(h.tick(&tree, 2).0, Status::Success);
    }
}
