//! Tagged node variants stored in a flat arena
//!
//! Children are referenced by `NodeId` (arena index), never by pointer, so a
//! tree is plain data: cloneable, serializable and safe to read from many
//! threads at once.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::core::types::MessagePriority;
use crate::memory::schema::MemoryValue;
use crate::messaging::bus::Recipient;
use crate::spatial::hex::HexCoord;
use crate::world::chunk::ResourceKind;

/// Upper bound on `Repeat { times }`; repetitions that finish in the same
/// tick all run inside one evaluation
pub const MAX_REPEAT: u32 = 1_000;

/// Stable node identifier within one tree
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "node#{}", _0)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Result of evaluating a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failure,
    Running,
}

impl Status {
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            Status::Running => Status::Running,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParallelPolicy {
    /// Succeed when every child succeeds, fail on the first failure
    RequireAll,
    /// Succeed on the first success, fail when every child fails
    RequireOne,
}

/// Where a movement or position check points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveTarget {
    Hex(HexCoord),
    /// Hex stored in the agent's memory under this key
    Fact(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Constant(bool),
    FactExists { key: String },
    FactEquals { key: String, value: MemoryValue },
    /// At least `min` other agents perceived within `radius`
    AgentsNearby { radius: u32, min: usize },
    /// Inbox holds a message (optionally with this exact payload)
    HasMessage { payload: Option<String> },
    AtPosition { target: MoveTarget },
    AssociationAbove { a: String, b: String, threshold: f32 },
    /// The agent holds at least this much of a resource
    Carrying { resource: ResourceKind, at_least: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Travel for `ticks` ticks, then arrive at the target
    MoveTo { target: MoveTarget, ticks: u32 },
    Wait { ticks: u32 },
    Send {
        to: Recipient,
        payload: String,
        priority: MessagePriority,
    },
    SetFact { key: String, value: MemoryValue },
    Reinforce { a: String, b: String, delta: f32 },
    /// Consume the inbox into the memory log; the last payload is stored
    /// under `store_as` when given
    ReadInbox { store_as: Option<String> },
    /// Raise or lower the elevation of the agent's current tile
    ModifyTerrain { delta: i32 },
    /// Pick up to `amount` of a resource from the current tile; the tile
    /// is drawn down in the action phase, in agent-id order
    Gather { resource: ResourceKind, amount: f32 },
    /// Use up exactly `amount` from the agent's own stock
    Consume { resource: ResourceKind, amount: f32 },
    /// The agent dies at the end of this tick's action phase
    Expire,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecoratorKind {
    Invert,
    /// Run the child to success `times` times
    Repeat { times: u32 },
    /// Evaluate the child only while the condition holds; fail otherwise
    Gate { condition: Condition },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Sequence,
    Selector,
    Parallel(ParallelPolicy),
    Decorator(DecoratorKind),
    Condition(Condition),
    Action(Action),
}

impl NodeKind {
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Sequence => "sequence",
            NodeKind::Selector => "selector",
            NodeKind::Parallel(_) => "parallel",
            NodeKind::Decorator(_) => "decorator",
            NodeKind::Condition(_) => "condition",
            NodeKind::Action(_) => "action",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn action(action: Action) -> Self {
        Self::leaf(NodeKind::Action(action))
    }

    pub fn condition(condition: Condition) -> Self {
        Self::leaf(NodeKind::Condition(condition))
    }

    pub fn composite(kind: NodeKind, children: Vec<NodeId>) -> Self {
        Self { kind, children }
    }

    /// Check arity and parameters, ignoring what the children point at
    pub fn check_shape(&self) -> Result<(), String> {
        let n = self.children.len();
        match &self.kind {
            NodeKind::Sequence | NodeKind::Selector | NodeKind::Parallel(_) if n == 0 => {
                Err(format!("{} needs at least one child", self.kind.tag()))
            }
            NodeKind::Decorator(_) if n != 1 => {
                Err(format!("decorator needs exactly one child, has {}", n))
            }
            NodeKind::Condition(_) | NodeKind::Action(_) if n != 0 => {
                Err(format!("{} is a leaf but has {} children", self.kind.tag(), n))
            }
            NodeKind::Decorator(DecoratorKind::Repeat { times: 0 }) => {
                Err("repeat count must be positive".into())
            }
            NodeKind::Decorator(DecoratorKind::Repeat { times }) if *times > MAX_REPEAT => {
                Err(format!("repeat count {} exceeds {}", times, MAX_REPEAT))
            }
            NodeKind::Condition(Condition::AssociationAbove { threshold, .. })
                if !threshold.is_finite() =>
            {
                Err("association threshold must be finite".into())
            }
            NodeKind::Action(Action::Reinforce { delta, .. }) if !delta.is_finite() => {
                Err("reinforcement delta must be finite".into())
            }
            NodeKind::Action(Action::Gather { amount, .. })
            | NodeKind::Action(Action::Consume { amount, .. })
                if !(amount.is_finite() && *amount > 0.0) =>
            {
                Err(format!("resource amount {} must be positive and finite", amount))
            }
            NodeKind::Condition(Condition::Carrying { at_least, .. }) if !at_least.is_finite() => {
                Err("carried amount threshold must be finite".into())
            }
            NodeKind::Action(Action::Send { payload, .. }) if payload.is_empty() => {
                Err("message payload must not be empty".into())
            }
            NodeKind::Action(Action::SetFact { key, .. })
            | NodeKind::Condition(Condition::FactExists { key })
            | NodeKind::Condition(Condition::FactEquals { key, .. })
                if key.is_empty() =>
            {
                Err("memory key must not be empty".into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert() {
        assert_eq!(Status::Success.invert(), Status::Failure);
        assert_eq!(Status::Failure.invert(), Status::Success);
        assert_eq!(Status::Running.invert(), Status::Running);
    }

    #[test]
    fn test_shape_checks() {
        assert!(Node::composite(NodeKind::Sequence, vec![]).check_shape().is_err());
        assert!(Node::composite(NodeKind::Decorator(DecoratorKind::Invert), vec![NodeId(1), NodeId(2)])
            .check_shape()
            .is_err());
        assert!(Node::composite(NodeKind::Decorator(DecoratorKind::Repeat { times: 0 }), vec![NodeId(1)])
            .check_shape()
            .is_err());
        assert!(Node::composite(NodeKind::Action(Action::Expire), vec![NodeId(1)])
            .check_shape()
            .is_err());
        assert!(Node::action(Action::Wait { ticks: 2 }).check_shape().is_ok());
    }

    #[test]
    fn test_repeat_count_bounded() {
        let repeat = |times| Node::composite(NodeKind::Decorator(DecoratorKind::Repeat { times }), vec![NodeId(1)]);
        assert!(repeat(MAX_REPEAT).check_shape().is_ok());
        assert!(repeat(MAX_REPEAT + 1).check_shape().is_err());
        assert!(repeat(u32::MAX).check_shape().is_err());
    }

    #[test]
    fn test_resource_amounts_checked() {
        let gather = |amount| Node::action(Action::Gather { resource: ResourceKind::Food, amount });
        assert!(gather(2.5).check_shape().is_ok());
        assert!(gather(0.0).check_shape().is_err());
        assert!(gather(f32::NAN).check_shape().is_err());
        assert!(Node::action(Action::Consume { resource: ResourceKind::Water, amount: -1.0 })
            .check_shape()
            .is_err());
    }

    #[test]
    fn test_node_serde_shape() {
        let node = Node::action(Action::MoveTo {
            target: MoveTarget::Hex(HexCoord::new(1, 0)),
            ticks: 3,
        });
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
