//! Behavior tree engine
//!
//! Trees are flat arenas of tagged nodes interpreted once per agent per
//! tick. Multi-tick actions keep an explicit cursor keyed by node id, and
//! external edits stack prioritized overrides on top of any node.

pub mod cursor;
pub mod interpreter;
pub mod node;
pub mod overrides;
pub mod template;
pub mod tree;

pub use cursor::{ExecutionCursor, ExecutionState};
pub use interpreter::{evaluate, AgentMind, Effects, EvalInput};
pub use node::{
    Action, Condition, DecoratorKind, MoveTarget, Node, NodeId, NodeKind, ParallelPolicy, Status,
};
pub use overrides::{Override, OverrideId};
pub use template::TemplateLibrary;
pub use tree::{BehaviorTree, TreeBuilder};
