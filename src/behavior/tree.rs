//! Behavior tree arena with override slots

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::behavior::node::{Action, Condition, DecoratorKind, Node, NodeId, NodeKind, ParallelPolicy};
use crate::behavior::overrides::{find_cycle, winning, Override, OverrideId};
use crate::core::error::{KernelError, Result};

/// One agent's decision tree
///
/// Node ids never change once the tree is built. Overrides stack on top
/// of the original nodes and are resolved at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorTree {
    nodes: Vec<Node>,
    root: NodeId,
    #[serde(default)]
    overrides: BTreeMap<NodeId, Vec<Override>>,
    #[serde(default)]
    next_override: u64,
    /// Template this tree was instantiated from
    #[serde(default)]
    pub template: Option<String>,
}

impl BehaviorTree {
    /// Build a tree, rejecting dangling children, bad arity and cycles
    pub fn new(nodes: Vec<Node>, root: NodeId) -> Result<Self> {
        let tree = Self {
            nodes,
            root,
            overrides: BTreeMap::new(),
            next_override: 0,
            template: None,
        };
        tree.validate().map_err(KernelError::InvalidTree)?;
        Ok(tree)
    }

    /// Re-run structural validation, for trees that arrived deserialized
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(KernelError::InvalidTree)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.root.index() >= self.nodes.len() {
            return Err(format!("root {} is not in the arena", self.root));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            node.check_shape().map_err(|e| format!("node#{}: {}", i, e))?;
            self.check_children(node)
                .map_err(|e| format!("node#{}: {}", i, e))?;
        }
        if let Some(at) = find_cycle(self.nodes.len(), |id| self.all_children(id, None)) {
            return Err(format!("cycle through {}", at));
        }
        Ok(())
    }

    fn check_children(&self, node: &Node) -> std::result::Result<(), String> {
        match node.children.iter().find(|c| c.index() >= self.nodes.len()) {
            Some(missing) => Err(format!("child {} does not exist", missing)),
            None => Ok(()),
        }
    }

    /// Children reachable from `id` under the original node and every override,
    /// plus an optional candidate substitute
    fn all_children(&self, id: NodeId, candidate: Option<(NodeId, &Node)>) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .nodes
            .get(id.index())
            .map(|n| n.children.clone())
            .unwrap_or_default();
        if let Some(entries) = self.overrides.get(&id) {
            for o in entries {
                out.extend(o.node.children.iter().copied());
            }
        }
        if let Some((target, node)) = candidate {
            if target == id {
                out.extend(node.children.iter().copied());
            }
        }
        out
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn original(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// The node evaluation uses at `id`: the winning override if any
    pub fn effective(&self, id: NodeId) -> Option<&Node> {
        match self.overrides.get(&id).and_then(|entries| winning(entries)) {
            Some(o) => Some(&o.node),
            None => self.nodes.get(id.index()),
        }
    }

    pub fn overrides_at(&self, id: NodeId) -> &[Override] {
        self.overrides.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn override_count(&self) -> usize {
        self.overrides.values().map(|v| v.len()).sum()
    }

    // === OVERRIDES ===

    /// Install a substitute at `target`
    ///
    /// Rejected with `InvalidOverride` (tree unchanged) when the target or a
    /// child does not exist, the node is malformed, or the new edges would
    /// create a cycle.
    pub fn install_override(&mut self, target: NodeId, priority: i32, node: Node) -> Result<OverrideId> {
        if target.index() >= self.nodes.len() {
            return Err(KernelError::InvalidOverride(format!("no node {}", target)));
        }
        node.check_shape()
            .map_err(|e| KernelError::InvalidOverride(format!("at {}: {}", target, e)))?;
        self.check_children(&node)
            .map_err(|e| KernelError::InvalidOverride(format!("at {}: {}", target, e)))?;
        if let Some(at) = find_cycle(self.nodes.len(), |id| self.all_children(id, Some((target, &node)))) {
            return Err(KernelError::InvalidOverride(format!(
                "override at {} creates a cycle through {}",
                target, at
            )));
        }

        let seq = self.next_override;
        self.next_override += 1;
        let id = OverrideId(seq);
        self.overrides.entry(target).or_default().push(Override {
            id,
            priority,
            seq,
            node,
        });
        tracing::debug!("Installed {} at {} with priority {}", id, target, priority);
        Ok(id)
    }

    /// Remove an override; the node reverts to the next winner or the original
    pub fn remove_override(&mut self, id: OverrideId) -> Result<NodeId> {
        let found = self
            .overrides
            .iter()
            .find(|(_, entries)| entries.iter().any(|o| o.id == id))
            .map(|(target, _)| *target);
        let Some(target) = found else {
            return Err(KernelError::InvalidOverride(format!("no {} installed", id)));
        };
        if let Some(entries) = self.overrides.get_mut(&target) {
            entries.retain(|o| o.id != id);
            if entries.is_empty() {
                self.overrides.remove(&target);
            }
        }
        Ok(target)
    }

    /// Copy of the tree with every winning override baked into the arena
    pub fn baked(&self) -> Self {
        let nodes = (0..self.nodes.len())
            .map(|i| {
                let id = NodeId(i as u32);
                self.effective(id).cloned().unwrap_or_else(|| self.nodes[i].clone())
            })
            .collect();
        Self {
            nodes,
            root: self.root,
            overrides: BTreeMap::new(),
            next_override: 0,
            template: self.template.clone(),
        }
    }

    /// Copy of the tree without any overrides
    pub fn pristine(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            overrides: BTreeMap::new(),
            next_override: 0,
            template: self.template.clone(),
        }
    }
}

/// Incremental arena construction
///
/// ```
/// use hexkernel::behavior::{Action, TreeBuilder};
/// let mut b = TreeBuilder::new();
/// let wait = b.action(Action::Wait { ticks: 2 });
/// let root = b.sequence(vec![wait]);
/// let tree = b.build(root).unwrap();
/// assert_eq!(tree.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn action(&mut self, action: Action) -> NodeId {
        self.push(Node::action(action))
    }

    pub fn condition(&mut self, condition: Condition) -> NodeId {
        self.push(Node::condition(condition))
    }

    pub fn sequence(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(Node::composite(NodeKind::Sequence, children))
    }

    pub fn selector(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(Node::composite(NodeKind::Selector, children))
    }

    pub fn parallel(&mut self, policy: ParallelPolicy, children: Vec<NodeId>) -> NodeId {
        self.push(Node::composite(NodeKind::Parallel(policy), children))
    }

    pub fn decorate(&mut self, kind: DecoratorKind, child: NodeId) -> NodeId {
        self.push(Node::composite(NodeKind::Decorator(kind), vec![child]))
    }

    pub fn build(self, root: NodeId) -> Result<BehaviorTree> {
        BehaviorTree::new(self.nodes, root)
    }
}
