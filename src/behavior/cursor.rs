//! Resumable execution state for multi-tick nodes

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::behavior::node::{NodeId, Status};
use crate::core::types::Tick;

/// Progress of a node that returned Running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCursor {
    pub started_at: Tick,
    /// Node-specific counter (ticks travelled, repetitions done)
    pub progress: u32,
}

/// Per-agent execution state, keyed by node id
///
/// A cursor only survives an evaluation if its node returned Running in
/// that evaluation; anything else cancels it, returning the node to its
/// initial state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    cursors: BTreeMap<NodeId, ExecutionCursor>,
    /// Nodes that returned Running in the last evaluation (the resume path)
    running: BTreeSet<NodeId>,
    /// Children of a running Parallel that already finished, with their result
    #[serde(default)]
    settled: BTreeMap<NodeId, BTreeMap<NodeId, Status>>,
    pub last_status: Option<Status>,
    pub evaluations: u64,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self, node: NodeId) -> Option<&ExecutionCursor> {
        self.cursors.get(&node)
    }

    pub fn cursors(&self) -> impl Iterator<Item = (&NodeId, &ExecutionCursor)> {
        self.cursors.iter()
    }

    pub fn is_running(&self, node: NodeId) -> bool {
        self.running.contains(&node)
    }

    pub fn running(&self) -> &BTreeSet<NodeId> {
        &self.running
    }

    /// Drop all state for a node (its definition changed underneath it)
    pub fn cancel(&mut self, node: NodeId) {
        self.cursors.remove(&node);
        self.running.remove(&node);
        self.settled.remove(&node);
        for children in self.settled.values_mut() {
            children.remove(&node);
        }
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
        self.running.clear();
        self.settled.clear();
    }

    /// Finished children recorded for a running Parallel node
    pub fn settled(&self, node: NodeId) -> Option<&BTreeMap<NodeId, Status>> {
        self.settled.get(&node)
    }

    pub(crate) fn begin(&mut self) -> BTreeSet<NodeId> {
        std::mem::take(&mut self.running)
    }

    pub(crate) fn set_cursor(&mut self, node: NodeId, cursor: ExecutionCursor) {
        self.cursors.insert(node, cursor);
    }

    pub(crate) fn drop_cursor(&mut self, node: NodeId) {
        self.cursors.remove(&node);
    }

    pub(crate) fn take_settled(&mut self, node: NodeId) -> BTreeMap<NodeId, Status> {
        self.settled.remove(&node).unwrap_or_default()
    }

    pub(crate) fn set_settled(&mut self, node: NodeId, children: BTreeMap<NodeId, Status>) {
        self.settled.insert(node, children);
    }

    pub(crate) fn mark_running(&mut self, node: NodeId) {
        self.running.insert(node);
    }

    pub(crate) fn finish(&mut self, status: Status) {
        let running = &self.running;
        self.cursors.retain(|node, _| running.contains(node));
        self.settled.retain(|node, _| running.contains(node));
        self.last_status = Some(status);
        self.evaluations += 1;
    }
}
