//! Fairness queue for behavior scheduling

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::types::{AgentId, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    last_processed: Tick,
    id: AgentId,
}

impl Ord for Entry {
    // BinaryHeap is a max-heap: the "greatest" entry is the one least recently
    // processed, with the lower id winning ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .last_processed
            .cmp(&self.last_processed)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders agents by ascending last-processed tick, then agent id
///
/// Read "ascending ticks since last processed" as the order of the
/// last-processed tick itself: the agent that has waited longest is
/// served first, so a deferred agent cannot starve behind fresher ones.
/// Deferred agents also skip the behavior budget on their next tick.
#[derive(Debug, Default)]
pub struct FairnessQueue {
    heap: BinaryHeap<Entry>,
}

impl FairnessQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: AgentId, last_processed: Tick) {
        self.heap.push(Entry { last_processed, id });
    }

    pub fn pop(&mut self) -> Option<AgentId> {
        self.heap.pop().map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Empty the queue in service order
    pub fn drain_ordered(&mut self) -> Vec<AgentId> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(id) = self.pop() {
            out.push(id);
        }
        out
    }
}
