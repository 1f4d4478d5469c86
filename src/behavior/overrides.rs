//! Prioritized substitute nodes installed on a live tree

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::behavior::node::{Node, NodeId};

#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "override#{}", _0)]
pub struct OverrideId(pub u64);

/// A substitute for one node
///
/// The substitute's children reference nodes of the same arena, so an
/// override can rewire a subtree without copying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub id: OverrideId,
    pub priority: i32,
    /// Install order; later installs win priority ties
    pub seq: u64,
    pub node: Node,
}

/// The override that currently decides a node, if any
pub fn winning(entries: &[Override]) -> Option<&Override> {
    entries.iter().max_by_key(|o| (o.priority, o.seq))
}

/// Depth-first cycle check over an adjacency function
///
/// `edges(id)` yields every child id the node can reach under any
/// installed override, not just the winning one, since priorities may
/// change which substitute is active later.
pub fn find_cycle<F, I>(node_count: usize, edges: F) -> Option<NodeId>
where
    F: Fn(NodeId) -> I,
    I: IntoIterator<Item = NodeId>,
{
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; node_count];
    for start in 0..node_count {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        // Explicit stack of (node, remaining children) to avoid recursion depth limits
        let mut stack: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        let start = NodeId(start as u32);
        marks[start.index()] = Mark::OnStack;
        stack.push((start, edges(start).into_iter().collect()));

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            let next = pending.pop();
            match next {
                Some(child) => match marks.get(child.index()).copied() {
                    Some(Mark::OnStack) => return Some(child),
                    Some(Mark::Unvisited) => {
                        marks[child.index()] = Mark::OnStack;
                        let next: Vec<NodeId> = edges(child).into_iter().collect();
                        stack.push((child, next));
                    }
                    _ => {}
                },
                None => {
                    marks[node.index()] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::node::{Action, Node};

    fn entry(id: u64, priority: i32, seq: u64) -> Override {
        Override {
            id: OverrideId(id),
            priority,
            seq,
            node: Node::action(Action::Wait { ticks: id as u32 }),
        }
    }

    #[test]
    fn test_highest_priority_wins() {
        let entries = vec![entry(1, 5, 0), entry(2, 9, 1), entry(3, 1, 2)];
        assert_eq!(winning(&entries).unwrap().id, OverrideId(2));
    }

    #[test]
    fn test_tie_goes_to_latest() {
        let entries = vec![entry(1, 5, 0), entry(2, 5, 1)];
        assert_eq!(winning(&entries).unwrap().id, OverrideId(2));
    }

    #[test]
    fn test_find_cycle() {
        let acyclic = vec![vec![NodeId(1), NodeId(2)], vec![NodeId(2)], vec![]];
        assert_eq!(find_cycle(3, |n| acyclic[n.index()].clone()), None);

        let cyclic = vec![vec![NodeId(1)], vec![NodeId(2)], vec![NodeId(0)]];
        assert!(find_cycle(3, |n| cyclic[n.index()].clone()).is_some());
    }
}
