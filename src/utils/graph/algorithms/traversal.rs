//! Graph traversal algorithms.
//!
//! - [`dfs`] - Iterative depth-first search (pre-order)
//! - [`bfs`] - Breadth-first search
//! - [`postorder`] - Depth-first post-order
//! - [`reverse_postorder`] - Reverse post-order, a topological order on acyclic graphs
//! - [`reachable`] - Reachability bitmap from a start node
//!
//! [`dfs`] and [`bfs`] are lazy iterators, so callers that only need to know whether some
//! node is reached can stop early.

use std::collections::VecDeque;

use crate::utils::graph::{NodeId, Successors};

/// Depth-first pre-order iterator; see [`dfs`].
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return DfsIterator {
                graph,
                stack: Vec::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;

        DfsIterator {
            graph,
            stack: vec![start],
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        // Reverse push keeps successors in edge order
        let successors: Vec<NodeId> = self.graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !self.visited[succ.index()] {
                self.visited[succ.index()] = true;
                self.stack.push(succ);
            }
        }

        Some(node)
    }
}

/// Visits every node reachable from `start` in depth-first pre-order.
///
/// An invalid `start` yields an empty traversal.
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Breadth-first iterator; see [`bfs`].
pub struct BfsIterator<'g, G: Successors> {
    graph: &'g G,
    queue: VecDeque<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> BfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return BfsIterator {
                graph,
                queue: VecDeque::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;

        BfsIterator {
            graph,
            queue: VecDeque::from([start]),
            visited,
        }
    }
}

impl<G: Successors> Iterator for BfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;

        for succ in self.graph.successors(node) {
            if !self.visited[succ.index()] {
                self.visited[succ.index()] = true;
                self.queue.push_back(succ);
            }
        }

        Some(node)
    }
}

/// Visits every node reachable from `start` in breadth-first order.
///
/// An invalid `start` yields an empty traversal.
pub fn bfs<G: Successors>(graph: &G, start: NodeId) -> BfsIterator<'_, G> {
    BfsIterator::new(graph, start)
}

/// Returns the nodes reachable from `start` in depth-first post-order.
///
/// Every node appears after all of its successors that were first discovered through it.
/// An invalid `start` yields an empty vector.
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];
    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Returns the reverse of [`postorder`].
///
/// On an acyclic graph this places every node before its successors.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}

/// Returns a bitmap, indexed by node, of everything reachable from `starts`.
pub fn reachable<G, I>(graph: &G, starts: I) -> Vec<bool>
where
    G: Successors,
    I: IntoIterator<Item = NodeId>,
{
    let mut seen = vec![false; graph.node_count()];
    for start in starts {
        if start.index() >= seen.len() || seen[start.index()] {
            continue;
        }
        for node in bfs(graph, start) {
            seen[node.index()] = true;
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::{DirectedGraph, DirectedGraphBuilder};

    fn graph_of(count: usize, edges: &[(usize, usize)]) -> DirectedGraph<usize> {
        let mut builder = DirectedGraphBuilder::new();
        builder.add_nodes(0..count);
        for &(s, t) in edges {
            builder.add_edge(&s, &t).unwrap();
        }
        builder.build()
    }

    fn ids(raw: &[usize]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId::new).collect()
    }

    #[test]
    fn test_dfs_follows_edge_order() {
        //       0
        //      / \
        //     1   2
        //    / \   \
        //   3   4   5
        let graph = graph_of(6, &[(0, 1), (0, 2), (1, 3), (1, 4), (2, 5)]);
        let order: Vec<NodeId> = dfs(&graph, NodeId::new(0)).collect();
        assert_eq!(order, ids(&[0, 1, 3, 4, 2, 5]));
    }

    #[test]
    fn test_bfs_levels() {
        let graph = graph_of(6, &[(0, 1), (0, 2), (1, 3), (1, 4), (2, 5)]);
        let order: Vec<NodeId> = bfs(&graph, NodeId::new(0)).collect();
        assert_eq!(order, ids(&[0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_traversal_terminates_on_cycle() {
        let graph = graph_of(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(dfs(&graph, NodeId::new(1)).count(), 3);
        assert_eq!(bfs(&graph, NodeId::new(2)).count(), 3);
    }

    #[test]
    fn test_invalid_start() {
        let graph = graph_of(2, &[(0, 1)]);
        assert_eq!(dfs(&graph, NodeId::new(5)).count(), 0);
        assert_eq!(bfs(&graph, NodeId::new(5)).count(), 0);
    }

    #[test]
    fn test_postorder_diamond() {
        //   0
        //  / \
        // 1   2
        //  \ /
        //   3
        let graph = graph_of(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(postorder(&graph, NodeId::new(0)), ids(&[3, 1, 2, 0]));
        assert_eq!(reverse_postorder(&graph, NodeId::new(0)), ids(&[0, 2, 1, 3]));
        assert!(postorder(&graph, NodeId::new(9)).is_empty());
    }

    #[test]
    fn test_postorder_with_back_edge() {
        let graph = graph_of(3, &[(0, 1), (1, 2), (2, 1)]);
        assert_eq!(postorder(&graph, NodeId::new(0)), ids(&[2, 1, 0]));
    }

    #[test]
    fn test_reachable_from_several_roots() {
        let graph = graph_of(5, &[(0, 1), (3, 4)]);
        let seen = reachable(&graph, [NodeId::new(0), NodeId::new(3)]);
        assert_eq!(seen, vec![true, true, false, true, true]);
    }
}
