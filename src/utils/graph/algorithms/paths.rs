//! Path queries.
//!
//! - [`has_path`] - reachability between two nodes
//! - [`dijkstra`] - cheapest path by edge weight
//! - [`all_simple_paths`] - enumeration of every acyclic path
//!
//! Enumerating simple paths is exponential in the worst case. It is only meant for the
//! small, mostly acyclic regions between two instructions of one method.

use std::{cmp::Reverse, collections::BinaryHeap};

use crate::utils::graph::{algorithms::dfs, NodeId, Successors, WeightedSuccessors};

/// A path through a graph together with its accumulated weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    nodes: Vec<NodeId>,
    cost: u64,
}

impl Path {
    /// Returns the visited nodes, both endpoints included.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Returns the sum of all edge weights along the path.
    #[must_use]
    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// Returns the number of nodes on the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` for a path without nodes, which [`dijkstra`] never produces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the `(source, target)` pairs of the traversed edges.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// Returns `true` if `to` is reachable from `from`. A node always reaches itself.
pub fn has_path<G: Successors>(graph: &G, from: NodeId, to: NodeId) -> bool {
    dfs(graph, from).any(|node| node == to)
}

/// Computes the cheapest path from `from` to `to`.
///
/// Ties between equally cheap predecessors resolve to the one settled first, which
/// keeps the result stable for a given graph.
pub fn dijkstra<G: WeightedSuccessors>(graph: &G, from: NodeId, to: NodeId) -> Option<Path> {
    let count = graph.node_count();
    if from.index() >= count || to.index() >= count {
        return None;
    }

    let mut dist: Vec<Option<u64>> = vec![None; count];
    let mut prev: Vec<Option<NodeId>> = vec![None; count];
    let mut settled = vec![false; count];
    let mut heap = BinaryHeap::new();

    dist[from.index()] = Some(0);
    heap.push(Reverse((0u64, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if settled[node.index()] {
            continue;
        }
        settled[node.index()] = true;
        if node == to {
            break;
        }

        for (succ, weight) in graph.weighted_successors(node) {
            let next = cost + u64::from(weight);
            if dist[succ.index()].map_or(true, |known| next < known) {
                dist[succ.index()] = Some(next);
                prev[succ.index()] = Some(node);
                heap.push(Reverse((next, succ)));
            }
        }
    }

    let cost = dist[to.index()]?;
    let mut nodes = vec![to];
    let mut current = to;
    while current != from {
        current = prev[current.index()]?;
        nodes.push(current);
    }
    nodes.reverse();

    Some(Path { nodes, cost })
}

/// Returns every path from `from` to `to` that visits no node twice.
///
/// Paths are produced in depth-first edge order. `from == to` yields the single
/// one-node path.
pub fn all_simple_paths<G: Successors>(graph: &G, from: NodeId, to: NodeId) -> Vec<Vec<NodeId>> {
    let count = graph.node_count();
    if from.index() >= count || to.index() >= count {
        return Vec::new();
    }
    if from == to {
        return vec![vec![from]];
    }

    let mut paths = Vec::new();
    let mut on_path = vec![false; count];
    let mut path = vec![from];
    on_path[from.index()] = true;

    // Each frame holds the successors of the node at the same depth in `path`
    let mut frames: Vec<std::vec::IntoIter<NodeId>> =
        vec![graph.successors(from).collect::<Vec<_>>().into_iter()];

    while let Some(frame) = frames.last_mut() {
        match frame.next() {
            Some(next) if next == to => {
                let mut found = path.clone();
                found.push(to);
                paths.push(found);
            }
            Some(next) if !on_path[next.index()] => {
                on_path[next.index()] = true;
                path.push(next);
                frames.push(graph.successors(next).collect::<Vec<_>>().into_iter());
            }
            Some(_) => {}
            None => {
                frames.pop();
                if let Some(done) = path.pop() {
                    on_path[done.index()] = false;
                }
            }
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::{DirectedGraph, DirectedGraphBuilder};

    fn weighted(count: usize, edges: &[(usize, usize, u32)]) -> DirectedGraph<usize> {
        let mut builder = DirectedGraphBuilder::new();
        builder.add_nodes(0..count);
        for &(s, t, w) in edges {
            builder.add_weighted_edge(&s, &t, w).unwrap();
        }
        builder.build()
    }

    fn ids(raw: &[usize]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId::new).collect()
    }

    #[test]
    fn test_dijkstra_prefers_cheaper_detour() {
        // 0 -5-> 3 directly, or 0 -1-> 1 -1-> 2 -1-> 3
        let graph = weighted(4, &[(0, 3, 5), (0, 1, 1), (1, 2, 1), (2, 3, 1)]);
        let path = dijkstra(&graph, NodeId::new(0), NodeId::new(3)).unwrap();
        assert_eq!(path.nodes(), ids(&[0, 1, 2, 3]).as_slice());
        assert_eq!(path.cost(), 3);
        assert_eq!(path.edges().count(), 3);
    }

    #[test]
    fn test_dijkstra_unreachable_and_trivial() {
        let graph = weighted(3, &[(0, 1, 1)]);
        assert!(dijkstra(&graph, NodeId::new(0), NodeId::new(2)).is_none());
        let own = dijkstra(&graph, NodeId::new(1), NodeId::new(1)).unwrap();
        assert_eq!(own.nodes(), &[NodeId::new(1)]);
        assert_eq!(own.cost(), 0);
    }

    #[test]
    fn test_simple_paths_skip_cycles() {
        // 0 -> 1 -> 3, 0 -> 2 -> 3, 1 -> 0 back edge
        let graph = weighted(4, &[(0, 1, 1), (0, 2, 1), (1, 3, 1), (2, 3, 1), (1, 0, 1)]);
        let paths = all_simple_paths(&graph, NodeId::new(0), NodeId::new(3));
        assert_eq!(paths, vec![ids(&[0, 1, 3]), ids(&[0, 2, 3])]);
    }

    #[test]
    fn test_has_path() {
        let graph = weighted(3, &[(0, 1, 1), (1, 2, 1)]);
        assert!(has_path(&graph, NodeId::new(0), NodeId::new(2)));
        assert!(!has_path(&graph, NodeId::new(2), NodeId::new(0)));
    }
}
