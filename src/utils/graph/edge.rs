//! Edge identifiers and edge values for directed graphs.
//!
//! An [`Edge`] is a plain `(source, target, weight)` triple. Labels are deliberately not
//! part of it: graphs keep branch labels in a side table keyed by the endpoint pair, so
//! two edges that differ only in their label compare and hash as the same edge.

use std::fmt;

use crate::utils::graph::NodeId;

/// Weight assigned to edges added without an explicit weight.
pub const DEFAULT_WEIGHT: u32 = 1;

/// Index of an edge inside a frozen [`crate::utils::graph::DirectedGraph`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    /// Creates an id from a raw edge index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        EdgeId(index)
    }

    /// Returns the raw edge index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A directed, weighted edge between two nodes of the same graph.
///
/// Equality and hashing cover exactly the source, the target and the weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    /// Node the edge leaves
    pub source: NodeId,
    /// Node the edge enters
    pub target: NodeId,
    /// Edge weight, [`DEFAULT_WEIGHT`] for unweighted edges
    pub weight: u32,
}

impl Edge {
    /// Creates an edge with an explicit weight.
    #[must_use]
    pub const fn new(source: NodeId, target: NodeId, weight: u32) -> Self {
        Edge {
            source,
            target,
            weight,
        }
    }

    /// Creates an edge with [`DEFAULT_WEIGHT`].
    #[must_use]
    pub const fn unweighted(source: NodeId, target: NodeId) -> Self {
        Edge::new(source, target, DEFAULT_WEIGHT)
    }

    /// Returns the same edge with source and target swapped.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Edge::new(self.target, self.source, self.weight)
    }

    /// Returns `true` if the edge starts and ends at the same node.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Returns the `(source, target)` pair, the key of the label side table.
    #[must_use]
    pub const fn endpoints(&self) -> (NodeId, NodeId) {
        (self.source, self.target)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weight == DEFAULT_WEIGHT {
            write!(f, "{} -> {}", self.source, self.target)
        } else {
            write!(f, "{} -[{}]-> {}", self.source, self.weight, self.target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_edge_equality_includes_weight() {
        let a = NodeId::new(0);
        let b = NodeId::new(1);

        assert_eq!(Edge::unweighted(a, b), Edge::new(a, b, DEFAULT_WEIGHT));
        assert_ne!(Edge::unweighted(a, b), Edge::new(a, b, 5));
        assert_ne!(Edge::unweighted(a, b), Edge::unweighted(b, a));
    }

    #[test]
    fn test_edge_hash_dedup() {
        let a = NodeId::new(0);
        let b = NodeId::new(1);
        let set: HashSet<Edge> = [
            Edge::unweighted(a, b),
            Edge::unweighted(a, b),
            Edge::new(a, b, 3),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_edge_reversed_keeps_weight() {
        let edge = Edge::new(NodeId::new(2), NodeId::new(9), 4);
        let reversed = edge.reversed();
        assert_eq!(reversed.source, NodeId::new(9));
        assert_eq!(reversed.target, NodeId::new(2));
        assert_eq!(reversed.weight, 4);
        assert_eq!(reversed.reversed(), edge);
    }

    #[test]
    fn test_edge_display() {
        assert_eq!(
            Edge::unweighted(NodeId::new(0), NodeId::new(1)).to_string(),
            "n0 -> n1"
        );
        assert_eq!(
            Edge::new(NodeId::new(0), NodeId::new(1), 7).to_string(),
            "n0 -[7]-> n1"
        );
        assert_eq!(EdgeId::new(3).to_string(), "e3");
        assert!(Edge::unweighted(NodeId::new(2), NodeId::new(2)).is_self_loop());
    }
}
