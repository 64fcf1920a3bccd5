//! Trait definitions for graph abstractions.
//!
//! Graph algorithms in [`crate::utils::graph::algorithms`] are written against these
//! traits rather than against [`crate::utils::graph::DirectedGraph`] directly:
//!
//! - [`GraphBase`] - Core properties: node count and node iteration
//! - [`Successors`] - Forward edge traversal (outgoing edges)
//! - [`WeightedSuccessors`] - Forward traversal with edge weights (shortest paths)
//! - [`Predecessors`] - Backward edge traversal (incoming edges)
//! - [`RootedGraph`] - Graphs with a designated entry node (for dominator computation)
//!
//! [`Ordered`] is the one requirement placed on node *content*: it exposes the position
//! of an instruction in its method so graphs can be searched by order.

use std::{rc::Rc, sync::Arc};

use crate::utils::graph::NodeId;

/// Core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node ids, in ascending index order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward adjacency.
pub trait Successors: GraphBase {
    /// Returns the targets of all edges leaving `node`.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Forward adjacency including edge weights.
pub trait WeightedSuccessors: GraphBase {
    /// Returns `(target, weight)` for all edges leaving `node`.
    fn weighted_successors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, u32)>;
}

/// Backward adjacency.
pub trait Predecessors: GraphBase {
    /// Returns the sources of all edges entering `node`.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a designated entry node.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry node.
    fn entry(&self) -> NodeId;
}

/// Node content that occupies a position in a linear instruction stream.
///
/// Orders are unique within one method; the synthetic method-entry and method-exit
/// sentinels use reserved negative orders.
pub trait Ordered {
    /// Returns the position of this content in its stream.
    fn order(&self) -> i32;
}

impl<T: Ordered + ?Sized> Ordered for &T {
    fn order(&self) -> i32 {
        (**self).order()
    }
}

impl<T: Ordered + ?Sized> Ordered for Arc<T> {
    fn order(&self) -> i32 {
        (**self).order()
    }
}

impl<T: Ordered + ?Sized> Ordered for Rc<T> {
    fn order(&self) -> i32 {
        (**self).order()
    }
}

impl Ordered for i32 {
    fn order(&self) -> i32 {
        *self
    }
}
