//! Dense node identifiers.
//!
//! Every graph built from one method's instruction stream numbers its nodes in the
//! order they were added to the builder. Because the ACFG, the post-dominator tree and
//! the control-dependence graph are all seeded from the CFG's node list, a [`NodeId`]
//! obtained from one of them addresses the same instruction in all of them.

use std::fmt;

/// Index of a node inside a [`crate::utils::graph::DirectedGraph`].
///
/// `NodeId` is a plain arena index. It carries no reference to the graph, so using an id
/// from an unrelated graph is not detected by the type system; graph accessors return
/// `None` or [`crate::Error::InvalidArgument`] for out-of-range ids.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates an id from a raw arena index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw arena index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}
