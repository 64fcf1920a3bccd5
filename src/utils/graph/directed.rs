//! Core directed graph implementation.
//!
//! This module provides [`DirectedGraph`], the immutable graph type shared by the CFG,
//! ACFG, post-dominator tree and control-dependence graph. Nodes live in an arena and
//! are addressed by [`NodeId`]; edges are stored once and referenced from per-node
//! adjacency lists, so successor and predecessor queries are both O(degree).
//!
//! Graphs are produced by [`DirectedGraphBuilder::build`] and never change afterwards.
//! To derive a modified graph, convert it back with [`DirectedGraph::to_builder`].

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fmt,
    hash::Hash,
};

use crate::{
    utils::graph::{
        algorithms::{self, Path},
        builder::{find_by_order, DirectedGraphBuilder},
        edge::{Edge, EdgeId},
        node::NodeId,
        traits::{GraphBase, Ordered, Predecessors, Successors, WeightedSuccessors},
    },
    Error, Result,
};

/// An immutable directed graph over node content `N`.
///
/// Content is unique within a graph: the graph can be queried both by [`NodeId`] and by
/// content. Edge labels are stored beside the edges and never influence edge identity.
#[derive(Debug, Clone)]
pub struct DirectedGraph<N> {
    nodes: Vec<N>,
    index: HashMap<N, NodeId>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    labels: HashMap<(NodeId, NodeId), String>,
}

impl<N: Clone + Eq + Hash + fmt::Debug> DirectedGraph<N> {
    pub(crate) fn from_parts(
        nodes: Vec<N>,
        index: HashMap<N, NodeId>,
        edges: Vec<Edge>,
        labels: HashMap<(NodeId, NodeId), String>,
    ) -> Self {
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for (i, edge) in edges.iter().enumerate() {
            outgoing[edge.source.index()].push(EdgeId::new(i));
            incoming[edge.target.index()].push(EdgeId::new(i));
        }

        DirectedGraph {
            nodes,
            index,
            edges,
            outgoing,
            incoming,
            labels,
        }
    }

    /// Returns a builder holding this graph's nodes, edges and labels.
    #[must_use]
    pub fn to_builder(&self) -> DirectedGraphBuilder<N> {
        DirectedGraphBuilder::from_graph(self)
    }

    /// Returns a builder holding this graph with every edge reversed.
    #[must_use]
    pub fn reverse(&self) -> DirectedGraphBuilder<N> {
        self.to_builder().reverse()
    }

    /// Returns the content of a node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Returns the id of the node holding `content`.
    #[must_use]
    pub fn node_id(&self, content: &N) -> Option<NodeId> {
        self.index.get(content).copied()
    }

    /// Returns the id of the node holding `content`, failing if it is not part of the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for content this graph does not contain.
    pub fn require(&self, content: &N) -> Result<NodeId> {
        self.node_id(content).ok_or_else(|| {
            Error::InvalidArgument(format!("{content:?} is not a node of this graph"))
        })
    }

    /// Returns `true` if a node holds `content`.
    #[must_use]
    pub fn contains(&self, content: &N) -> bool {
        self.index.contains_key(content)
    }

    /// Returns `true` if `node` is a valid id for this graph.
    #[must_use]
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns all node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Returns all nodes with their ids.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, content)| (NodeId::new(i), content))
    }

    /// Returns the content of all nodes in id order.
    pub fn contents(&self) -> impl Iterator<Item = &N> + '_ {
        self.nodes.iter()
    }

    /// Returns an edge by id.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&Edge> {
        self.edges.get(edge.index())
    }

    /// Returns all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter()
    }

    /// Returns the edge set; convenient for comparing two graphs over the same nodes.
    #[must_use]
    pub fn edge_set(&self) -> HashSet<Edge> {
        self.edges.iter().copied().collect()
    }

    /// Returns every `(source, target)` pair that carries a label.
    pub fn labels(&self) -> impl Iterator<Item = ((NodeId, NodeId), &str)> + '_ {
        self.labels.iter().map(|(&key, label)| (key, label.as_str()))
    }

    /// Returns the label attached to the edge from `source` to `target`.
    #[must_use]
    pub fn edge_label(&self, source: NodeId, target: NodeId) -> Option<&str> {
        self.labels.get(&(source, target)).map(String::as_str)
    }

    /// Returns `true` if at least one edge runs from `source` to `target`.
    #[must_use]
    pub fn has_edge(&self, source: NodeId, target: NodeId) -> bool {
        self.outgoing
            .get(source.index())
            .is_some_and(|out| out.iter().any(|e| self.edges[e.index()].target == target))
    }

    /// Returns the targets of all edges leaving `node`.
    ///
    /// An id outside the graph yields no successors.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge_id| self.edges[edge_id.index()].target)
    }

    /// Returns the sources of all edges entering `node`.
    ///
    /// An id outside the graph yields no predecessors.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge_id| self.edges[edge_id.index()].source)
    }

    /// Returns the edges leaving `node`.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge_id| &self.edges[edge_id.index()])
    }

    /// Returns the content of all successors of `content`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `content` is not part of the graph.
    pub fn successors_of(&self, content: &N) -> Result<Vec<&N>> {
        let id = self.require(content)?;
        Ok(self.successors(id).map(|s| &self.nodes[s.index()]).collect())
    }

    /// Returns the content of all predecessors of `content`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `content` is not part of the graph.
    pub fn predecessors_of(&self, content: &N) -> Result<Vec<&N>> {
        let id = self.require(content)?;
        Ok(self
            .predecessors(id)
            .map(|p| &self.nodes[p.index()])
            .collect())
    }

    /// Returns the number of edges leaving `node`.
    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.outgoing.get(node.index()).map_or(0, Vec::len)
    }

    /// Returns the number of edges entering `node`.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.incoming.get(node.index()).map_or(0, Vec::len)
    }

    /// Returns all nodes without incoming edges.
    pub fn entry_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(|&node| self.in_degree(node) == 0)
    }

    /// Returns all nodes without outgoing edges.
    pub fn exit_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(|&node| self.out_degree(node) == 0)
    }

    /// Returns the content of every node matching `predicate`, in id order.
    pub fn filtered_nodes<F>(&self, predicate: F) -> Vec<&N>
    where
        F: Fn(&N) -> bool,
    {
        self.nodes.iter().filter(|content| predicate(content)).collect()
    }

    /// Returns the content of every node, sorted with `compare`.
    pub fn sorted_nodes<F>(&self, mut compare: F) -> Vec<&N>
    where
        F: FnMut(&N, &N) -> Ordering,
    {
        let mut sorted: Vec<&N> = self.nodes.iter().collect();
        sorted.sort_by(|a, b| compare(a, b));
        sorted
    }

    /// Returns the node whose content has the given order, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OrderCollision`] if more than one node has that order.
    pub fn get_by_order(&self, order: i32) -> Result<Option<NodeId>>
    where
        N: Ordered,
    {
        find_by_order(self.nodes.iter(), order)
    }

    /// Returns `true` if `to` is reachable from `from` by a forward path.
    ///
    /// Every node reaches itself.
    #[must_use]
    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        algorithms::has_path(self, from, to)
    }

    /// Returns the cheapest path from `from` to `to` by edge weight, if one exists.
    #[must_use]
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Path> {
        algorithms::dijkstra(self, from, to)
    }

    /// Returns every simple path from `from` to `to`.
    #[must_use]
    pub fn acyclic_paths(&self, from: NodeId, to: NodeId) -> Vec<Vec<NodeId>> {
        algorithms::all_simple_paths(self, from, to)
    }
}

impl<N> GraphBase for DirectedGraph<N> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }
}

impl<N> Successors for DirectedGraph<N> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge_id| self.edges[edge_id.index()].target)
    }
}

impl<N> WeightedSuccessors for DirectedGraph<N> {
    fn weighted_successors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, u32)> {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge_id| {
                let edge = &self.edges[edge_id.index()];
                (edge.target, edge.weight)
            })
    }
}

impl<N> Predecessors for DirectedGraph<N> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.incoming
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge_id| self.edges[edge_id.index()].source)
    }
}
