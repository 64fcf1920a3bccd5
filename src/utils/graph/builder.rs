//! Incremental construction of [`DirectedGraph`] values.
//!
//! Graphs are never mutated after they are built. All construction happens on a
//! [`DirectedGraphBuilder`], which enforces the construction contract:
//!
//! - nodes are keyed by their content; adding equal content twice yields the same id
//! - an edge may only be added once both endpoints are present
//! - adding an edge that already exists is an error; [`DirectedGraphBuilder::update_edge`]
//!   replaces edges between the same endpoints instead
//!
//! Once [`DirectedGraphBuilder::build`] is called the node numbering is frozen. Builders
//! seeded from a graph ([`DirectedGraphBuilder::from_graph`],
//! [`DirectedGraphBuilder::with_nodes_of`]) keep that numbering, which is how the CFG,
//! ACFG, PDT and CDG of one method end up sharing [`NodeId`]s.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    hash::Hash,
};

use crate::{
    utils::graph::{
        directed::DirectedGraph,
        edge::{Edge, DEFAULT_WEIGHT},
        node::NodeId,
        traits::Ordered,
    },
    Error, Result,
};

/// Accumulates nodes and edges before freezing them into a [`DirectedGraph`].
///
/// # Examples
///
/// ```rust
/// use bytescope::utils::graph::DirectedGraphBuilder;
///
/// let mut builder = DirectedGraphBuilder::new();
/// builder.add_node("a");
/// builder.add_node("b");
/// builder.add_edge(&"a", &"b")?;
///
/// // Adding the same edge twice is rejected
/// assert!(builder.add_edge(&"a", &"b").is_err());
///
/// let graph = builder.build();
/// assert_eq!(graph.edge_count(), 1);
/// # Ok::<(), bytescope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DirectedGraphBuilder<N> {
    nodes: Vec<N>,
    index: HashMap<N, NodeId>,
    edges: Vec<Edge>,
    edge_set: HashSet<Edge>,
    labels: HashMap<(NodeId, NodeId), String>,
}

impl<N: Clone + Eq + Hash + fmt::Debug> Default for DirectedGraphBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone + Eq + Hash + fmt::Debug> DirectedGraphBuilder<N> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraphBuilder {
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            edge_set: HashSet::new(),
            labels: HashMap::new(),
        }
    }

    /// Creates an empty builder with preallocated storage.
    #[must_use]
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        DirectedGraphBuilder {
            nodes: Vec::with_capacity(node_capacity),
            index: HashMap::with_capacity(node_capacity),
            edges: Vec::with_capacity(edge_capacity),
            edge_set: HashSet::with_capacity(edge_capacity),
            labels: HashMap::new(),
        }
    }

    /// Creates a builder holding all nodes, edges and labels of `graph`.
    ///
    /// Node ids are preserved.
    #[must_use]
    pub fn from_graph(graph: &DirectedGraph<N>) -> Self {
        let mut builder = Self::with_nodes_of(graph);
        for edge in graph.edges() {
            if builder.edge_set.insert(*edge) {
                builder.edges.push(*edge);
            }
        }
        builder.labels = graph
            .labels()
            .map(|(key, label)| (key, label.to_string()))
            .collect();
        builder
    }

    /// Creates a builder holding the nodes of `graph` but none of its edges.
    ///
    /// Node ids are preserved.
    #[must_use]
    pub fn with_nodes_of(graph: &DirectedGraph<N>) -> Self {
        let mut builder = Self::with_capacity(graph.node_count(), graph.edge_count());
        for content in graph.contents() {
            builder.add_node(content.clone());
        }
        builder
    }

    /// Adds a node and returns its id.
    ///
    /// Adding content equal to an existing node returns the existing id and leaves the
    /// builder unchanged.
    pub fn add_node(&mut self, content: N) -> NodeId {
        if let Some(&id) = self.index.get(&content) {
            return id;
        }

        let id = NodeId::new(self.nodes.len());
        self.index.insert(content.clone(), id);
        self.nodes.push(content);
        id
    }

    /// Adds every item of `contents` as a node.
    pub fn add_nodes<I>(&mut self, contents: I)
    where
        I: IntoIterator<Item = N>,
    {
        for content in contents {
            self.add_node(content);
        }
    }

    /// Returns the id of the node holding `content`, if present.
    #[must_use]
    pub fn node_id(&self, content: &N) -> Option<NodeId> {
        self.index.get(content).copied()
    }

    /// Returns the content of a node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Returns `true` if a node holding `content` exists.
    #[must_use]
    pub fn contains(&self, content: &N) -> bool {
        self.index.contains_key(content)
    }

    /// Returns the number of nodes added so far.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges added so far.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if at least one edge connects `source` to `target`.
    #[must_use]
    pub fn has_edge(&self, source: &N, target: &N) -> bool {
        match (self.node_id(source), self.node_id(target)) {
            (Some(s), Some(t)) => self.edges.iter().any(|e| e.endpoints() == (s, t)),
            _ => false,
        }
    }

    /// Adds an unweighted edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if either endpoint was never added
    /// - [`Error::DuplicateEdge`] if the edge already exists
    pub fn add_edge(&mut self, source: &N, target: &N) -> Result<()> {
        self.add_weighted_edge(source, target, DEFAULT_WEIGHT)
    }

    /// Adds a weighted edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// Same as [`DirectedGraphBuilder::add_edge`].
    pub fn add_weighted_edge(&mut self, source: &N, target: &N, weight: u32) -> Result<()> {
        let (s, t) = self.resolve(source, target)?;
        self.insert_edge(Edge::new(s, t, weight))
    }

    /// Adds an unweighted edge annotated with `label`.
    ///
    /// The label does not take part in edge identity: adding a second edge between the
    /// same endpoints with a different label still fails as a duplicate.
    ///
    /// # Errors
    ///
    /// Same as [`DirectedGraphBuilder::add_edge`].
    pub fn add_labeled_edge(
        &mut self,
        source: &N,
        target: &N,
        label: impl Into<String>,
    ) -> Result<()> {
        let (s, t) = self.resolve(source, target)?;
        self.insert_edge(Edge::unweighted(s, t))?;
        self.labels.insert((s, t), label.into());
        Ok(())
    }

    /// Adds an edge between two node ids.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if either id is out of range
    /// - [`Error::DuplicateEdge`] if the edge already exists
    pub fn add_edge_between(&mut self, source: NodeId, target: NodeId, weight: u32) -> Result<()> {
        self.check_id(source, "source")?;
        self.check_id(target, "target")?;
        self.insert_edge(Edge::new(source, target, weight))
    }

    /// Adds an unweighted, labeled edge between two node ids.
    ///
    /// # Errors
    ///
    /// Same as [`DirectedGraphBuilder::add_edge_between`].
    pub fn add_labeled_edge_between(
        &mut self,
        source: NodeId,
        target: NodeId,
        label: impl Into<String>,
    ) -> Result<()> {
        self.add_edge_between(source, target, DEFAULT_WEIGHT)?;
        self.labels.insert((source, target), label.into());
        Ok(())
    }

    /// Adds several unweighted edges, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Same as [`DirectedGraphBuilder::add_edge`]. Edges before the failing one remain added.
    pub fn add_edges<'b, I>(&mut self, edges: I) -> Result<()>
    where
        N: 'b,
        I: IntoIterator<Item = (&'b N, &'b N)>,
    {
        for (source, target) in edges {
            self.add_edge(source, target)?;
        }
        Ok(())
    }

    /// Replaces every edge between `source` and `target` by a single edge with the given
    /// weight and label.
    ///
    /// Passing `None` as label removes an existing label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either endpoint was never added.
    pub fn update_edge(
        &mut self,
        source: &N,
        target: &N,
        weight: u32,
        label: Option<&str>,
    ) -> Result<()> {
        let (s, t) = self.resolve(source, target)?;
        self.detach(s, t);
        self.insert_edge(Edge::new(s, t, weight))?;
        match label {
            Some(text) => {
                self.labels.insert((s, t), text.to_string());
            }
            None => {
                self.labels.remove(&(s, t));
            }
        }
        Ok(())
    }

    /// Replaces edges in bulk; see [`DirectedGraphBuilder::update_edge`].
    ///
    /// Existing labels of the replaced edges are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if any endpoint was never added.
    pub fn update_edges<'b, I>(&mut self, edges: I) -> Result<()>
    where
        N: 'b,
        I: IntoIterator<Item = (&'b N, &'b N, u32)>,
    {
        for (source, target, weight) in edges {
            let (s, t) = self.resolve(source, target)?;
            self.detach(s, t);
            self.insert_edge(Edge::new(s, t, weight))?;
        }
        Ok(())
    }

    /// Removes every edge between `source` and `target`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either endpoint was never added.
    pub fn remove_edge(&mut self, source: &N, target: &N) -> Result<usize> {
        let (s, t) = self.resolve(source, target)?;
        let removed = self.detach(s, t);
        self.labels.remove(&(s, t));
        Ok(removed)
    }

    /// Returns the node whose content has the given order.
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

    /// Returns a builder with every edge reversed.
    ///
    /// Weights and labels move with their edges; node ids are unchanged.
    #[must_use]
    pub fn reverse(&self) -> Self {
        let edges: Vec<Edge> = self.edges.iter().map(|e| e.reversed()).collect();
        DirectedGraphBuilder {
            nodes: self.nodes.clone(),
            index: self.index.clone(),
            edge_set: edges.iter().copied().collect(),
            edges,
            labels: self
                .labels
                .iter()
                .map(|(&(s, t), label)| ((t, s), label.clone()))
                .collect(),
        }
    }

    /// Freezes the builder into an immutable graph.
    #[must_use]
    pub fn build(self) -> DirectedGraph<N> {
        DirectedGraph::from_parts(self.nodes, self.index, self.edges, self.labels)
    }

    fn resolve(&self, source: &N, target: &N) -> Result<(NodeId, NodeId)> {
        let s = self.node_id(source).ok_or_else(|| {
            Error::InvalidArgument(format!("edge source {source:?} is not a node of the graph"))
        })?;
        let t = self.node_id(target).ok_or_else(|| {
            Error::InvalidArgument(format!("edge target {target:?} is not a node of the graph"))
        })?;
        Ok((s, t))
    }

    fn check_id(&self, node: NodeId, role: &str) -> Result<()> {
        if node.index() >= self.nodes.len() {
            return Err(Error::InvalidArgument(format!(
                "{role} node {node} does not exist in graph with {} nodes",
                self.nodes.len()
            )));
        }
        Ok(())
    }

    fn insert_edge(&mut self, edge: Edge) -> Result<()> {
        if !self.edge_set.insert(edge) {
            return Err(Error::DuplicateEdge {
                from: format!("{:?}", self.nodes[edge.source.index()]),
                to: format!("{:?}", self.nodes[edge.target.index()]),
            });
        }
        self.edges.push(edge);
        Ok(())
    }

    fn detach(&mut self, source: NodeId, target: NodeId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| e.endpoints() != (source, target));
        self.edge_set.retain(|e| e.endpoints() != (source, target));
        before - self.edges.len()
    }
}

/// Shared order lookup for builders and frozen graphs.
pub(crate) fn find_by_order<'a, N, I>(contents: I, order: i32) -> Result<Option<NodeId>>
where
    N: Ordered + 'a,
    I: Iterator<Item = &'a N>,
{
    let mut found = None;
    for (index, content) in contents.enumerate() {
        if content.order() == order {
            if found.is_some() {
                return Err(Error::OrderCollision(order));
            }
            found = Some(NodeId::new(index));
        }
    }
    Ok(found)
}
