//! Dominator tree computation using the Lengauer-Tarjan algorithm.
//!
//! A node `d` **dominates** a node `n` if every path from the root to `n` passes
//! through `d`. The **immediate dominator** of `n` is the unique strict dominator of
//! `n` that does not strictly dominate any other dominator of `n`. Making every
//! immediate dominator the parent of its node yields the dominator tree.
//!
//! Post-dominance is dominance on the reversed graph: running [`compute_dominators`] on
//! a reversed CFG rooted at method-exit produces immediate post-dominators.
//!
//! # Algorithm
//!
//! Lengauer-Tarjan with path compression, O(E α(E, V)). Nodes that are not reachable
//! from the root have no immediate dominator; [`DominatorTree::is_reachable`] reports
//! them and every other query treats them as isolated.

use crate::utils::graph::{NodeId, Predecessors, Successors};

/// Result of dominator tree computation.
///
/// # Examples
///
/// ```rust
/// use bytescope::utils::graph::{algorithms::compute_dominators, DirectedGraphBuilder};
///
/// // Diamond: entry -> a, entry -> b, a -> exit, b -> exit
/// let mut builder = DirectedGraphBuilder::new();
/// builder.add_nodes(["entry", "a", "b", "exit"]);
/// builder.add_edges([(&"entry", &"a"), (&"entry", &"b"), (&"a", &"exit"), (&"b", &"exit")])?;
/// let graph = builder.build();
///
/// let entry = graph.node_id(&"entry").unwrap();
/// let exit = graph.node_id(&"exit").unwrap();
/// let tree = compute_dominators(&graph, entry);
///
/// assert_eq!(tree.immediate_dominator(exit), Some(entry));
/// assert!(tree.dominates(entry, exit));
/// # Ok::<(), bytescope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The root of the tree
    root: NodeId,
    /// Immediate dominator per node; `None` for the root and for unreachable nodes
    idom: Vec<Option<NodeId>>,
    /// Whether the node was reached from the root
    reachable: Vec<bool>,
}

impl DominatorTree {
    /// Returns the root node of the tree.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the immediate dominator of a node.
    ///
    /// `None` for the root, for unreachable nodes and for ids outside the graph.
    #[inline]
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if `node` was reached from the root.
    #[inline]
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.reachable.get(node.index()).copied().unwrap_or(false)
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A node dominates itself. Unreachable nodes dominate only themselves.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dominators(b).any(|d| d == a)
    }

    /// Checks if node `a` strictly dominates node `b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns an iterator over all dominators of a node, from the node itself up to the
    /// root.
    pub fn dominators(&self, node: NodeId) -> DominatorIterator<'_> {
        DominatorIterator {
            tree: self,
            current: Some(node),
        }
    }

    /// Returns the depth of a node; the root and unreachable nodes have depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.dominators(node).count().saturating_sub(1)
    }

    /// Returns all nodes whose immediate dominator is `node`, in id order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.idom
            .iter()
            .enumerate()
            .filter(|(_, idom)| **idom == Some(node))
            .map(|(i, _)| NodeId::new(i))
            .collect()
    }

    /// Returns the number of nodes covered by the tree.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }
}

/// Iterator over dominators of a node, from the node up to the root.
pub struct DominatorIterator<'a> {
    tree: &'a DominatorTree,
    current: Option<NodeId>,
}

impl Iterator for DominatorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        if current.index() >= self.tree.node_count() {
            self.current = None;
            return None;
        }
        self.current = self.tree.immediate_dominator(current);
        Some(current)
    }
}

/// Computes the dominator tree of `graph` rooted at `root`.
///
/// Only nodes reachable from `root` receive an immediate dominator.
pub fn compute_dominators<G>(graph: &G, root: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    if root.index() >= node_count {
        return DominatorTree {
            root,
            idom: vec![None; node_count],
            reachable: vec![false; node_count],
        };
    }

    let mut lt = LengauerTarjan::new(node_count, root);
    lt.compute(graph);

    let reachable: Vec<bool> = lt.dfnum.iter().map(|&n| n != 0).collect();
    let idom = (0..node_count)
        .map(|i| {
            if i == root.index() || !reachable[i] {
                None
            } else {
                Some(lt.idom[i])
            }
        })
        .collect();

    DominatorTree {
        root,
        idom,
        reachable,
    }
}

const UNDEFINED: NodeId = NodeId::new(usize::MAX);

/// Internal state for the Lengauer-Tarjan algorithm.
struct LengauerTarjan {
    root: NodeId,
    /// DFS number for each node (0 = not visited)
    dfnum: Vec<usize>,
    /// Node with each DFS number (inverse of dfnum)
    vertex: Vec<NodeId>,
    /// Parent in DFS tree
    parent: Vec<NodeId>,
    /// Semidominator
    semi: Vec<NodeId>,
    /// Immediate dominator
    idom: Vec<NodeId>,
    /// Ancestor in the link-eval forest
    ancestor: Vec<NodeId>,
    /// Node with the smallest semidominator on the path to the forest root
    best: Vec<NodeId>,
    /// Nodes whose semidominator is this node
    bucket: Vec<Vec<NodeId>>,
    dfs_counter: usize,
}

impl LengauerTarjan {
    fn new(n: usize, root: NodeId) -> Self {
        Self {
            root,
            dfnum: vec![0; n],
            vertex: vec![UNDEFINED; n],
            parent: vec![UNDEFINED; n],
            semi: (0..n).map(NodeId::new).collect(),
            idom: vec![UNDEFINED; n],
            ancestor: vec![UNDEFINED; n],
            best: (0..n).map(NodeId::new).collect(),
            bucket: vec![Vec::new(); n],
            dfs_counter: 0,
        }
    }

    fn compute<G: Successors + Predecessors>(&mut self, graph: &G) {
        self.dfs(graph);

        for i in (1..self.dfs_counter).rev() {
            let w = self.vertex[i];
            let parent_w = self.parent[w.index()];

            for v in graph.predecessors(w) {
                if self.dfnum[v.index()] == 0 {
                    continue;
                }
                let u = self.eval(v);
                if self.dfnum[self.semi[u.index()].index()]
                    < self.dfnum[self.semi[w.index()].index()]
                {
                    self.semi[w.index()] = self.semi[u.index()];
                }
            }

            let semi_w = self.semi[w.index()];
            self.bucket[semi_w.index()].push(w);
            self.ancestor[w.index()] = parent_w;

            let bucket = std::mem::take(&mut self.bucket[parent_w.index()]);
            for v in bucket {
                let u = self.eval(v);
                self.idom[v.index()] = if self.semi[u.index()] == self.semi[v.index()] {
                    parent_w
                } else {
                    u
                };
            }
        }

        for i in 1..self.dfs_counter {
            let w = self.vertex[i];
            if self.idom[w.index()] != self.semi[w.index()] {
                self.idom[w.index()] = self.idom[self.idom[w.index()].index()];
            }
        }

        self.idom[self.root.index()] = self.root;
    }

    /// Iterative DFS numbering; a node's parent is the node whose push was popped.
    fn dfs<G: Successors>(&mut self, graph: &G) {
        let mut stack = vec![(self.root, UNDEFINED)];

        while let Some((node, parent)) = stack.pop() {
            if self.dfnum[node.index()] != 0 {
                continue;
            }

            self.dfs_counter += 1;
            self.dfnum[node.index()] = self.dfs_counter;
            self.vertex[self.dfs_counter - 1] = node;
            self.parent[node.index()] = parent;

            let successors: Vec<NodeId> = graph.successors(node).collect();
            for &succ in successors.iter().rev() {
                if self.dfnum[succ.index()] == 0 {
                    stack.push((succ, node));
                }
            }
        }
    }

    fn eval(&mut self, v: NodeId) -> NodeId {
        if self.ancestor[v.index()] == UNDEFINED {
            return v;
        }
        self.compress(v);
        self.best[v.index()]
    }

    /// Path compression, iterative to stay safe on long straight-line methods.
    fn compress(&mut self, v: NodeId) {
        let mut chain = Vec::new();
        let mut current = v;
        while self.ancestor[self.ancestor[current.index()].index()] != UNDEFINED {
            chain.push(current);
            current = self.ancestor[current.index()];
        }

        while let Some(node) = chain.pop() {
            let ancestor = self.ancestor[node.index()];
            let best_ancestor = self.best[ancestor.index()];
            if self.dfnum[self.semi[best_ancestor.index()].index()]
                < self.dfnum[self.semi[self.best[node.index()].index()].index()]
            {
                self.best[node.index()] = best_ancestor;
            }
            self.ancestor[node.index()] = self.ancestor[ancestor.index()];
        }
    }
}
