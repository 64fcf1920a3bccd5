//! Post-dominator trees.
//!
//! Node `b` post-dominates node `a` if every path from `a` to method-exit passes through
//! `b`. The tree is computed as the dominator tree of the reversed augmented CFG rooted
//! at method-exit and stored as an [`InstructionGraph`] whose edges run from every node
//! to its immediate post-dominator.
//!
//! Nodes that cannot reach method-exit at all (the body of an endless loop) have no
//! post-dominator in the graph-theoretic sense. They are attached directly to the exit
//! root so the result is always a tree over every node of the ACFG.

use std::sync::Arc;

use tracing::debug;

use crate::{
    analysis::cfg::{contents_of, locate, ControlFlowGraph, InstructionGraph},
    assembly::Instruction,
    utils::{
        dot::{DotWriter, NodeStyle},
        graph::{algorithms::compute_dominators, DirectedGraphBuilder, NodeId, DEFAULT_WEIGHT},
    },
    Result,
};

/// The post-dominator tree of one method.
///
/// # Examples
///
/// ```rust
/// use bytescope::prelude::*;
///
/// let method = MethodIdentifier::new("com/example/Foo", "max", "(II)I")?;
/// let mut asm = MethodAssembler::new(method);
/// asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
/// asm.emit(Operation::Load { kind: ValueKind::Int, slot: 1 })?;
/// asm.branch(Condition::IntLess, "second")?;
/// asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
/// asm.goto("done")?;
/// asm.define_label("second")?;
/// asm.emit(Operation::Load { kind: ValueKind::Int, slot: 1 })?;
/// asm.define_label("done")?;
/// asm.emit(Operation::Return(Some(ValueKind::Int)))?;
/// let body = asm.finish()?;
///
/// let cfg = ControlFlowGraph::compute(body.instructions(), body.handlers())?;
/// let pdt = cfg.pdt()?;
/// let branch = cfg.instruction(2).expect("branch exists");
/// let ret = cfg.instruction(6).expect("return exists");
///
/// assert!(pdt.is_post_dominated(branch, ret)?);
/// assert_eq!(pdt.immediate_post_dominator(branch)?.map(|i| i.order()), Some(6));
/// # Ok::<(), bytescope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PostDominatorTree {
    graph: InstructionGraph,
    root: NodeId,
    parents: Vec<Option<NodeId>>,
}

impl PostDominatorTree {
    /// Computes the post-dominator tree over the augmented CFG of `cfg`.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`ControlFlowGraph::acfg`]; returns [`crate::Error::Invariant`]
    /// if the graph has no method-exit node.
    pub fn compute(cfg: &ControlFlowGraph) -> Result<Self> {
        Self::over(cfg.acfg()?, cfg.exit())
    }

    /// Computes the post-dominator tree of `acfg` rooted at `exit`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Invariant`] if `exit` is not the method-exit node of `acfg`.
    pub fn over(acfg: &InstructionGraph, exit: NodeId) -> Result<Self> {
        if !acfg.node(exit).is_some_and(|content| content.is_method_exit()) {
            return Err(invariant_error!(
                "node {} is not a method-exit node of the graph",
                exit
            ));
        }

        let reversed = acfg.reverse().build();
        let dominators = compute_dominators(&reversed, exit);

        let mut builder = DirectedGraphBuilder::with_nodes_of(acfg);
        let mut parents = vec![None; acfg.node_count()];
        for node in acfg.node_ids() {
            if node == exit {
                continue;
            }
            let parent = match dominators.immediate_dominator(node) {
                Some(parent) => parent,
                None => {
                    debug!(
                        node = %acfg.node(node).map_or_else(|| node.to_string(), ToString::to_string),
                        "node cannot reach method-exit, attaching it to the root"
                    );
                    exit
                }
            };
            builder.add_edge_between(node, parent, DEFAULT_WEIGHT)?;
            parents[node.index()] = Some(parent);
        }

        let graph = builder.build();
        debug!(
            nodes = graph.node_count(),
            depth = (0..parents.len())
                .map(|i| chain_length(&parents, NodeId::new(i)))
                .max()
                .unwrap_or(0),
            "built post-dominator tree"
        );

        Ok(PostDominatorTree {
            graph,
            root: exit,
            parents,
        })
    }

    /// The tree as a graph with edges from each node to its immediate post-dominator.
    #[must_use]
    pub fn graph(&self) -> &InstructionGraph {
        &self.graph
    }

    /// The root, method-exit.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the immediate post-dominator of `node`, `None` for the root.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(node.index()).copied().flatten()
    }

    /// Returns `true` if `b` post-dominates `a`; every node post-dominates itself.
    #[must_use]
    pub fn post_dominates(&self, b: NodeId, a: NodeId) -> bool {
        self.ancestors(a).any(|node| node == b)
    }

    /// Iterates from `node` up to the root, `node` included.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = (node.index() < self.parents.len()).then_some(node);
        std::iter::successors(start, move |&current| self.parent(current))
    }

    /// Returns `true` if `b` post-dominates `a`, i.e. the tree holds a path from `a` up
    /// to `b`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if either instruction is not part of the
    /// tree.
    pub fn is_post_dominated(&self, a: &Instruction, b: &Instruction) -> Result<bool> {
        let a = locate(&self.graph, a)?;
        let b = locate(&self.graph, b)?;
        Ok(self.post_dominates(b, a))
    }

    /// Returns the tree path from `from` up to `to`, both included, if `to` post-dominates
    /// `from`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if either instruction is not part of the
    /// tree.
    pub fn path(
        &self,
        from: &Instruction,
        to: &Instruction,
    ) -> Result<Option<Vec<Arc<Instruction>>>> {
        let from = locate(&self.graph, from)?;
        let to = locate(&self.graph, to)?;

        let mut path = Vec::new();
        for node in self.ancestors(from) {
            path.push(node);
            if node == to {
                return Ok(Some(contents_of(&self.graph, &path)));
            }
        }
        Ok(None)
    }

    /// Returns the immediate post-dominator of `instruction`, `None` for method-exit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `instruction` is not part of the tree.
    pub fn immediate_post_dominator(
        &self,
        instruction: &Instruction,
    ) -> Result<Option<&Arc<Instruction>>> {
        let node = locate(&self.graph, instruction)?;
        Ok(self.parent(node).and_then(|parent| self.graph.node(parent)))
    }

    /// Returns every post-dominator of `instruction` from itself up to method-exit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `instruction` is not part of the tree.
    pub fn post_dominators(&self, instruction: &Instruction) -> Result<Vec<&Arc<Instruction>>> {
        let node = locate(&self.graph, instruction)?;
        Ok(self
            .ancestors(node)
            .filter_map(|n| self.graph.node(n))
            .collect())
    }

    /// Returns the nodes whose immediate post-dominator is `instruction`.
    ///
    /// These are the predecessors of `instruction` in the tree graph.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `instruction` is not part of the tree.
    pub fn children(&self, instruction: &Instruction) -> Result<Vec<&Arc<Instruction>>> {
        let node = locate(&self.graph, instruction)?;
        Ok(self
            .graph
            .predecessors(node)
            .filter_map(|child| self.graph.node(child))
            .collect())
    }

    /// Returns the distance from `instruction` to the root.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `instruction` is not part of the tree.
    pub fn depth(&self, instruction: &Instruction) -> Result<usize> {
        let node = locate(&self.graph, instruction)?;
        Ok(chain_length(&self.parents, node))
    }

    /// Renders the tree in Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = DotWriter::new("PDT", title);
        for (node, instruction) in self.graph.nodes() {
            let style = if node == self.root {
                NodeStyle::Exit
            } else if instruction.is_method_entry() {
                NodeStyle::Entry
            } else {
                NodeStyle::Plain
            };
            dot.node(node.index(), &instruction.to_string(), style);
        }
        for edge in self.graph.edges() {
            dot.edge(edge.source.index(), edge.target.index(), None);
        }
        dot.finish()
    }
}

fn chain_length(parents: &[Option<NodeId>], node: NodeId) -> usize {
    std::iter::successors(parents.get(node.index()).copied().flatten(), |p| {
        parents.get(p.index()).copied().flatten()
    })
    .count()
}
