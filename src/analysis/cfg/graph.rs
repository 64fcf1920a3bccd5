//! Control Flow Graph implementation.

use std::{
    cmp::Ordering,
    fmt,
    sync::{Arc, OnceLock},
};

use tracing::{debug, warn};

use crate::{
    analysis::{
        cdg::ControlDependenceGraph,
        cfg::CfgEdgeKind,
        config::{AnalysisConfig, UnreachablePolicy},
        frames::StackFrames,
        pdt::PostDominatorTree,
    },
    assembly::{
        HandlerRange, Instruction, MethodIdentifier, StackType, TypeStack, VariableTable,
        METHOD_EXIT_ORDER,
    },
    utils::{
        dot::{DotWriter, NodeStyle},
        graph::{
            algorithms, DirectedGraph, DirectedGraphBuilder, GraphBase, NodeId, Predecessors,
            RootedGraph, Successors, DEFAULT_WEIGHT,
        },
    },
    Error, Result,
};

/// A directed graph over the instructions of one method, sentinels included.
///
/// The CFG, the augmented CFG, the post-dominator tree and the control-dependence graph
/// of a method are all `InstructionGraph`s over the same node numbering: method-entry is
/// node `0`, the instruction at order `k` is node `k + 1` and method-exit is the last node.
pub type InstructionGraph = DirectedGraph<Arc<Instruction>>;

/// Resolves `instruction` to its node in a graph laid out like a CFG.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the graph does not contain `instruction`.
pub(crate) fn locate(graph: &InstructionGraph, instruction: &Instruction) -> Result<NodeId> {
    let candidate = if instruction.is_method_exit() {
        graph.node_count().checked_sub(1)
    } else {
        usize::try_from(instruction.order().saturating_add(1)).ok()
    };

    candidate
        .map(NodeId::new)
        .filter(|&node| {
            graph
                .node(node)
                .is_some_and(|content| content.as_ref() == instruction)
        })
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{instruction} of {} is not part of this graph",
                instruction.method()
            ))
        })
}

/// The contents of `nodes` in the order given.
pub(crate) fn contents_of(graph: &InstructionGraph, nodes: &[NodeId]) -> Vec<Arc<Instruction>> {
    nodes
        .iter()
        .filter_map(|&node| graph.node(node))
        .cloned()
        .collect()
}

/// A control flow graph over the instructions of one method.
///
/// Nodes are the instructions of the method plus the method-entry and method-exit
/// sentinels. Edges follow [`Instruction::successors_with_handlers`]: fall-through,
/// branch targets, switch targets, subroutine calls and returns, handler entries of every
/// range enclosing an `athrow` and method-exit. Instructions without successors
/// (returns) get an edge to method-exit, and a method without instructions consists of a
/// single `entry -> exit` edge.
///
/// # Construction
///
/// ```rust
/// use bytescope::prelude::*;
///
/// let method = MethodIdentifier::new("com/example/Foo", "run", "()V")?;
/// let mut asm = MethodAssembler::new(method);
/// asm.emit(Operation::Nop)?;
/// asm.emit(Operation::Return(None))?;
/// let body = asm.finish()?;
///
/// let cfg = ControlFlowGraph::compute(body.instructions(), body.handlers())?;
/// assert_eq!(cfg.node_count(), 4);
/// assert_eq!(cfg.edge_count(), 3);
/// # Ok::<(), bytescope::Error>(())
/// ```
///
/// # Lazy Computation
///
/// The derived graphs are computed on first access and cached:
///
/// - [`acfg`](Self::acfg) - the CFG plus an `entry -> exit` edge
/// - [`pdt`](Self::pdt) - the post-dominator tree over the ACFG
/// - [`cdg`](Self::cdg) - the control-dependence graph
///
/// # Thread Safety
///
/// `ControlFlowGraph` is [`Send`] and [`Sync`]. Lazy-initialized fields use
/// [`OnceLock`] for thread-safe initialization.
pub struct ControlFlowGraph {
    /// The method the instructions belong to.
    method: Arc<MethodIdentifier>,
    /// The underlying directed graph structure.
    graph: InstructionGraph,
    /// Handler ranges the exceptional edges were derived from.
    handlers: Vec<HandlerRange>,
    /// The method-entry sentinel.
    entry: NodeId,
    /// The method-exit sentinel.
    exit: NodeId,
    /// Content of the entry node.
    entry_instruction: Arc<Instruction>,
    /// Content of the exit node.
    exit_instruction: Arc<Instruction>,
    /// Lazily computed augmented CFG.
    acfg: OnceLock<InstructionGraph>,
    /// Lazily computed post-dominator tree.
    pdt: OnceLock<PostDominatorTree>,
    /// Lazily computed control-dependence graph.
    cdg: OnceLock<ControlDependenceGraph>,
}

impl ControlFlowGraph {
    /// Builds the CFG of the method owning `instructions` with the default configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Precondition`] if `instructions` is empty (the owning method cannot be
    ///   determined; use [`ControlFlowGraph::for_method`]) or otherwise malformed
    /// - see [`ControlFlowGraph::for_method`] for the rest
    pub fn compute(instructions: &[Arc<Instruction>], handlers: &[HandlerRange]) -> Result<Self> {
        Self::compute_with(instructions, handlers, &AnalysisConfig::default())
    }

    /// Builds the CFG of the method owning `instructions`.
    ///
    /// # Errors
    ///
    /// See [`ControlFlowGraph::compute`].
    pub fn compute_with(
        instructions: &[Arc<Instruction>],
        handlers: &[HandlerRange],
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let method = instructions
            .first()
            .map(|instruction| instruction.method().clone())
            .ok_or_else(|| {
                Error::Precondition(
                    "cannot determine the method of an empty instruction stream".to_string(),
                )
            })?;
        Self::for_method(method, instructions, handlers, config)
    }

    /// Builds the CFG of `method`.
    ///
    /// The instruction at position `k` of `instructions` must have order `k`.
    ///
    /// # Errors
    ///
    /// - [`Error::Precondition`] if an instruction belongs to another method, orders are
    ///   not consecutive from `0`, or a handler range points outside the method
    /// - [`Error::OrderCollision`] if two instructions share an order
    /// - [`Error::Invariant`] if an instruction continues outside the method, or
    ///   unreachable instructions violate [`AnalysisConfig::unreachable`]
    pub fn for_method(
        method: Arc<MethodIdentifier>,
        instructions: &[Arc<Instruction>],
        handlers: &[HandlerRange],
        config: &AnalysisConfig,
    ) -> Result<Self> {
        validate_stream(&method, instructions, handlers)?;

        let count = instructions.len();
        let entry_instruction = Arc::new(Instruction::method_entry(method.clone()));
        let exit_instruction = Arc::new(Instruction::method_exit(method.clone()));

        let mut builder = DirectedGraphBuilder::with_capacity(count + 2, count * 2 + 1);
        let entry = builder.add_node(entry_instruction.clone());
        builder.add_nodes(instructions.iter().cloned());
        let exit = builder.add_node(exit_instruction.clone());

        // Node layout: entry, then order k at k + 1, then exit
        let node_of = |order: i32| -> Option<NodeId> {
            if order == METHOD_EXIT_ORDER {
                return Some(exit);
            }
            usize::try_from(order)
                .ok()
                .filter(|&index| index < count)
                .map(|index| NodeId::new(index + 1))
        };

        let sources = std::iter::once((entry, &entry_instruction)).chain(
            instructions
                .iter()
                .enumerate()
                .map(|(index, instruction)| (NodeId::new(index + 1), instruction)),
        );

        for (source, instruction) in sources {
            let successors = instruction.successors_with_handlers(handlers)?;
            if successors.is_empty() || (count == 0 && source == entry) {
                builder.add_edge_between(source, exit, DEFAULT_WEIGHT)?;
                continue;
            }

            for target_order in successors {
                let target = node_of(target_order).ok_or_else(|| {
                    invariant_error!(
                        "{} of {} continues at order {} outside the method",
                        instruction,
                        method,
                        target_order
                    )
                })?;

                let label = CfgEdgeKind::classify(instruction, target_order, handlers).label();
                match label {
                    Some(text) if config.label_branches => {
                        builder.add_labeled_edge_between(source, target, text)?;
                    }
                    _ => builder.add_edge_between(source, target, DEFAULT_WEIGHT)?,
                }
            }
        }

        let graph = builder.build();
        check_reachability(&method, &graph, entry, exit, handlers, config)?;

        debug!(
            method = %method,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built control-flow graph"
        );

        Ok(ControlFlowGraph {
            method,
            graph,
            handlers: handlers.to_vec(),
            entry,
            exit,
            entry_instruction,
            exit_instruction,
            acfg: OnceLock::new(),
            pdt: OnceLock::new(),
            cdg: OnceLock::new(),
        })
    }

    /// The method this graph belongs to.
    #[must_use]
    pub fn method(&self) -> &Arc<MethodIdentifier> {
        &self.method
    }

    /// The underlying graph.
    #[must_use]
    pub fn graph(&self) -> &InstructionGraph {
        &self.graph
    }

    /// The handler ranges the graph was built with.
    #[must_use]
    pub fn handlers(&self) -> &[HandlerRange] {
        &self.handlers
    }

    /// Returns the method-entry node.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the method-exit node.
    #[must_use]
    pub const fn exit(&self) -> NodeId {
        self.exit
    }

    /// The method-entry sentinel instruction.
    #[must_use]
    pub fn entry_instruction(&self) -> &Arc<Instruction> {
        &self.entry_instruction
    }

    /// The method-exit sentinel instruction.
    #[must_use]
    pub fn exit_instruction(&self) -> &Arc<Instruction> {
        &self.exit_instruction
    }

    /// Returns the number of nodes, sentinels included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the instruction with the given order; the sentinel orders return the
    /// sentinels.
    #[must_use]
    pub fn instruction(&self, order: i32) -> Option<&Arc<Instruction>> {
        if order == METHOD_EXIT_ORDER {
            return Some(&self.exit_instruction);
        }
        let node = NodeId::new(usize::try_from(order.checked_add(1)?).ok()?);
        if node.index() >= self.exit.index() {
            return None;
        }
        self.graph.node(node)
    }

    /// Returns the node holding `instruction`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `instruction` is not part of this graph.
    pub fn node_of(&self, instruction: &Instruction) -> Result<NodeId> {
        locate(&self.graph, instruction)
    }

    /// Returns the CFG successors of `instruction`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `instruction` is not part of this graph.
    pub fn successors_of(&self, instruction: &Instruction) -> Result<Vec<&Arc<Instruction>>> {
        let node = self.node_of(instruction)?;
        Ok(self
            .graph
            .successors(node)
            .filter_map(|s| self.graph.node(s))
            .collect())
    }

    /// Returns the CFG predecessors of `instruction`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `instruction` is not part of this graph.
    pub fn predecessors_of(&self, instruction: &Instruction) -> Result<Vec<&Arc<Instruction>>> {
        let node = self.node_of(instruction)?;
        Ok(self
            .graph
            .predecessors(node)
            .filter_map(|p| self.graph.node(p))
            .collect())
    }

    /// Returns every instruction matching `predicate`, sentinels included.
    pub fn filtered_nodes<F>(&self, predicate: F) -> Vec<&Arc<Instruction>>
    where
        F: Fn(&Arc<Instruction>) -> bool,
    {
        self.graph.filtered_nodes(predicate)
    }

    /// Returns every instruction sorted with `compare`.
    pub fn sorted_nodes<F>(&self, compare: F) -> Vec<&Arc<Instruction>>
    where
        F: FnMut(&Arc<Instruction>, &Arc<Instruction>) -> Ordering,
    {
        self.graph.sorted_nodes(compare)
    }

    /// Classifies the edge from `source` to `target`, `None` if there is no such edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either instruction is not part of this graph.
    pub fn edge_kind(&self, source: &Instruction, target: &Instruction) -> Result<Option<CfgEdgeKind>> {
        let s = self.node_of(source)?;
        let t = self.node_of(target)?;
        if !self.graph.has_edge(s, t) {
            return Ok(None);
        }
        Ok(Some(CfgEdgeKind::classify(
            source,
            target.order(),
            &self.handlers,
        )))
    }

    /// Returns every acyclic path from `from` to `to`.
    ///
    /// Paths starting at method-entry or ending at method-exit are not enumerated: every
    /// instruction lies on one of them, so the result would be the whole method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either instruction is not part of this graph.
    pub fn acyclic_paths(
        &self,
        from: &Instruction,
        to: &Instruction,
    ) -> Result<Vec<Vec<Arc<Instruction>>>> {
        let source = self.node_of(from)?;
        let target = self.node_of(to)?;
        if source == self.entry || target == self.exit {
            return Ok(Vec::new());
        }

        Ok(self
            .graph
            .acyclic_paths(source, target)
            .iter()
            .map(|path| contents_of(&self.graph, path))
            .collect())
    }

    /// Returns the augmented CFG: this graph plus an `entry -> exit` edge.
    ///
    /// # Errors
    ///
    /// Propagates builder failures, which indicate a corrupted graph.
    pub fn acfg(&self) -> Result<&InstructionGraph> {
        if let Some(acfg) = self.acfg.get() {
            return Ok(acfg);
        }

        let mut builder = self.graph.to_builder();
        if !self.graph.has_edge(self.entry, self.exit) {
            builder.add_edge_between(self.entry, self.exit, DEFAULT_WEIGHT)?;
        }
        let acfg = builder.build();
        Ok(self.acfg.get_or_init(|| acfg))
    }

    /// Returns the post-dominator tree over the augmented CFG.
    ///
    /// # Errors
    ///
    /// See [`PostDominatorTree::compute`].
    pub fn pdt(&self) -> Result<&PostDominatorTree> {
        if let Some(pdt) = self.pdt.get() {
            return Ok(pdt);
        }
        let pdt = PostDominatorTree::compute(self)?;
        Ok(self.pdt.get_or_init(|| pdt))
    }

    /// Returns the control-dependence graph.
    ///
    /// # Errors
    ///
    /// See [`ControlDependenceGraph::compute`].
    pub fn cdg(&self) -> Result<&ControlDependenceGraph> {
        if let Some(cdg) = self.cdg.get() {
            return Ok(cdg);
        }
        let cdg = ControlDependenceGraph::compute(self)?;
        Ok(self.cdg.get_or_init(|| cdg))
    }

    /// Computes the operand stack layout before and after every instruction reachable
    /// from method-entry.
    ///
    /// Reference types are refined with the declared types in `variables`.
    ///
    /// # Errors
    ///
    /// See [`StackFrames::compute`].
    pub fn stack_frames(&self, variables: Option<&VariableTable>) -> Result<StackFrames<'_>> {
        StackFrames::compute(self, variables)
    }

    /// Simulates the operand stack along the shortest path from method-entry to
    /// `instruction` and returns the value on top right before `instruction` executes.
    ///
    /// Returns `Ok(None)` if `instruction` is not reachable from method-entry and
    /// `Ok(Some(StackType::Void))` if the stack is empty.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `instruction` is not part of this graph
    /// - [`Error::StackUnderflow`] or [`Error::StackMismatch`] if the path does not
    ///   type-check
    pub fn type_of_top_at(
        &self,
        instruction: &Instruction,
        variables: Option<&VariableTable>,
    ) -> Result<Option<StackType>> {
        let target = self.node_of(instruction)?;
        let Some(path) = self.graph.shortest_path(self.entry, target) else {
            return Ok(None);
        };

        let nodes = self.instructions_by_id();
        let mut stack = TypeStack::new();
        for (source, destination) in path.edges() {
            let current = &nodes[source.index()];
            let into_handler =
                CfgEdgeKind::classify(current, nodes[destination.index()].order(), &self.handlers)
                    .is_exceptional();
            stack.apply(&current.stack_manipulation(variables, into_handler)?)?;
        }

        Ok(Some(stack.top().cloned().unwrap_or(StackType::Void)))
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// Edges carry their [`CfgEdgeKind::describe`] text.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let nodes = self.instructions_by_id();
        let mut dot = DotWriter::new("CFG", title);
        for (node, instruction) in self.graph.nodes() {
            dot.node(node.index(), &instruction.to_string(), self.style_of(node));
        }
        for edge in self.graph.edges() {
            let kind = CfgEdgeKind::classify(
                &nodes[edge.source.index()],
                nodes[edge.target.index()].order(),
                &self.handlers,
            );
            let text = kind.describe();
            dot.edge(
                edge.source.index(),
                edge.target.index(),
                (!text.is_empty()).then_some(text.as_str()),
            );
        }
        dot.finish()
    }

    pub(crate) fn style_of(&self, node: NodeId) -> NodeStyle {
        if node == self.entry {
            NodeStyle::Entry
        } else if node == self.exit {
            NodeStyle::Exit
        } else {
            NodeStyle::Plain
        }
    }

    fn instructions_by_id(&self) -> Vec<&Arc<Instruction>> {
        self.graph.contents().collect()
    }
}

impl fmt::Debug for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlFlowGraph")
            .field("method", &self.method.to_string())
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl GraphBase for ControlFlowGraph {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.graph.node_count()).map(NodeId::new)
    }
}

impl Successors for ControlFlowGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}

impl Predecessors for ControlFlowGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}

impl RootedGraph for ControlFlowGraph {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

fn validate_stream(
    method: &MethodIdentifier,
    instructions: &[Arc<Instruction>],
    handlers: &[HandlerRange],
) -> Result<()> {
    let mut seen = std::collections::HashSet::with_capacity(instructions.len());
    for (index, instruction) in instructions.iter().enumerate() {
        if instruction.method().as_ref() != method {
            return Err(Error::Precondition(format!(
                "{instruction} belongs to {} instead of {method}",
                instruction.method()
            )));
        }
        if !seen.insert(instruction.order()) {
            return Err(Error::OrderCollision(instruction.order()));
        }
        if usize::try_from(instruction.order()).ok() != Some(index) {
            return Err(Error::Precondition(format!(
                "instruction at position {index} of {method} has order {}",
                instruction.order()
            )));
        }
    }

    let count = instructions.len();
    for range in handlers {
        let inside = |order: i32| usize::try_from(order).is_ok_and(|o| o <= count);
        let handler_inside = usize::try_from(range.handler()).is_ok_and(|o| o < count);
        if !inside(range.start()) || !inside(range.end()) || !handler_inside {
            return Err(Error::Precondition(format!(
                "handler range {range} lies outside {method} with {count} instructions"
            )));
        }
    }
    Ok(())
}

fn check_reachability(
    method: &MethodIdentifier,
    graph: &InstructionGraph,
    entry: NodeId,
    exit: NodeId,
    handlers: &[HandlerRange],
    config: &AnalysisConfig,
) -> Result<()> {
    let from_entry = algorithms::reachable(graph, [entry]);
    // A method that never returns leaves exit unreachable; that is not dead code
    let unreachable: Vec<NodeId> = graph
        .node_ids()
        .filter(|&node| node != exit && !from_entry[node.index()])
        .collect();
    if unreachable.is_empty() {
        return Ok(());
    }

    let describe = |node: NodeId| {
        graph
            .node(node)
            .map_or_else(|| node.to_string(), ToString::to_string)
    };

    match config.unreachable {
        UnreachablePolicy::Reject => {
            return Err(invariant_error!(
                "{} of {} is not reachable from method-entry",
                describe(unreachable[0]),
                method
            ));
        }
        UnreachablePolicy::AllowHandlerCode => {
            let handler_entries = handlers
                .iter()
                .filter_map(|range| usize::try_from(range.handler()).ok())
                .map(|index| NodeId::new(index + 1));
            let from_handlers = algorithms::reachable(graph, handler_entries);
            if let Some(&dead) = unreachable.iter().find(|node| !from_handlers[node.index()]) {
                return Err(invariant_error!(
                    "{} of {} is reachable neither from method-entry nor from a handler",
                    describe(dead),
                    method
                ));
            }
        }
        UnreachablePolicy::Allow => {}
    }

    warn!(
        method = %method,
        unreachable = unreachable.len(),
        "control-flow graph contains unreachable instructions"
    );
    Ok(())
}
