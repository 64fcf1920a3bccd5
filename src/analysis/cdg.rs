//! Control-dependence graphs.
//!
//! Node `b` is control-dependent on node `a` if one outgoing edge of `a` leads to `b`
//! always being executed while another may bypass it. The graph is derived from the
//! augmented CFG and its post-dominator tree with the construction of Ferrante,
//! Ottenstein and Warren:
//!
//! 1. every ACFG edge `a -> b` where `b` does not post-dominate `a` is a candidate, and
//!    so is every self-edge `a -> a`
//! 2. the least common ancestor `l` of `a` and `b` in the post-dominator tree bounds the
//!    nodes the decision at `a` controls
//! 3. walking from `b` up the tree to `l` (exclusive) marks each node as dependent on
//!    `a`; if `l` is `a` itself, `a` depends on its own outcome (loop headers)
//!
//! Nodes left without a genuine dependency run whenever the method runs and are attached
//! to method-entry, so every node is reachable from the root of the graph.

use std::{
    collections::{btree_map::Entry, BTreeMap, HashSet},
    sync::Arc,
};

use tracing::{debug, trace};

use crate::{
    analysis::{
        cfg::{locate, ControlFlowGraph, InstructionGraph},
        pdt::PostDominatorTree,
    },
    assembly::Instruction,
    utils::{
        dot::{DotWriter, NodeStyle},
        graph::{DirectedGraphBuilder, NodeId, DEFAULT_WEIGHT},
    },
    Result,
};

/// The control-dependence graph of one method, rooted at method-entry.
///
/// An edge `a -> b` reads "`b` is control-dependent on `a`". Edges created from a
/// conditional branch carry the `"T"`/`"F"` label of the CFG edge the dependency was
/// derived from.
#[derive(Debug, Clone)]
pub struct ControlDependenceGraph {
    graph: InstructionGraph,
    entry: NodeId,
}

impl ControlDependenceGraph {
    /// Computes the control-dependence graph of `cfg`, building its augmented CFG and
    /// post-dominator tree on the way if they are not cached yet.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Invariant`] if the post-dominator tree is malformed.
    pub fn compute(cfg: &ControlFlowGraph) -> Result<Self> {
        Self::over(cfg.acfg()?, cfg.pdt()?, cfg.entry())
    }

    /// Computes the control-dependence graph of `acfg` from its post-dominator tree.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Invariant`] if two nodes have no common ancestor in `pdt`,
    /// or a tree walk leaves the tree.
    pub fn over(acfg: &InstructionGraph, pdt: &PostDominatorTree, entry: NodeId) -> Result<Self> {
        let mut marks: BTreeMap<(NodeId, NodeId), Option<String>> = BTreeMap::new();
        let mut candidates = 0usize;

        for edge in acfg.edges() {
            let (a, b) = (edge.source, edge.target);
            // a self-edge is a candidate even though every node post-dominates itself
            if a != b && pdt.post_dominates(b, a) {
                continue;
            }
            candidates += 1;

            let lca = least_common_ancestor(pdt, a, b)?;
            trace!(source = %a, target = %b, lca = %lca, "candidate edge");

            let label = acfg.edge_label(a, b);
            let mut current = b;
            while current != lca {
                mark(&mut marks, a, current, label);
                current = pdt.parent(current).ok_or_else(|| {
                    invariant_error!(
                        "walk from {} left the post-dominator tree before reaching {}",
                        b,
                        lca
                    )
                })?;
            }
            if lca == a {
                mark(&mut marks, a, a, label);
            }
        }

        let mut builder = DirectedGraphBuilder::with_nodes_of(acfg);
        for (&(source, target), label) in &marks {
            match label {
                Some(label) => builder.add_labeled_edge_between(source, target, label.as_str())?,
                None => builder.add_edge_between(source, target, DEFAULT_WEIGHT)?,
            }
        }

        let mut attached = 0usize;
        for node in acfg.node_ids().filter(|&n| n != entry) {
            let mut dependencies = marks
                .keys()
                .filter(|&&(_, target)| target == node)
                .map(|&(source, _)| source);
            let unconditional = match (dependencies.next(), dependencies.next()) {
                (None, _) => true,
                (Some(only), None) => only == node,
                _ => false,
            };
            if unconditional && !marks.contains_key(&(entry, node)) {
                builder.add_edge_between(entry, node, DEFAULT_WEIGHT)?;
                attached += 1;
            }
        }

        let graph = builder.build();
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            candidates,
            attached,
            "built control-dependence graph"
        );

        Ok(ControlDependenceGraph { graph, entry })
    }

    /// The graph itself.
    #[must_use]
    pub fn graph(&self) -> &InstructionGraph {
        &self.graph
    }

    /// The root, method-entry.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns every instruction `instruction` is transitively control-dependent on, in
    /// node order.
    ///
    /// With `strict` set `instruction` itself is never part of the result; otherwise it
    /// is included exactly when it depends on itself.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `instruction` is not part of the graph.
    pub fn control_dependencies(
        &self,
        instruction: &Instruction,
        strict: bool,
    ) -> Result<Vec<&Arc<Instruction>>> {
        let start = locate(&self.graph, instruction)?;

        let mut visited = HashSet::new();
        let mut worklist: Vec<NodeId> = self.graph.predecessors(start).collect();
        while let Some(node) = worklist.pop() {
            if visited.insert(node) {
                worklist.extend(self.graph.predecessors(node));
            }
        }
        if strict {
            visited.remove(&start);
        }

        Ok(self.contents_sorted(visited))
    }

    /// Returns the direct control dependencies of `instruction`, in node order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `instruction` is not part of the graph.
    pub fn immediate_control_dependencies(
        &self,
        instruction: &Instruction,
        strict: bool,
    ) -> Result<Vec<&Arc<Instruction>>> {
        let node = locate(&self.graph, instruction)?;
        let direct = self
            .graph
            .predecessors(node)
            .filter(|&p| !(strict && p == node))
            .collect::<HashSet<_>>();
        Ok(self.contents_sorted(direct))
    }

    /// Returns the instructions directly control-dependent on `instruction`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `instruction` is not part of the graph.
    pub fn dependents(&self, instruction: &Instruction) -> Result<Vec<&Arc<Instruction>>> {
        let node = locate(&self.graph, instruction)?;
        let direct = self.graph.successors(node).collect::<HashSet<_>>();
        Ok(self.contents_sorted(direct))
    }

    /// Returns `true` if `b` is control-dependent on `a`, i.e. the graph holds a path
    /// from `a` to `b`.
    ///
    /// An instruction counts as dependent on itself only if it lies on a cycle of the
    /// graph.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if either instruction is not part of the
    /// graph.
    pub fn is_control_dependent(&self, a: &Instruction, b: &Instruction) -> Result<bool> {
        let from = locate(&self.graph, a)?;
        let to = locate(&self.graph, b)?;
        if from == to {
            return Ok(self
                .graph
                .predecessors(to)
                .any(|p| p == to || self.graph.has_path(to, p)));
        }
        Ok(self.graph.has_path(from, to))
    }

    /// Renders the graph in Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = DotWriter::new("CDG", title);
        for (node, instruction) in self.graph.nodes() {
            let style = if node == self.entry {
                NodeStyle::Entry
            } else if instruction.is_method_exit() {
                NodeStyle::Exit
            } else {
                NodeStyle::Plain
            };
            dot.node(node.index(), &instruction.to_string(), style);
        }
        for edge in self.graph.edges() {
            dot.edge(
                edge.source.index(),
                edge.target.index(),
                self.graph.edge_label(edge.source, edge.target),
            );
        }
        dot.finish()
    }

    fn contents_sorted(&self, nodes: HashSet<NodeId>) -> Vec<&Arc<Instruction>> {
        let mut nodes: Vec<NodeId> = nodes.into_iter().collect();
        nodes.sort_unstable();
        nodes.into_iter().filter_map(|n| self.graph.node(n)).collect()
    }
}

/// Records that `target` depends on `source`; the first label seen for a pair wins.
fn mark(
    marks: &mut BTreeMap<(NodeId, NodeId), Option<String>>,
    source: NodeId,
    target: NodeId,
    label: Option<&str>,
) {
    if let Entry::Vacant(slot) = marks.entry((source, target)) {
        slot.insert(label.map(str::to_string));
    }
}

/// Walks the ancestor chains of `a` and `b` in lock-step until one reaches a node the
/// other has already visited.
fn least_common_ancestor(pdt: &PostDominatorTree, a: NodeId, b: NodeId) -> Result<NodeId> {
    let mut seen_a = HashSet::new();
    let mut seen_b = HashSet::new();
    let (mut x, mut y) = (a, b);

    loop {
        seen_a.insert(x);
        seen_b.insert(y);
        if seen_a.contains(&y) {
            return Ok(y);
        }
        if seen_b.contains(&x) {
            return Ok(x);
        }

        let next_x = pdt.parent(x);
        let next_y = pdt.parent(y);
        if next_x.is_none() && next_y.is_none() {
            return Err(invariant_error!(
                "nodes {} and {} have no common ancestor in the post-dominator tree",
                a,
                b
            ));
        }
        x = next_x.unwrap_or(x);
        y = next_y.unwrap_or(y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::AnalysisConfig,
        assembly::{Condition, Constant, MethodAssembler, MethodIdentifier, Operation, ValueKind},
        Error,
    };

    fn method(name: &str) -> MethodIdentifier {
        MethodIdentifier::new("com/example/Foo", name, "(I)I").unwrap()
    }

    fn orders(instructions: &[&Arc<Instruction>]) -> Vec<i32> {
        instructions.iter().map(|i| i.order()).collect()
    }

    /// `return x < 0 ? -1 : 1;`
    fn diamond() -> ControlFlowGraph {
        let mut asm = MethodAssembler::new(method("sign"));
        asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
        asm.branch(Condition::Less, "negative").unwrap();
        asm.emit(Operation::Constant(Constant::Int(1))).unwrap();
        asm.emit(Operation::Return(Some(ValueKind::Int))).unwrap();
        asm.define_label("negative").unwrap();
        asm.emit(Operation::Constant(Constant::Int(-1))).unwrap();
        asm.emit(Operation::Return(Some(ValueKind::Int))).unwrap();
        asm.finish().unwrap().analyze(&AnalysisConfig::default()).unwrap()
    }

    /// `while (x != 0) x--; return x;`
    fn counting_loop() -> ControlFlowGraph {
        let mut asm = MethodAssembler::new(method("countdown"));
        asm.define_label("head").unwrap();
        asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
        asm.branch(Condition::Equal, "done").unwrap();
        asm.emit(Operation::Increment { slot: 0, delta: -1 }).unwrap();
        asm.goto("head").unwrap();
        asm.define_label("done").unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        asm.finish().unwrap().analyze(&AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_cdg_diamond() {
        let cfg = diamond();
        let cdg = cfg.cdg().unwrap();
        let at = |order| cfg.instruction(order).unwrap();

        for order in [2, 3, 4, 5] {
            let deps = cdg.immediate_control_dependencies(at(order), true).unwrap();
            assert_eq!(orders(&deps), vec![1], "order {order}");
        }
        for order in [0, 1] {
            let deps = cdg.immediate_control_dependencies(at(order), true).unwrap();
            assert!(deps[0].is_method_entry(), "order {order}");
        }

        let branch = cdg.graph().node_id(at(1)).unwrap();
        assert_eq!(
            cdg.graph().edge_label(branch, cdg.graph().node_id(at(2)).unwrap()),
            Some("F")
        );
        assert_eq!(
            cdg.graph().edge_label(branch, cdg.graph().node_id(at(5)).unwrap()),
            Some("T")
        );
        assert!(cdg.is_control_dependent(at(1), at(5)).unwrap());
        assert!(!cdg.is_control_dependent(at(2), at(4)).unwrap());
    }

    #[test]
    fn test_cdg_loop_header_self_dependence() {
        let cfg = counting_loop();
        let cdg = cfg.cdg().unwrap();
        let at = |order| cfg.instruction(order).unwrap();

        let header = at(1);
        assert!(cdg.is_control_dependent(header, header).unwrap());
        assert!(!cdg.is_control_dependent(at(4), at(4)).unwrap());

        let loose = cdg.immediate_control_dependencies(header, false).unwrap();
        assert_eq!(loose.len(), 2);
        assert!(loose.iter().any(|i| i.is_method_entry()));
        let strict = cdg.immediate_control_dependencies(header, true).unwrap();
        assert_eq!(strict.len(), 1);

        assert_eq!(orders(&cdg.control_dependencies(header, false).unwrap()), vec![-1, 1]);
        assert_eq!(orders(&cdg.control_dependencies(header, true).unwrap()), vec![-1]);

        let body = cdg.dependents(header).unwrap();
        assert_eq!(orders(&body), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_cdg_single_instruction_loop() {
        // 0: iload_0; 1: iconst_0; 2: ifeq 2; 3: return
        let mut asm = MethodAssembler::new(method("spin"));
        asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
        asm.emit(Operation::Constant(Constant::Int(0))).unwrap();
        asm.define_label("spin").unwrap();
        asm.branch(Condition::Equal, "spin").unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        let cfg = asm.finish().unwrap().analyze(&AnalysisConfig::default()).unwrap();
        let cdg = cfg.cdg().unwrap();
        let header = cfg.instruction(2).unwrap();

        assert!(cdg.is_control_dependent(header, header).unwrap());
        assert_eq!(
            orders(&cdg.immediate_control_dependencies(header, false).unwrap()),
            vec![-1, 2]
        );
        let node = cdg.graph().node_id(header).unwrap();
        assert_eq!(cdg.graph().edge_label(node, node), Some("T"));
        assert!(!cdg.is_control_dependent(header, cfg.instruction(3).unwrap()).unwrap());
    }

    #[test]
    fn test_cdg_every_node_hangs_off_entry() {
        for cfg in [diamond(), counting_loop()] {
            let cdg = cfg.cdg().unwrap();
            let graph = cdg.graph();
            for node in graph.node_ids().filter(|&n| n != cdg.entry()) {
                assert!(graph.in_degree(node) > 0, "node {node}");
                assert!(graph.has_path(cdg.entry(), node), "node {node}");
            }
            assert!(graph.has_edge(cdg.entry(), cfg.exit()));
        }
    }

    #[test]
    fn test_cdg_recompute_is_identical() {
        let cfg = counting_loop();
        let first = ControlDependenceGraph::compute(&cfg).unwrap();
        let second = ControlDependenceGraph::compute(&cfg).unwrap();
        assert_eq!(first.graph().edge_set(), second.graph().edge_set());
        let sorted_labels = |cdg: &ControlDependenceGraph| {
            let mut labels: Vec<_> = cdg.graph().labels().map(|(k, l)| (k, l.to_string())).collect();
            labels.sort();
            labels
        };
        assert_eq!(sorted_labels(&first), sorted_labels(&second));
    }

    #[test]
    fn test_cdg_straight_line() {
        let mut asm = MethodAssembler::new(method("id"));
        asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
        asm.emit(Operation::Return(Some(ValueKind::Int))).unwrap();
        let cfg = asm.finish().unwrap().analyze(&AnalysisConfig::default()).unwrap();
        let cdg = cfg.cdg().unwrap();

        assert_eq!(cdg.graph().edge_count(), 3);
        assert_eq!(cdg.graph().out_degree(cdg.entry()), 3);
    }

    #[test]
    fn test_cdg_stale_instruction() {
        let cfg = diamond();
        let other = counting_loop();
        let cdg = cfg.cdg().unwrap();
        assert!(matches!(
            cdg.control_dependencies(other.instruction(0).unwrap(), true),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_cdg_dot() {
        let cfg = diamond();
        let dot = cfg.cdg().unwrap().to_dot(Some("sign"));
        assert!(dot.starts_with("digraph CDG {"));
        assert!(dot.contains("label=\"CDG: sign\";"));
        assert!(dot.contains("n2 -> n3 [label=\"F\"];"));
        assert!(dot.contains("n0 -> n1;"));
    }
}
