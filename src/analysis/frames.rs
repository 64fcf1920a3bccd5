//! Operand stack frame layouts.
//!
//! For every instruction reachable from method-entry this module computes the layout of
//! the operand stack right before the instruction executes (its *input* frame) and the
//! layout it hands to each successor (its *output* frames).
//!
//! # Algorithm
//!
//! The layouts are the fixpoint of a worklist iteration over the CFG:
//!
//! 1. Every instruction starts with the minimal layout its stack effects need.
//!    Method-entry starts with an exact empty stack.
//! 2. Input frames flow forward through [`FrameLayout::apply`] into the inputs of
//!    successors.
//! 3. Successor inputs flow backward through [`FrameLayout::revert`] into the input of
//!    their predecessor. This refines placeholder types with what later instructions
//!    consume.
//! 4. Joins merge layouts with [`FrameLayout::merge`]. Stack heights must agree.
//!
//! Nodes are visited in reverse postorder first, so every reachable input is exact after
//! one sweep and later rounds only refine types.
//!
//! Method-exit has no frame, since returns may leave values behind on the stack.
//! Instructions not reachable from method-entry have none either.

use std::{collections::VecDeque, fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{
    analysis::cfg::{locate, CfgEdgeKind, ControlFlowGraph},
    assembly::{
        merge_values, Instruction, StackManipulation, StackShuffle, StackType, TypeStack,
        VariableTable,
    },
    utils::graph::{algorithms, NodeId},
    Error, Result,
};

/// The layout of an operand stack, bottom to top.
///
/// An *exact* layout describes the whole stack. A *partial* layout only fixes its top
/// values, and anything may lie below them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    values: Vec<StackType>,
    exact: bool,
}

impl FrameLayout {
    /// A layout describing the whole stack.
    #[must_use]
    pub fn exact(values: Vec<StackType>) -> Self {
        FrameLayout {
            values,
            exact: true,
        }
    }

    /// A layout fixing only the top `values` of the stack.
    #[must_use]
    pub fn partial(values: Vec<StackType>) -> Self {
        FrameLayout {
            values,
            exact: false,
        }
    }

    /// The known values, bottom to top.
    #[must_use]
    pub fn values(&self) -> &[StackType] {
        &self.values
    }

    /// Returns `true` if nothing lies below [`values`](Self::values).
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.exact
    }

    /// The top value.
    #[must_use]
    pub fn top(&self) -> Option<&StackType> {
        self.values.last()
    }

    /// Number of stack words the known values occupy.
    #[must_use]
    pub fn words(&self) -> usize {
        self.values.iter().map(StackType::words).sum()
    }

    /// The smallest layout `manipulation` can execute on.
    #[must_use]
    pub fn minimal_before(manipulation: &StackManipulation) -> Self {
        match manipulation {
            StackManipulation::Uniform { consumed, .. } => FrameLayout::partial(consumed.clone()),
            StackManipulation::Shuffle(shuffle) => FrameLayout::partial(vec![
                StackType::Any;
                shuffle.top_words() + shuffle.skipped_words()
            ]),
            StackManipulation::Clear { .. } => FrameLayout::partial(Vec::new()),
        }
    }

    /// The smallest layout `manipulation` leaves behind.
    #[must_use]
    pub fn minimal_after(manipulation: &StackManipulation) -> Self {
        match manipulation {
            StackManipulation::Uniform { pushed, .. } => {
                let mut values = Vec::new();
                if *pushed != StackType::Void {
                    values.push(pushed.clone());
                }
                FrameLayout::partial(values)
            }
            StackManipulation::Shuffle(shuffle) => {
                let words = match shuffle {
                    StackShuffle::Pop | StackShuffle::Pop2 => 0,
                    StackShuffle::Swap => 2,
                    _ => 2 * shuffle.top_words() + shuffle.skipped_words(),
                };
                FrameLayout::partial(vec![StackType::Any; words])
            }
            StackManipulation::Clear { pushed } => {
                FrameLayout::partial(pushed.iter().cloned().collect())
            }
        }
    }

    /// Merges two layouts meeting at the same program point.
    ///
    /// Values are aligned at the top of the stack and merged with [`StackType::merge`].
    /// The result is exact if either side is.
    ///
    /// # Errors
    ///
    /// [`Error::StackMismatch`] if the stack heights disagree or two aligned values do
    /// not merge.
    pub fn merge(&self, other: &FrameLayout) -> Result<FrameLayout> {
        // an exact side fixes the height, a partial side only a lower bound
        let conflicts = |exact: &FrameLayout, other: &FrameLayout| {
            exact.exact
                && if other.exact {
                    exact.words() != other.words()
                } else {
                    other.words() > exact.words()
                }
        };
        if conflicts(self, other) || conflicts(other, self) {
            return Err(Error::StackMismatch {
                expected: self.to_string(),
                found: other.to_string(),
            });
        }

        Ok(FrameLayout {
            values: merge_values(&self.values, &other.values)?,
            exact: self.exact || other.exact,
        })
    }

    /// The layout after executing `manipulation` on this one.
    ///
    /// A partial layout is first extended with whatever `manipulation` consumes.
    ///
    /// # Errors
    ///
    /// See [`TypeStack::apply`].
    pub fn apply(&self, manipulation: &StackManipulation) -> Result<FrameLayout> {
        let base = if self.exact {
            self.clone()
        } else {
            self.merge(&FrameLayout::minimal_before(manipulation))?
        };

        let mut stack = TypeStack::from_values(base.values);
        stack.apply(manipulation)?;
        Ok(FrameLayout {
            values: stack.into_values(),
            exact: base.exact || matches!(manipulation, StackManipulation::Clear { .. }),
        })
    }

    /// The layout before `manipulation` executed, given this layout after it.
    ///
    /// Reverting a [`StackManipulation::Clear`] gives an empty partial layout.
    ///
    /// # Errors
    ///
    /// See [`TypeStack::revert`].
    pub fn revert(&self, manipulation: &StackManipulation) -> Result<FrameLayout> {
        let base = if self.exact {
            self.clone()
        } else {
            self.merge(&FrameLayout::minimal_after(manipulation))?
        };

        let mut stack = TypeStack::from_values(base.values);
        stack.revert(manipulation)?;
        Ok(FrameLayout {
            values: stack.into_values(),
            exact: base.exact && !matches!(manipulation, StackManipulation::Clear { .. }),
        })
    }
}

impl fmt::Display for FrameLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(self.values.len() + 1);
        if !self.exact {
            parts.push("..".to_string());
        }
        parts.extend(self.values.iter().map(ToString::to_string));
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Input and output frame layouts of the instructions of one method.
///
/// # Examples
///
/// ```rust
/// use bytescope::prelude::*;
///
/// let method = MethodIdentifier::new("com/example/Foo", "pick", "(I)I")?;
/// let mut asm = MethodAssembler::new(method);
/// asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
/// asm.branch(Condition::Equal, "zero")?;
/// asm.emit(Operation::Constant(Constant::Int(1)))?;
/// asm.goto("done")?;
/// asm.define_label("zero")?;
/// asm.emit(Operation::Constant(Constant::Int(-1)))?;
/// asm.define_label("done")?;
/// asm.emit(Operation::Return(Some(ValueKind::Int)))?;
/// let body = asm.finish()?;
///
/// let cfg = body.analyze(&AnalysisConfig::default())?;
/// let frames = cfg.stack_frames(Some(body.variables()))?;
/// let join = cfg.instruction(5).expect("return exists");
/// assert_eq!(frames.input(join)?.map(FrameLayout::values), Some(&[StackType::Int][..]));
/// # Ok::<(), bytescope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct StackFrames<'a> {
    cfg: &'a ControlFlowGraph,
    inputs: Vec<Option<FrameLayout>>,
    outputs: Vec<Vec<(NodeId, FrameLayout)>>,
    iterations: usize,
}

impl<'a> StackFrames<'a> {
    /// Computes the frame layouts of `cfg`, refining reference types with `variables`.
    ///
    /// # Errors
    ///
    /// - [`Error::StackMismatch`] if two paths reach an instruction with different stack
    ///   heights or incompatible value types
    /// - [`Error::StackUnderflow`] if an instruction consumes more than the stack holds
    pub fn compute(cfg: &'a ControlFlowGraph, variables: Option<&VariableTable>) -> Result<Self> {
        let graph = cfg.graph();
        let nodes: Vec<&Arc<Instruction>> = graph.contents().collect();
        let (entry, exit) = (cfg.entry(), cfg.exit());
        let reachable = algorithms::reachable(graph, [entry]);
        let live = |node: NodeId| node != exit && reachable[node.index()];

        let mut edges: Vec<Vec<(NodeId, StackManipulation)>> = vec![Vec::new(); nodes.len()];
        for node in graph.node_ids().filter(|&n| live(n)) {
            let source = nodes[node.index()];
            for target in graph.successors(node) {
                let into_handler =
                    CfgEdgeKind::classify(source, nodes[target.index()].order(), cfg.handlers())
                        .is_exceptional();
                edges[node.index()].push((target, source.stack_manipulation(variables, into_handler)?));
            }
        }

        let mut inputs: Vec<Option<FrameLayout>> = vec![None; nodes.len()];
        for node in graph.node_ids().filter(|&n| live(n)) {
            let mut minimal = FrameLayout::partial(Vec::new());
            for (_, manipulation) in &edges[node.index()] {
                minimal = minimal.merge(&FrameLayout::minimal_before(manipulation))?;
            }
            inputs[node.index()] = Some(minimal);
        }
        inputs[entry.index()] = Some(FrameLayout::exact(Vec::new()));

        let mut worklist: VecDeque<NodeId> = algorithms::reverse_postorder(graph, entry)
            .into_iter()
            .filter(|&n| live(n))
            .collect();
        let mut queued = vec![false; nodes.len()];
        for node in &worklist {
            queued[node.index()] = true;
        }

        let mut iterations = 0usize;
        while let Some(node) = worklist.pop_front() {
            queued[node.index()] = false;
            iterations += 1;

            let Some(current) = inputs[node.index()].clone() else {
                continue;
            };
            let mut input = current.clone();
            for source in graph.predecessors(node).filter(|&p| live(p)) {
                if let (Some(before), Some(manipulation)) = (
                    inputs[source.index()].as_ref(),
                    manipulation_of(&edges, source, node),
                ) {
                    input = input.merge(&before.apply(manipulation)?)?;
                }
            }
            for (target, manipulation) in &edges[node.index()] {
                if let Some(after) = inputs[target.index()].as_ref() {
                    input = input.merge(&after.revert(manipulation)?)?;
                }
            }
            if input == current {
                continue;
            }

            trace!(node = %node, frame = %input, "input frame changed");
            inputs[node.index()] = Some(input);
            for neighbour in graph.predecessors(node).chain(graph.successors(node)) {
                if live(neighbour) && !queued[neighbour.index()] {
                    queued[neighbour.index()] = true;
                    worklist.push_back(neighbour);
                }
            }
        }

        let mut outputs: Vec<Vec<(NodeId, FrameLayout)>> = vec![Vec::new(); nodes.len()];
        for (node, input) in inputs.iter().enumerate() {
            let Some(input) = input else {
                continue;
            };
            for (target, manipulation) in &edges[node] {
                outputs[node].push((*target, input.apply(manipulation)?));
            }
        }

        debug!(
            method = %cfg.method(),
            iterations,
            reachable = inputs.iter().flatten().count(),
            "computed stack frames"
        );

        Ok(StackFrames {
            cfg,
            inputs,
            outputs,
            iterations,
        })
    }

    /// The layout right before `instruction` executes.
    ///
    /// Returns `Ok(None)` for method-exit and for instructions not reachable from
    /// method-entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `instruction` is not part of the CFG.
    pub fn input(&self, instruction: &Instruction) -> Result<Option<&FrameLayout>> {
        let node = locate(self.cfg.graph(), instruction)?;
        Ok(self.inputs[node.index()].as_ref())
    }

    /// The layout `instruction` hands to `successor`, or `None` if there is no such edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either instruction is not part of the CFG.
    pub fn output(
        &self,
        instruction: &Instruction,
        successor: &Instruction,
    ) -> Result<Option<&FrameLayout>> {
        let node = locate(self.cfg.graph(), instruction)?;
        let target = locate(self.cfg.graph(), successor)?;
        Ok(self.outputs[node.index()]
            .iter()
            .find(|(candidate, _)| *candidate == target)
            .map(|(_, frame)| frame))
    }

    /// Every successor of `instruction` with the layout handed to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `instruction` is not part of the CFG.
    pub fn outputs(
        &self,
        instruction: &Instruction,
    ) -> Result<Vec<(&Arc<Instruction>, &FrameLayout)>> {
        let node = locate(self.cfg.graph(), instruction)?;
        Ok(self.outputs[node.index()]
            .iter()
            .filter_map(|(target, frame)| self.cfg.graph().node(*target).map(|i| (i, frame)))
            .collect())
    }

    /// The value on top of the input frame of `instruction`, [`StackType::Void`] if the
    /// stack is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `instruction` is not part of the CFG.
    pub fn type_of_top_at(&self, instruction: &Instruction) -> Result<Option<StackType>> {
        Ok(self
            .input(instruction)?
            .map(|frame| frame.top().cloned().unwrap_or(StackType::Void)))
    }

    /// Number of worklist visits until the fixpoint was reached.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }
}

fn manipulation_of(
    edges: &[Vec<(NodeId, StackManipulation)>],
    source: NodeId,
    target: NodeId,
) -> Option<&StackManipulation> {
    edges[source.index()]
        .iter()
        .find(|(node, _)| *node == target)
        .map(|(_, manipulation)| manipulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::AnalysisConfig,
        assembly::{
            Condition, Constant, MethodAssembler, MethodIdentifier, Operation, ValueKind, OBJECT,
            THROWABLE,
        },
    };

    fn method(name: &str, descriptor: &str) -> MethodIdentifier {
        MethodIdentifier::new("com/example/Frames", name, descriptor).unwrap()
    }

    fn exact(values: &[StackType]) -> FrameLayout {
        FrameLayout::exact(values.to_vec())
    }

    /// `return x == 0 ? a : b;` with `a` and `b` pushed by `first` and `second`.
    fn choice(first: Operation, second: Operation) -> ControlFlowGraph {
        let mut asm = MethodAssembler::new(method("choose", "(I)Ljava/lang/Object;"));
        asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
        asm.branch(Condition::Equal, "second").unwrap();
        asm.emit(first).unwrap();
        asm.goto("join").unwrap();
        asm.define_label("second").unwrap();
        asm.emit(second).unwrap();
        asm.define_label("join").unwrap();
        asm.emit(Operation::Return(Some(ValueKind::Reference))).unwrap();
        asm.finish().unwrap().analyze(&AnalysisConfig::default()).unwrap()
    }

    fn new_object(class: &str) -> Operation {
        Operation::New {
            class: class.to_string(),
        }
    }

    #[test]
    fn test_layout_merge_heights() {
        let int = exact(&[StackType::Int]);
        assert_eq!(int.merge(&FrameLayout::partial(Vec::new())).unwrap(), int);
        assert_eq!(
            FrameLayout::partial(vec![StackType::Any])
                .merge(&exact(&[StackType::Long, StackType::Int]))
                .unwrap(),
            exact(&[StackType::Long, StackType::Int])
        );
        assert!(matches!(
            int.merge(&exact(&[StackType::Int, StackType::Int])),
            Err(Error::StackMismatch { .. })
        ));
        assert!(matches!(
            int.merge(&FrameLayout::partial(vec![StackType::Int, StackType::Int])),
            Err(Error::StackMismatch { .. })
        ));
        assert!(matches!(
            int.merge(&exact(&[StackType::Float])),
            Err(Error::StackMismatch { .. })
        ));
    }

    #[test]
    fn test_layout_apply_extends_partial() {
        let add = StackManipulation::uniform(vec![StackType::Int, StackType::Int], StackType::Int);
        let after = FrameLayout::partial(vec![StackType::Int]).apply(&add).unwrap();
        assert_eq!(after, FrameLayout::partial(vec![StackType::Int]));

        let swap = StackManipulation::Shuffle(StackShuffle::Swap);
        let swapped = FrameLayout::partial(vec![StackType::Float]).apply(&swap).unwrap();
        assert_eq!(swapped.values(), &[StackType::Float, StackType::Any]);

        let throw = StackManipulation::Clear {
            pushed: Some(StackType::reference(THROWABLE)),
        };
        let caught = FrameLayout::partial(Vec::new()).apply(&throw).unwrap();
        assert_eq!(caught, exact(&[StackType::reference(THROWABLE)]));

        assert!(matches!(
            exact(&[]).apply(&add),
            Err(Error::StackUnderflow { .. })
        ));
    }

    #[test]
    fn test_layout_revert() {
        let add = StackManipulation::uniform(vec![StackType::Int, StackType::Int], StackType::Int);
        let before = exact(&[StackType::Long, StackType::Int]).revert(&add).unwrap();
        assert_eq!(before, exact(&[StackType::Long, StackType::Int, StackType::Int]));

        let dup = StackManipulation::Shuffle(StackShuffle::Dup);
        let partial = FrameLayout::partial(vec![StackType::Float]).revert(&dup).unwrap();
        assert_eq!(partial, FrameLayout::partial(vec![StackType::Float]));

        let cleared = exact(&[StackType::Int])
            .revert(&StackManipulation::Clear { pushed: None })
            .unwrap();
        assert_eq!(cleared, FrameLayout::partial(Vec::new()));
        assert_eq!(cleared.to_string(), "[..]");
        assert_eq!(before.to_string(), "[long, int, int]");
    }

    #[test]
    fn test_frames_merge_point() {
        let cfg = choice(Operation::Constant(Constant::Null), new_object("java/lang/String"));
        let frames = cfg.stack_frames(None).unwrap();
        let at = |order| cfg.instruction(order).unwrap();

        assert_eq!(frames.input(at(0)).unwrap(), Some(&exact(&[])));
        assert_eq!(frames.input(at(1)).unwrap(), Some(&exact(&[StackType::Int])));
        // the null from one arm takes the class of the other
        assert_eq!(
            frames.input(at(5)).unwrap(),
            Some(&exact(&[StackType::reference("java/lang/String")]))
        );
        assert_eq!(
            frames.output(at(2), at(3)).unwrap(),
            Some(&exact(&[StackType::Reference(None)]))
        );
        assert_eq!(frames.output(at(2), at(4)).unwrap(), None);

        let branch = frames.outputs(at(1)).unwrap();
        assert_eq!(branch.len(), 2);
        assert!(branch.iter().all(|(_, frame)| frame.values().is_empty() && frame.is_exact()));

        assert!(frames.input(cfg.exit_instruction()).unwrap().is_none());
        assert!(frames.iterations() >= cfg.node_count() - 1);
    }

    #[test]
    fn test_frames_unrelated_classes_merge_to_object() {
        let cfg = choice(new_object("java/lang/Integer"), new_object("java/lang/String"));
        let frames = cfg.stack_frames(None).unwrap();
        assert_eq!(
            frames.type_of_top_at(cfg.instruction(5).unwrap()).unwrap(),
            Some(StackType::reference(OBJECT))
        );
    }

    #[test]
    fn test_frames_height_mismatch() {
        // one arm leaves two values behind
        let mut asm = MethodAssembler::new(method("uneven", "(I)V"));
        asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
        asm.branch(Condition::Equal, "join").unwrap();
        asm.emit(Operation::Constant(Constant::Int(1))).unwrap();
        asm.define_label("join").unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        let cfg = asm.finish().unwrap().analyze(&AnalysisConfig::default()).unwrap();

        assert!(matches!(
            cfg.stack_frames(None),
            Err(Error::StackMismatch { .. })
        ));
    }

    #[test]
    fn test_frames_handler_entry() {
        let mut asm = MethodAssembler::new(method("guard", "(I)V"));
        asm.define_label("try").unwrap();
        asm.emit(Operation::Constant(Constant::Int(7))).unwrap();
        asm.emit(new_object("java/lang/IllegalStateException")).unwrap();
        asm.emit(Operation::Throw).unwrap();
        asm.define_label("handler").unwrap();
        asm.emit(Operation::Store { kind: ValueKind::Reference, slot: 1 }).unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        asm.try_catch("try", "handler", "handler", None).unwrap();
        let cfg = asm.finish().unwrap().analyze(&AnalysisConfig::default()).unwrap();
        let frames = cfg.stack_frames(None).unwrap();
        let at = |order| cfg.instruction(order).unwrap();

        assert_eq!(
            frames.input(at(2)).unwrap(),
            Some(&exact(&[
                StackType::Int,
                StackType::reference("java/lang/IllegalStateException")
            ]))
        );
        // the handler sees only the caught exception, whatever was stacked before
        let caught = exact(&[StackType::reference(THROWABLE)]);
        assert_eq!(frames.input(at(3)).unwrap(), Some(&caught));
        assert_eq!(frames.output(at(2), at(3)).unwrap(), Some(&caught));
        assert_eq!(
            frames.output(at(2), cfg.exit_instruction()).unwrap(),
            Some(&exact(&[]))
        );
    }

    #[test]
    fn test_frames_refined_by_later_use() {
        // 0: aconst_null; 1: astore_1 (String name); 2: return
        let mut asm = MethodAssembler::new(method("named", "()V"));
        asm.emit(Operation::Constant(Constant::Null)).unwrap();
        asm.emit(Operation::Store { kind: ValueKind::Reference, slot: 1 }).unwrap();
        asm.define_label("live").unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        asm.define_label("stop").unwrap();
        asm.local_variable("name", "Ljava/lang/String;", 1, "live", "stop");
        let body = asm.finish().unwrap();
        let cfg = body.analyze(&AnalysisConfig::default()).unwrap();
        let store = cfg.instruction(1).unwrap();

        let frames = cfg.stack_frames(Some(body.variables())).unwrap();
        assert_eq!(
            frames.type_of_top_at(store).unwrap(),
            Some(StackType::reference("java/lang/String"))
        );
        assert_eq!(
            frames.output(cfg.instruction(0).unwrap(), store).unwrap(),
            Some(&exact(&[StackType::Reference(None)]))
        );
        // the shortest-path simulation only sees what was pushed
        assert_eq!(
            cfg.type_of_top_at(store, Some(body.variables())).unwrap(),
            Some(StackType::Reference(None))
        );
    }

    #[test]
    fn test_frames_loop_and_dead_code() {
        // 0: iload_0; 1: ifeq 4; 2: iinc 0 -1; 3: goto 0; 4: return; 5: pop; 6: return
        let mut asm = MethodAssembler::new(method("countdown", "(I)V"));
        asm.define_label("head").unwrap();
        asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
        asm.branch(Condition::Equal, "done").unwrap();
        asm.emit(Operation::Increment { slot: 0, delta: -1 }).unwrap();
        asm.goto("head").unwrap();
        asm.define_label("done").unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        asm.emit(Operation::Shuffle(StackShuffle::Pop)).unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        let cfg = asm.finish().unwrap().analyze(&AnalysisConfig::permissive()).unwrap();
        let frames = cfg.stack_frames(None).unwrap();
        let at = |order| cfg.instruction(order).unwrap();

        for order in [0, 2, 3, 4] {
            assert_eq!(frames.input(at(order)).unwrap(), Some(&exact(&[])), "order {order}");
        }
        assert_eq!(frames.type_of_top_at(at(1)).unwrap(), Some(StackType::Int));
        assert!(frames.input(at(5)).unwrap().is_none());
        assert!(frames.outputs(at(5)).unwrap().is_empty());
    }

    #[test]
    fn test_frames_stale_instruction() {
        let cfg = choice(Operation::Constant(Constant::Null), Operation::Constant(Constant::Null));
        let mut asm = MethodAssembler::new(method("other", "()V"));
        asm.emit(Operation::Nop).unwrap();
        asm.emit(Operation::Return(None)).unwrap();
        let other = asm.finish().unwrap();

        let frames = cfg.stack_frames(None).unwrap();
        assert!(matches!(
            frames.input(&other.instructions()[0]),
            Err(Error::InvalidArgument(_))
        ));
    }
}
