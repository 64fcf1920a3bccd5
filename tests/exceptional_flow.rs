//! Exceptional control flow integration tests.
//!
//! Covers `athrow` edges into enclosing handlers, uncaught exceptions leaving the
//! method, dead catch blocks under the different unreachable policies and the operand
//! stack seen by handler entries.

use std::sync::Arc;

use bytescope::{
    analysis::{
        AnalysisConfig, CfgEdgeKind, ControlFlowGraph, FrameLayout, MethodBody, UnreachablePolicy,
    },
    assembly::{
        Condition, HandlerRange, Instruction, MethodAssembler, MethodIdentifier, Operation,
        StackType, ValueKind, METHOD_EXIT_ORDER, THROWABLE,
    },
    Error, Result,
};

fn at(cfg: &ControlFlowGraph, order: i32) -> &Arc<Instruction> {
    cfg.instruction(order).expect("instruction exists")
}

fn orders(instructions: &[&Arc<Instruction>]) -> Vec<i32> {
    instructions.iter().map(|i| i.order()).collect()
}

/// A method throwing at order 5 inside the range `[2, 10)` guarded by a handler at 7.
///
/// ```text
///  0: nop
///  1: nop
///  2: iload_0          <- try
///  3: ifeq 6
///  4: new java/lang/RuntimeException
///  5: athrow
///  6: goto 9
///  7: astore_1         <- handler
///  8: nop
///  9: nop
/// 10: return           <- end of try
/// ```
fn guarded_throw() -> Result<MethodBody> {
    let method = MethodIdentifier::new("com/example/Guard", "run", "(I)V")?;
    let mut asm = MethodAssembler::new(method);
    asm.emit(Operation::Nop)?;
    asm.emit(Operation::Nop)?;
    asm.define_label("try")?;
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
    asm.branch(Condition::Equal, "skip")?;
    asm.emit(Operation::New {
        class: "java/lang/RuntimeException".to_string(),
    })?;
    asm.emit(Operation::Throw)?;
    asm.define_label("skip")?;
    asm.goto("join")?;
    asm.define_label("handler")?;
    asm.emit(Operation::Store { kind: ValueKind::Reference, slot: 1 })?;
    asm.emit(Operation::Nop)?;
    asm.define_label("join")?;
    asm.emit(Operation::Nop)?;
    asm.define_label("end")?;
    asm.emit(Operation::Return(None))?;
    asm.try_catch("try", "end", "handler", Some("java/lang/RuntimeException"))?;
    asm.finish()
}

#[test]
fn test_throw_successors() -> Result<()> {
    let body = guarded_throw()?;
    let throw = body.instruction(5).expect("athrow exists");

    assert_eq!(throw.successors_with_handlers(body.handlers())?, vec![METHOD_EXIT_ORDER, 7]);
    assert!(matches!(throw.successors(), Err(Error::Unsupported(_))));

    let unguarded = [HandlerRange::new(6, 10, 7, None)?];
    assert_eq!(throw.successors_with_handlers(&unguarded)?, vec![METHOD_EXIT_ORDER]);
    Ok(())
}

#[test]
fn test_throw_edges_in_cfg() -> Result<()> {
    let body = guarded_throw()?;
    let cfg = body.analyze(&AnalysisConfig::strict())?;
    let throw = at(&cfg, 5);

    let successors = cfg.successors_of(throw)?;
    let mut targets: Vec<i32> = successors.iter().map(|i| i.order()).collect();
    targets.sort_unstable();
    assert_eq!(targets, vec![METHOD_EXIT_ORDER, 7]);

    assert_eq!(
        cfg.edge_kind(throw, at(&cfg, 7))?,
        Some(CfgEdgeKind::ExceptionHandler {
            catch_type: Some("java/lang/RuntimeException".to_string())
        })
    );
    assert_eq!(cfg.edge_kind(throw, cfg.exit_instruction())?, Some(CfgEdgeKind::Exit));
    Ok(())
}

#[test]
fn test_handler_dependencies() -> Result<()> {
    let body = guarded_throw()?;
    let cfg = body.analyze(&AnalysisConfig::default())?;
    let pdt = cfg.pdt()?;
    let cdg = cfg.cdg()?;

    // the throw either reaches the handler or leaves the method
    assert!(pdt.immediate_post_dominator(at(&cfg, 5))?.is_some_and(|i| i.is_method_exit()));
    assert!(pdt.is_post_dominated(at(&cfg, 7), at(&cfg, 9))?);

    assert_eq!(orders(&cdg.immediate_control_dependencies(at(&cfg, 7), true)?), vec![5]);
    assert_eq!(orders(&cdg.immediate_control_dependencies(at(&cfg, 4), true)?), vec![3]);
    assert_eq!(orders(&cdg.immediate_control_dependencies(at(&cfg, 9), true)?), vec![3, 5]);
    assert_eq!(orders(&cdg.immediate_control_dependencies(at(&cfg, 10), true)?), vec![3, 5]);
    assert!(cdg.is_control_dependent(at(&cfg, 3), at(&cfg, 8))?);
    assert!(!cdg.is_control_dependent(at(&cfg, 6), at(&cfg, 9))?);

    let exit_deps = cdg.immediate_control_dependencies(cfg.exit_instruction(), true)?;
    assert_eq!(exit_deps.len(), 1);
    assert!(exit_deps[0].is_method_entry());
    Ok(())
}

#[test]
fn test_handler_entry_sees_throwable() -> Result<()> {
    let body = guarded_throw()?;
    let cfg = body.analyze(&AnalysisConfig::default())?;

    assert_eq!(
        cfg.type_of_top_at(at(&cfg, 7), Some(body.variables()))?,
        Some(StackType::reference(THROWABLE))
    );
    assert_eq!(
        cfg.type_of_top_at(at(&cfg, 5), Some(body.variables()))?,
        Some(StackType::reference("java/lang/RuntimeException"))
    );
    Ok(())
}

#[test]
fn test_handler_entry_frames() -> Result<()> {
    let body = guarded_throw()?;
    let cfg = body.analyze(&AnalysisConfig::default())?;
    let frames = cfg.stack_frames(Some(body.variables()))?;
    let caught = FrameLayout::exact(vec![StackType::reference(THROWABLE)]);

    assert_eq!(frames.input(at(&cfg, 7))?, Some(&caught));
    assert_eq!(frames.output(at(&cfg, 5), at(&cfg, 7))?, Some(&caught));
    assert_eq!(
        frames.output(at(&cfg, 5), cfg.exit_instruction())?,
        Some(&FrameLayout::exact(Vec::new()))
    );
    assert_eq!(
        frames.input(at(&cfg, 5))?.and_then(FrameLayout::top),
        Some(&StackType::reference("java/lang/RuntimeException"))
    );

    // the join after the handler is reached from both the normal and the caught path
    assert_eq!(frames.input(at(&cfg, 9))?, Some(&FrameLayout::exact(Vec::new())));
    assert_eq!(
        frames.type_of_top_at(at(&cfg, 7))?,
        cfg.type_of_top_at(at(&cfg, 7), Some(body.variables()))?
    );
    Ok(())
}

/// A catch block whose protected range cannot throw.
fn dead_catch() -> Result<MethodBody> {
    let method = MethodIdentifier::new("com/example/Guard", "quiet", "()V")?;
    let mut asm = MethodAssembler::new(method);
    asm.define_label("try")?;
    asm.emit(Operation::Nop)?;
    asm.define_label("end")?;
    asm.emit(Operation::Return(None))?;
    asm.define_label("handler")?;
    asm.emit(Operation::Store { kind: ValueKind::Reference, slot: 0 })?;
    asm.emit(Operation::Return(None))?;
    asm.try_catch("try", "end", "handler", None)?;
    asm.finish()
}

#[test]
fn test_dead_catch_block_policies() -> Result<()> {
    let body = dead_catch()?;

    assert!(matches!(
        body.analyze(&AnalysisConfig::strict()),
        Err(Error::Invariant { .. })
    ));

    let cfg = body.analyze(&AnalysisConfig::default())?;
    assert_eq!(cfg.predecessors_of(at(&cfg, 2))?.len(), 0);

    // dead code still hangs off method-entry in the CDG
    let cdg = cfg.cdg()?;
    let deps = cdg.immediate_control_dependencies(at(&cfg, 2), true)?;
    assert!(deps[0].is_method_entry());
    assert_eq!(
        cfg.type_of_top_at(at(&cfg, 3), None)?,
        None,
        "no path from method-entry"
    );
    assert!(cfg.stack_frames(None)?.input(at(&cfg, 2))?.is_none());

    let permissive = body.analyze(&AnalysisConfig {
        unreachable: UnreachablePolicy::Allow,
        ..AnalysisConfig::default()
    })?;
    assert_eq!(permissive.node_count(), cfg.node_count());
    Ok(())
}

#[test]
fn test_dead_code_outside_handlers() -> Result<()> {
    let method = MethodIdentifier::new("com/example/Guard", "tail", "()V")?;
    let mut asm = MethodAssembler::new(method);
    asm.emit(Operation::Return(None))?;
    asm.emit(Operation::Nop)?;
    asm.emit(Operation::Return(None))?;
    let body = asm.finish()?;

    assert!(matches!(
        body.analyze(&AnalysisConfig::default()),
        Err(Error::Invariant { .. })
    ));
    assert!(body.analyze(&AnalysisConfig::permissive()).is_ok());
    Ok(())
}
