//! Control-dependence integration tests.
//!
//! These tests verify the complete analysis pipeline using the public API:
//! 1. Build an instruction stream using `MethodAssembler`
//! 2. Build the control flow graph
//! 3. Compute the post-dominator tree over the augmented CFG
//! 4. Derive the control-dependence graph and query it

use std::{collections::BTreeMap, sync::Arc};

use bytescope::{
    analysis::{
        AnalysisCache, AnalysisConfig, CfgEdgeKind, ControlDependenceGraph, ControlFlowGraph,
        MethodBody,
    },
    assembly::{
        Condition, Constant, Instruction, MethodAssembler, MethodIdentifier, Operation,
        SwitchKind, ValueKind,
    },
    Result,
};

fn method(name: &str) -> Result<MethodIdentifier> {
    MethodIdentifier::new("com/example/Flow", name, "(I)I")
}

fn analyze(body: &MethodBody) -> Result<ControlFlowGraph> {
    body.analyze(&AnalysisConfig::default())
}

fn orders(instructions: &[&Arc<Instruction>]) -> Vec<i32> {
    instructions.iter().map(|i| i.order()).collect()
}

fn at(cfg: &ControlFlowGraph, order: i32) -> &Arc<Instruction> {
    cfg.instruction(order).expect("instruction exists")
}

/// `return x == 0 ? 1 : 2;`
fn diamond() -> Result<MethodBody> {
    let mut asm = MethodAssembler::new(method("diamond")?);
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
    asm.branch(Condition::NotEqual, "else")?;
    asm.emit(Operation::Constant(Constant::Int(1)))?;
    asm.goto("join")?;
    asm.define_label("else")?;
    asm.emit(Operation::Constant(Constant::Int(2)))?;
    asm.define_label("join")?;
    asm.emit(Operation::Return(Some(ValueKind::Int)))?;
    asm.finish()
}

/// Two nested counting loops over `i` (slot 1) and `j` (slot 2) up to `n` (slot 0).
fn nested_loops() -> Result<MethodBody> {
    let mut asm = MethodAssembler::new(method("nested")?);
    asm.emit(Operation::Constant(Constant::Int(0)))?;
    asm.emit(Operation::Store { kind: ValueKind::Int, slot: 1 })?;
    asm.define_label("outer")?;
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 1 })?;
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
    asm.branch(Condition::IntGreaterOrEqual, "done")?;
    asm.emit(Operation::Constant(Constant::Int(0)))?;
    asm.emit(Operation::Store { kind: ValueKind::Int, slot: 2 })?;
    asm.define_label("inner")?;
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 2 })?;
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
    asm.branch(Condition::IntGreaterOrEqual, "next")?;
    asm.emit(Operation::Increment { slot: 2, delta: 1 })?;
    asm.goto("inner")?;
    asm.define_label("next")?;
    asm.emit(Operation::Increment { slot: 1, delta: 1 })?;
    asm.goto("outer")?;
    asm.define_label("done")?;
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 1 })?;
    asm.emit(Operation::Return(Some(ValueKind::Int)))?;
    asm.finish()
}

/// `switch (x) { case 1: return 1; case 2: return 2; default: return 0; }`
fn switch_method() -> Result<MethodBody> {
    let mut asm = MethodAssembler::new(method("select")?);
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
    asm.switch(SwitchKind::Lookup, "default", &[(1, "one"), (2, "two")])?;
    asm.define_label("one")?;
    asm.emit(Operation::Constant(Constant::Int(1)))?;
    asm.emit(Operation::Return(Some(ValueKind::Int)))?;
    asm.define_label("two")?;
    asm.emit(Operation::Constant(Constant::Int(2)))?;
    asm.emit(Operation::Return(Some(ValueKind::Int)))?;
    asm.define_label("default")?;
    asm.emit(Operation::Constant(Constant::Int(0)))?;
    asm.emit(Operation::Return(Some(ValueKind::Int)))?;
    asm.finish()
}

#[test]
fn test_diamond_lca() -> Result<()> {
    let body = diamond()?;
    let cfg = analyze(&body)?;
    let pdt = cfg.pdt()?;
    let cdg = cfg.cdg()?;

    let branch = at(&cfg, 1);
    let then_side = at(&cfg, 2);
    let else_side = at(&cfg, 4);
    let join = at(&cfg, 5);

    assert!(pdt.is_post_dominated(then_side, join)?);
    assert!(pdt.is_post_dominated(else_side, join)?);
    assert!(pdt.is_post_dominated(branch, join)?);
    assert!(!pdt.is_post_dominated(branch, then_side)?);

    assert_eq!(orders(&cdg.immediate_control_dependencies(then_side, true)?), vec![1]);
    assert_eq!(orders(&cdg.immediate_control_dependencies(at(&cfg, 3), true)?), vec![1]);
    assert_eq!(orders(&cdg.immediate_control_dependencies(else_side, true)?), vec![1]);
    assert!(!cdg.is_control_dependent(branch, join)?);
    assert!(cdg.immediate_control_dependencies(join, true)?[0].is_method_entry());

    assert_eq!(
        orders(&cdg.dependents(branch)?),
        vec![2, 3, 4],
        "the branch controls both arms and nothing else"
    );
    Ok(())
}

#[test]
fn test_branch_outcome_labels() -> Result<()> {
    let body = diamond()?;
    let cfg = analyze(&body)?;
    let cdg = cfg.cdg()?;
    let graph = cdg.graph();

    let branch = graph.require(at(&cfg, 1))?;
    assert_eq!(graph.edge_label(branch, graph.require(at(&cfg, 2))?), Some("F"));
    assert_eq!(graph.edge_label(branch, graph.require(at(&cfg, 3))?), Some("F"));
    assert_eq!(graph.edge_label(branch, graph.require(at(&cfg, 4))?), Some("T"));

    let unlabeled = body.analyze(&AnalysisConfig {
        label_branches: false,
        ..AnalysisConfig::default()
    })?;
    assert_eq!(unlabeled.cdg()?.graph().labels().count(), 0);
    assert_eq!(
        unlabeled.cdg()?.graph().edge_set(),
        graph.edge_set(),
        "labels never change the edge set"
    );
    Ok(())
}

#[test]
fn test_loop_headers_depend_on_themselves() -> Result<()> {
    let body = nested_loops()?;
    let cfg = analyze(&body)?;
    let cdg = cfg.cdg()?;

    let outer = at(&cfg, 4);
    let inner = at(&cfg, 9);
    assert!(cdg.is_control_dependent(outer, outer)?);
    assert!(cdg.is_control_dependent(inner, inner)?);
    assert!(!cdg.is_control_dependent(at(&cfg, 14), at(&cfg, 14))?);

    assert_eq!(orders(&cdg.immediate_control_dependencies(inner, false)?), vec![4, 9]);
    assert_eq!(orders(&cdg.immediate_control_dependencies(inner, true)?), vec![4]);
    assert_eq!(orders(&cdg.immediate_control_dependencies(at(&cfg, 10), true)?), vec![9]);

    let transitive = cdg.control_dependencies(at(&cfg, 10), true)?;
    assert_eq!(orders(&transitive), vec![-1, 4, 9]);
    let with_self = cdg.control_dependencies(inner, false)?;
    assert_eq!(orders(&with_self), vec![-1, 4, 9]);
    let without_self = cdg.control_dependencies(inner, true)?;
    assert_eq!(orders(&without_self), vec![-1, 4]);

    assert!(cdg.is_control_dependent(outer, at(&cfg, 10))?);
    assert!(!cdg.is_control_dependent(at(&cfg, 10), outer)?);
    assert!(!cdg.is_control_dependent(outer, at(&cfg, 14))?);
    Ok(())
}

#[test]
fn test_branch_to_itself_depends_on_itself() -> Result<()> {
    // 0: iload_0; 1: iconst_0; 2: ifeq 2; 3: return
    let mut asm = MethodAssembler::new(method("spin")?);
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
    asm.emit(Operation::Constant(Constant::Int(0)))?;
    asm.define_label("spin")?;
    asm.branch(Condition::Equal, "spin")?;
    asm.emit(Operation::Return(None))?;
    let cfg = analyze(&asm.finish()?)?;
    let cdg = cfg.cdg()?;
    let spin = at(&cfg, 2);

    assert!(cfg.pdt()?.immediate_post_dominator(spin)?.is_some_and(|i| i.order() == 3));
    assert!(cdg.is_control_dependent(spin, spin)?);
    assert_eq!(orders(&cdg.control_dependencies(spin, false)?), vec![-1, 2]);
    assert_eq!(orders(&cdg.control_dependencies(spin, true)?), vec![-1]);
    assert_eq!(orders(&cdg.dependents(spin)?), vec![2]);
    assert!(!cdg.is_control_dependent(spin, at(&cfg, 3))?);
    Ok(())
}

#[test]
fn test_switch_cases() -> Result<()> {
    let body = switch_method()?;
    let cfg = analyze(&body)?;
    let cdg = cfg.cdg()?;
    let switch = at(&cfg, 1);

    assert_eq!(
        cfg.edge_kind(switch, at(&cfg, 2))?,
        Some(CfgEdgeKind::Switch { case_value: Some(1) })
    );
    assert_eq!(
        cfg.edge_kind(switch, at(&cfg, 6))?,
        Some(CfgEdgeKind::Switch { case_value: None })
    );

    for order in 2..8 {
        let deps = cdg.immediate_control_dependencies(at(&cfg, order), true)?;
        assert_eq!(orders(&deps), vec![1], "order {order}");
    }
    assert_eq!(cdg.dependents(switch)?.len(), 6);
    Ok(())
}

#[test]
fn test_subroutine_is_unconditional() -> Result<()> {
    let mut asm = MethodAssembler::new(method("finally")?);
    asm.jsr("sub")?;
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
    asm.emit(Operation::Return(Some(ValueKind::Int)))?;
    asm.define_label("sub")?;
    asm.emit(Operation::Store { kind: ValueKind::Reference, slot: 1 })?;
    asm.ret(1);
    let body = asm.finish()?;
    let cfg = analyze(&body)?;

    assert_eq!(cfg.edge_kind(at(&cfg, 0), at(&cfg, 3))?, Some(CfgEdgeKind::Subroutine));
    assert_eq!(cfg.edge_kind(at(&cfg, 4), at(&cfg, 1))?, Some(CfgEdgeKind::Subroutine));

    let cdg = cfg.cdg()?;
    for order in 0..5 {
        let deps = cdg.immediate_control_dependencies(at(&cfg, order), true)?;
        assert_eq!(deps.len(), 1, "order {order}");
        assert!(deps[0].is_method_entry(), "order {order}");
    }
    Ok(())
}

#[test]
fn test_structural_properties() -> Result<()> {
    for body in [diamond()?, nested_loops()?, switch_method()?] {
        let cfg = analyze(&body)?;
        let pdt = cfg.pdt()?;
        let cdg = cfg.cdg()?;

        assert_eq!(pdt.graph().node_count(), cfg.node_count());
        assert_eq!(pdt.root(), cfg.exit());
        for node in pdt.graph().node_ids().filter(|&n| n != pdt.root()) {
            assert_eq!(pdt.graph().out_degree(node), 1);
        }

        assert_eq!(cdg.entry(), cfg.entry());
        for node in cdg.graph().node_ids().filter(|&n| n != cdg.entry()) {
            assert!(cdg.graph().in_degree(node) > 0, "{} in {}", node, body.method());
        }

        let again = ControlDependenceGraph::compute(&cfg)?;
        assert_eq!(again.graph().edge_set(), cdg.graph().edge_set());
    }
    Ok(())
}

#[test]
fn test_cache_pipeline() -> Result<()> {
    let source: BTreeMap<MethodIdentifier, MethodBody> = [diamond()?, nested_loops()?, switch_method()?]
        .into_iter()
        .map(|body| (body.method().as_ref().clone(), body))
        .collect();

    let cache = AnalysisCache::new();
    let graphs = cache.analyze_all(&source)?;
    assert_eq!(graphs.len(), 3);

    for cfg in &graphs {
        let cached = cache
            .get_or_analyze(&source, cfg.method())?
            .expect("method is known");
        assert!(Arc::ptr_eq(cfg, &cached));
        assert!(cached.cdg()?.graph().node_count() >= 4);
    }
    Ok(())
}

#[test]
fn test_dot_rendering() -> Result<()> {
    let body = diamond()?;
    let cfg = analyze(&body)?;

    let cdg_dot = cfg.cdg()?.to_dot(Some("diamond"));
    assert!(cdg_dot.starts_with("digraph CDG {"));
    assert!(cdg_dot.contains("n2 -> n5 [label=\"T\"];"));

    let pdt_dot = cfg.pdt()?.to_dot(None);
    assert!(pdt_dot.contains("n6 -> n7;"));
    Ok(())
}
