//! Benchmarks for the per-method analysis pipeline.
//!
//! Measures each stage on generated methods of growing size:
//! - CFG construction from an assembled instruction stream
//! - Post-dominator tree over the augmented CFG
//! - Control-dependence graph
//! - Operand stack frame layouts
//! - Batch analysis through the shared cache, sequential and parallel

extern crate bytescope;

use bytescope::{
    analysis::{AnalysisCache, AnalysisConfig, ControlFlowGraph, MethodBody},
    assembly::{Condition, Constant, MethodAssembler, MethodIdentifier, Operation, ValueKind},
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

/// Generates a method with `blocks` consecutive if/else diamonds inside one loop.
fn generate_method(name: &str, blocks: usize) -> MethodBody {
    let method = MethodIdentifier::new("bench/Generated", name, "(I)I").unwrap();
    let mut asm = MethodAssembler::new(method);

    asm.define_label("head").unwrap();
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
    asm.branch(Condition::LessOrEqual, "exit").unwrap();
    for block in 0..blocks {
        let other = format!("else{block}");
        let join = format!("join{block}");
        asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 }).unwrap();
        asm.emit(Operation::Constant(Constant::Int(block as i32))).unwrap();
        asm.branch(Condition::IntLess, &other).unwrap();
        asm.emit(Operation::Increment { slot: 1, delta: 1 }).unwrap();
        asm.goto(&join).unwrap();
        asm.define_label(&other).unwrap();
        asm.emit(Operation::Increment { slot: 1, delta: -1 }).unwrap();
        asm.define_label(&join).unwrap();
        asm.emit(Operation::Nop).unwrap();
    }
    asm.emit(Operation::Increment { slot: 0, delta: -1 }).unwrap();
    asm.goto("head").unwrap();
    asm.define_label("exit").unwrap();
    asm.emit(Operation::Load { kind: ValueKind::Int, slot: 1 }).unwrap();
    asm.emit(Operation::Return(Some(ValueKind::Int))).unwrap();
    asm.finish().unwrap()
}

fn bench_cfg(c: &mut Criterion) {
    let mut group = c.benchmark_group("cfg");
    for blocks in [4, 32, 256] {
        let body = generate_method("cfg", blocks);
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &body, |b, body| {
            b.iter(|| {
                let cfg =
                    ControlFlowGraph::compute(black_box(body.instructions()), body.handlers())
                        .unwrap();
                black_box(cfg)
            });
        });
    }
    group.finish();
}

fn bench_pdt(c: &mut Criterion) {
    let mut group = c.benchmark_group("pdt");
    for blocks in [4, 32, 256] {
        let body = generate_method("pdt", blocks);
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &body, |b, body| {
            b.iter(|| {
                let cfg = body.analyze(&AnalysisConfig::default()).unwrap();
                cfg.pdt().unwrap().graph().edge_count()
            });
        });
    }
    group.finish();
}

fn bench_cdg(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdg");
    for blocks in [4, 32, 256] {
        let body = generate_method("cdg", blocks);
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &body, |b, body| {
            b.iter(|| {
                let cfg = body.analyze(&AnalysisConfig::default()).unwrap();
                cfg.cdg().unwrap().graph().edge_count()
            });
        });
    }
    group.finish();
}

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("frames");
    for blocks in [4, 32, 256] {
        let body = generate_method("frames", blocks);
        let cfg = body.analyze(&AnalysisConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &cfg, |b, cfg| {
            b.iter(|| {
                let frames = cfg.stack_frames(Some(body.variables())).unwrap();
                black_box(frames.iterations())
            });
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let bodies: Vec<MethodBody> = (0..64)
        .map(|i| generate_method(&format!("m{i}"), 16))
        .collect();

    let mut group = c.benchmark_group("batch");
    for parallel in [false, true] {
        let config = AnalysisConfig::default().with_parallel(parallel);
        let name = if parallel { "parallel" } else { "sequential" };
        group.bench_function(name, |b| {
            b.iter(|| {
                let cache = AnalysisCache::with_config(config);
                let graphs = cache.analyze_all(black_box(&bodies)).unwrap();
                for cfg in &graphs {
                    black_box(cfg.cdg().unwrap());
                }
                graphs.len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cfg, bench_pdt, bench_cdg, bench_frames, bench_batch);
criterion_main!(benches);
