//! Program analysis infrastructure for JVM method bodies.
//!
//! This module builds the per-method graphs consumed by coverage and fitness
//! computations. It builds upon the generic graph infrastructure in
//! [`crate::utils::graph`] and the instruction model in [`crate::assembly`].
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`cfg`] - Control Flow Graph construction over instructions and handler ranges
//! - [`pdt`] - Post-dominator tree over the augmented CFG
//! - [`cdg`] - Control-dependence graph derived from the CFG and its post-dominator tree
//! - [`frames`] - Operand stack frame layouts computed as a fixpoint over the CFG
//! - [`method`] - Decoded method bodies and the [`InstructionSource`] seam
//! - [`cache`] - Concurrent per-method graph cache
//! - [`config`] - Analysis configuration
//!
//! Analysis of one method is a strict pipeline `CFG -> PDT -> CDG`. Each stage is
//! computed once, on first access, and cached inside the [`ControlFlowGraph`].
//!
//! # Usage
//!
//! ```rust
//! use bytescope::prelude::*;
//!
//! let method = MethodIdentifier::new("com/example/Foo", "clamp", "(I)I")?;
//! let mut asm = MethodAssembler::new(method);
//! asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
//! asm.branch(Condition::GreaterOrEqual, "done")?;
//! asm.emit(Operation::Constant(Constant::Int(0)))?;
//! asm.emit(Operation::Store { kind: ValueKind::Int, slot: 0 })?;
//! asm.define_label("done")?;
//! asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
//! asm.emit(Operation::Return(Some(ValueKind::Int)))?;
//! let body = asm.finish()?;
//!
//! let cfg = body.analyze(&AnalysisConfig::default())?;
//! let store = cfg.instruction(3).expect("store exists");
//! let join = cfg.instruction(4).expect("join exists");
//!
//! // the join point post-dominates the branch and runs unconditionally
//! assert!(cfg.pdt()?.is_post_dominated(cfg.instruction(1).expect("branch"), join)?);
//! assert_eq!(cfg.cdg()?.immediate_control_dependencies(store, true)?.len(), 1);
//! assert!(cfg.cdg()?.immediate_control_dependencies(join, true)?[0].is_method_entry());
//! # Ok::<(), bytescope::Error>(())
//! ```

pub mod cache;
pub mod cdg;
pub mod cfg;
pub mod config;
pub mod frames;
pub mod method;
pub mod pdt;

// Re-export primary types at module level
pub use cache::AnalysisCache;
pub use cdg::ControlDependenceGraph;
pub use cfg::{CfgEdgeKind, ControlFlowGraph, InstructionGraph};
pub use config::{AnalysisConfig, UnreachablePolicy};
pub use frames::{FrameLayout, StackFrames};
pub use method::{InstructionSource, MethodBody};
pub use pdt::PostDominatorTree;
