//! Control Flow Graph (CFG) construction.
//!
//! This module builds an instruction-level graph over one method: every instruction is
//! a node, and two synthetic sentinels mark where control enters and leaves the method.
//!
//! # Architecture
//!
//! The CFG builds upon the generic [`crate::utils::graph::DirectedGraph`] infrastructure
//! with `Arc<Instruction>` as node content. The augmented CFG, the post-dominator tree
//! and the control-dependence graph reuse the same node numbering, so a
//! [`crate::utils::graph::NodeId`] can be carried from one to the other.
//!
//! # Key Components
//!
//! - [`ControlFlowGraph`] - The CFG of one method and the entry point for derived graphs
//! - [`InstructionGraph`] - The graph type shared by CFG, ACFG, PDT and CDG
//! - [`CfgEdgeKind`] - Classification of edge types (unconditional, conditional, etc.)
//!
//! # Edge Types
//!
//! - **Unconditional**: fall-through, `goto` and the edge out of method-entry
//! - **Conditional True/False**: the taken and fall-through sides of a branch, stored as
//!   `"T"`/`"F"` edge labels
//! - **Switch**: one edge per distinct switch target
//! - **Subroutine**: `jsr` and `ret`
//! - **Exception**: `athrow` into every enclosing handler
//! - **Exit**: returns, and `athrow` propagating out of the method
//!
//! # Lazy Computation
//!
//! The augmented CFG, the post-dominator tree and the control-dependence graph are
//! computed on first access and cached using [`std::sync::OnceLock`].
//!
//! # Examples
//!
//! ```rust
//! use bytescope::prelude::*;
//!
//! let method = MethodIdentifier::new("com/example/Foo", "sign", "(I)I")?;
//! let mut asm = MethodAssembler::new(method);
//! asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
//! asm.branch(Condition::Less, "negative")?;
//! asm.emit(Operation::Constant(Constant::Int(1)))?;
//! asm.emit(Operation::Return(Some(ValueKind::Int)))?;
//! asm.define_label("negative")?;
//! asm.emit(Operation::Constant(Constant::Int(-1)))?;
//! asm.emit(Operation::Return(Some(ValueKind::Int)))?;
//! let body = asm.finish()?;
//!
//! let cfg = ControlFlowGraph::compute(body.instructions(), body.handlers())?;
//! let branch = cfg.instruction(1).expect("branch exists");
//! let taken = cfg.instruction(4).expect("target exists");
//! assert_eq!(cfg.edge_kind(branch, taken)?, Some(CfgEdgeKind::ConditionalTrue));
//! # Ok::<(), bytescope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`ControlFlowGraph`] is [`Send`] and [`Sync`], enabling safe concurrent read
//! access after construction.

mod edge;
mod graph;

pub use edge::CfgEdgeKind;
pub use graph::{ControlFlowGraph, InstructionGraph};

pub(crate) use graph::{contents_of, locate};
