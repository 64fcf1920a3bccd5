// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # bytescope
//!
//! Instruction-graph and control-dependence analysis for JVM method bytecode.
//!
//! `bytescope` takes the decoded instruction stream of a single method together with
//! its exception-handler ranges and derives the graphs that coverage-driven test
//! generation needs:
//!
//! - **Control-flow graph** - one node per instruction plus synthetic method-entry and
//!   method-exit sentinels, with exceptional edges into enclosing handlers
//! - **Post-dominator tree** - dominance over the reversed, augmented CFG rooted at
//!   method-exit
//! - **Control-dependence graph** - Ferrante/Ottenstein/Warren construction over the
//!   CFG and its post-dominator tree, rooted at method-entry
//! - **Stack frame layouts** - the operand stack before and after every reachable
//!   instruction, computed as a fixpoint over the CFG
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bytescope::prelude::*;
//!
//! let method = MethodIdentifier::new("com/example/Foo", "abs", "(I)I")?;
//! let mut asm = MethodAssembler::new(method);
//! asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
//! asm.branch(Condition::GreaterOrEqual, "positive")?;
//! asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
//! asm.emit(Operation::Negate(NumericKind::Int))?;
//! asm.emit(Operation::Return(Some(ValueKind::Int)))?;
//! asm.define_label("positive")?;
//! asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
//! asm.emit(Operation::Return(Some(ValueKind::Int)))?;
//! let body = asm.finish()?;
//!
//! let cfg = ControlFlowGraph::compute(body.instructions(), body.handlers())?;
//! let cdg = cfg.cdg()?;
//! let negate = cfg.instruction(3).expect("negation exists");
//! assert_eq!(cdg.immediate_control_dependencies(negate, true)?.len(), 1);
//! # Ok::<(), bytescope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`assembly`] - the instruction model: operations, stack effects, successors,
//!   descriptors, variable tables, handler ranges and a label-resolving assembler
//! - [`utils::graph`] - the generic directed graph, its builder and graph algorithms
//! - [`analysis`] - CFG construction, post-dominance, control dependence, stack frame
//!   layouts and the per-method analysis cache
//!
//! Every graph produced for one method shares the same node numbering, so a
//! [`utils::graph::NodeId`] taken from the CFG is valid in its post-dominator tree and
//! control-dependence graph.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`] carrying [`Error`]. Construction-order
//! mistakes, wrong queries for an operation variant and broken analysis invariants are
//! reported as distinct variants; a query that simply finds nothing returns `None` or an
//! empty collection.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events for graph construction and cache activity but
//! never installs a subscriber.

#[macro_use]
pub(crate) mod error;

pub mod analysis;
pub mod assembly;
pub mod prelude;
pub mod utils;

pub use error::Error;

/// `bytescope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`crate::Error`]. This is used consistently throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
