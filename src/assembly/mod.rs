//! The JVM instruction model.
//!
//! This module defines what the analysis layer consumes: one [`Instruction`] per position
//! of a method's instruction stream, the [`HandlerRange`]s protecting parts of it and the
//! [`VariableTable`] of declared local variable types.
//!
//! # Architecture
//!
//! - [`operation`] - the closed [`Operation`] enum with opcode, stack-effect, variable and
//!   successor queries per variant
//! - [`instruction`] - [`Instruction`] identity, the method-entry/method-exit sentinels and
//!   [`MethodIdentifier`]
//! - [`stack`] - stack types, [`StackManipulation`] and the simulated [`TypeStack`]
//! - [`descriptor`] - JVM field and method descriptor parsing
//! - [`handler`] - exception handler ranges
//! - [`variables`] - local variable lifetimes
//! - [`opcodes`] - opcode constants and mnemonics
//! - [`assembler`] - [`MethodAssembler`], a label-resolving builder for method bodies
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use bytescope::assembly::{HandlerRange, Instruction, MethodIdentifier, Operation};
//!
//! let method = Arc::new(MethodIdentifier::new("a/B", "fail", "()V")?);
//! let throw = Instruction::new(method, 5, "athrow", Operation::Throw)?;
//! let handlers = [HandlerRange::new(2, 10, 7, None)?];
//!
//! assert!(throw.successors().is_err());
//! assert_eq!(throw.successors_with_handlers(&handlers)?, vec![-2, 7]);
//! # Ok::<(), bytescope::Error>(())
//! ```

pub mod assembler;
pub mod descriptor;
pub mod handler;
pub mod instruction;
pub mod opcodes;
pub mod operation;
pub mod stack;
pub mod variables;

pub use assembler::MethodAssembler;
pub use descriptor::{parse_field_type, MethodDescriptor};
pub use handler::HandlerRange;
pub use instruction::{Instruction, MethodIdentifier, METHOD_ENTRY_ORDER, METHOD_EXIT_ORDER};
pub use operation::{
    ArithmeticOp, ArrayKind, BitwiseOp, Comparison, Condition, Constant, Conversion,
    FieldAccess, FlowType, IntegralKind, InvokeKind, MonitorKind, NumericKind, Operation,
    OperationFlags, SwitchKind, ValueKind,
};
pub use stack::{merge_values, StackManipulation, StackShuffle, StackType, TypeStack, OBJECT, THROWABLE};
pub use variables::{VariableLifetime, VariableTable};
