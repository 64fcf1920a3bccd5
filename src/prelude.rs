//! # bytescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the bytescope library. Import this module to get quick access to the essential
//! types for building and analysing method instruction graphs.
//!
//! ```rust
//! use bytescope::prelude::*;
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all bytescope operations
pub use crate::Error;

/// The result type used throughout bytescope
pub use crate::Result;

// ================================================================================================
// Instruction Model
// ================================================================================================

/// Method identity and instructions
pub use crate::assembly::{Instruction, MethodIdentifier, METHOD_ENTRY_ORDER, METHOD_EXIT_ORDER};

/// The closed set of operations and their operands
pub use crate::assembly::{
    ArithmeticOp, ArrayKind, BitwiseOp, Comparison, Condition, Constant, Conversion,
    FieldAccess, FlowType, IntegralKind, InvokeKind, MonitorKind, NumericKind, Operation,
    OperationFlags, SwitchKind, ValueKind,
};

/// Operand stack simulation
pub use crate::assembly::{StackManipulation, StackShuffle, StackType, TypeStack, OBJECT, THROWABLE};

/// Exception handler ranges and local variable tables
pub use crate::assembly::{HandlerRange, VariableLifetime, VariableTable};

/// Descriptor parsing
pub use crate::assembly::{parse_field_type, MethodDescriptor};

/// Label-resolving instruction stream builder
pub use crate::assembly::MethodAssembler;

// ================================================================================================
// Analysis
// ================================================================================================

/// Control flow graph and edge classification
pub use crate::analysis::{CfgEdgeKind, ControlFlowGraph, InstructionGraph};

/// Post-dominance and control dependence
pub use crate::analysis::{ControlDependenceGraph, PostDominatorTree};

/// Operand stack frame layouts
pub use crate::analysis::{FrameLayout, StackFrames};

/// Method bodies, their sources and the shared graph cache
pub use crate::analysis::{AnalysisCache, InstructionSource, MethodBody};

/// Analysis configuration
pub use crate::analysis::{AnalysisConfig, UnreachablePolicy};

// ================================================================================================
// Graph Infrastructure
// ================================================================================================

/// Directed graphs and their builder
pub use crate::utils::graph::{DirectedGraph, DirectedGraphBuilder, Edge, EdgeId, NodeId};

/// Graph traits consumed by the generic algorithms
pub use crate::utils::graph::{
    GraphBase, Ordered, Predecessors, RootedGraph, Successors, WeightedSuccessors,
};
