//! Instructions and method identifiers.
//!
//! An [`Instruction`] is one position in the linear instruction stream of a method. It
//! pairs an [`Operation`] with the identity data used for equality: the owning method,
//! the source line, a human-readable label and the 0-based `order`.
//!
//! Every method graph additionally contains two synthetic instructions: method-entry at
//! [`METHOD_ENTRY_ORDER`] and method-exit at [`METHOD_EXIT_ORDER`]. Both orders are
//! negative and can never collide with a real instruction.
//!
//! Instructions are immutable once created. Graphs hold them as `Arc<Instruction>` so
//! that the CFG, PDT and CDG of a method all reference the same values.

use std::{
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    assembly::{
        descriptor::MethodDescriptor,
        handler::HandlerRange,
        operation::{FlowType, Operation, OperationFlags, ValueKind},
        stack::{StackManipulation, StackType},
        variables::VariableTable,
    },
    utils::graph::Ordered,
    Error, Result,
};

/// Order of the synthetic method-entry instruction.
pub const METHOD_ENTRY_ORDER: i32 = -1;

/// Order of the synthetic method-exit instruction.
pub const METHOD_EXIT_ORDER: i32 = -2;

/// Fully qualified identity of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodIdentifier {
    class_name: String,
    method_name: String,
    descriptor: String,
}

impl MethodIdentifier {
    /// Creates a method identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if any of the three parts is empty.
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Result<Self> {
        let id = MethodIdentifier {
            class_name: class_name.into(),
            method_name: method_name.into(),
            descriptor: descriptor.into(),
        };
        for (part, value) in [
            ("class name", &id.class_name),
            ("method name", &id.method_name),
            ("descriptor", &id.descriptor),
        ] {
            if value.is_empty() {
                return Err(Error::Precondition(format!("method {part} must not be empty")));
            }
        }
        Ok(id)
    }

    /// Internal name of the declaring class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Method name.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Method descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Parses the method descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDescriptor`] if the descriptor is malformed.
    pub fn parsed_descriptor(&self) -> Result<MethodDescriptor> {
        MethodDescriptor::parse(&self.descriptor)
    }
}

impl fmt::Display for MethodIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class_name, self.method_name, self.descriptor)
    }
}

/// One instruction of a method.
///
/// Two instructions are equal iff owning class, owning method name, line, label and order
/// all match. The operation and the method descriptor do not take part in equality.
#[derive(Clone)]
pub struct Instruction {
    method: Arc<MethodIdentifier>,
    line: Option<u32>,
    label: String,
    order: i32,
    operation: Operation,
}

impl Instruction {
    /// Creates a real instruction at `order`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if the label is empty, the order is negative, or
    /// `operation` is one of the sentinels (use [`Instruction::method_entry`] and
    /// [`Instruction::method_exit`] instead).
    pub fn new(
        method: Arc<MethodIdentifier>,
        order: i32,
        label: impl Into<String>,
        operation: Operation,
    ) -> Result<Self> {
        let label = label.into();
        if label.is_empty() {
            return Err(Error::Precondition(format!(
                "instruction {order} of {method} has an empty label"
            )));
        }
        if order < 0 {
            return Err(Error::Precondition(format!(
                "instruction order {order} is reserved for sentinels"
            )));
        }
        if matches!(operation, Operation::MethodEntry | Operation::MethodExit) {
            return Err(Error::Precondition(
                "sentinel operations are created by Instruction::method_entry/method_exit"
                    .to_string(),
            ));
        }

        Ok(Instruction {
            method,
            line: None,
            label,
            order,
            operation,
        })
    }

    /// Returns this instruction with a source line attached.
    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Creates the method-entry sentinel of `method`.
    #[must_use]
    pub fn method_entry(method: Arc<MethodIdentifier>) -> Self {
        Instruction {
            method,
            line: None,
            label: Operation::MethodEntry.to_string(),
            order: METHOD_ENTRY_ORDER,
            operation: Operation::MethodEntry,
        }
    }

    /// Creates the method-exit sentinel of `method`.
    #[must_use]
    pub fn method_exit(method: Arc<MethodIdentifier>) -> Self {
        Instruction {
            method,
            line: None,
            label: Operation::MethodExit.to_string(),
            order: METHOD_EXIT_ORDER,
            operation: Operation::MethodExit,
        }
    }

    /// The owning method.
    #[must_use]
    pub fn method(&self) -> &Arc<MethodIdentifier> {
        &self.method
    }

    /// Internal name of the owning class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        self.method.class_name()
    }

    /// Name of the owning method.
    #[must_use]
    pub fn method_name(&self) -> &str {
        self.method.method_name()
    }

    /// Descriptor of the owning method.
    #[must_use]
    pub fn descriptor(&self) -> &str {
        self.method.descriptor()
    }

    /// Source line, if known.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Position in the instruction stream.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// The operation.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// JVM opcode of the operation.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.operation.opcode()
    }

    /// Returns `true` for the method-entry sentinel.
    #[must_use]
    pub fn is_method_entry(&self) -> bool {
        matches!(self.operation, Operation::MethodEntry)
    }

    /// Returns `true` for the method-exit sentinel.
    #[must_use]
    pub fn is_method_exit(&self) -> bool {
        matches!(self.operation, Operation::MethodExit)
    }

    /// Returns `true` for either sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.is_method_entry() || self.is_method_exit()
    }

    /// See [`Operation::flow`].
    #[must_use]
    pub fn flow(&self) -> FlowType {
        self.operation.flow()
    }

    /// See [`Operation::flags`].
    #[must_use]
    pub fn flags(&self) -> OperationFlags {
        self.operation.flags()
    }

    /// Successor orders by the handler-less rule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] for `athrow`.
    pub fn successors(&self) -> Result<Vec<i32>> {
        self.operation.successors(self.order)
    }

    /// Successor orders including enclosing exception handlers.
    ///
    /// # Errors
    ///
    /// See [`Operation::successors_with_handlers`].
    pub fn successors_with_handlers(&self, handlers: &[HandlerRange]) -> Result<Vec<i32>> {
        self.operation.successors_with_handlers(self.order, handlers)
    }

    /// Consumed stack values, bottom to top.
    ///
    /// With a variable table, a reference store reports the declared type of its target
    /// slot.
    ///
    /// # Errors
    ///
    /// See [`Operation::consumed_from_stack`].
    pub fn consumed_from_stack(&self, variables: Option<&VariableTable>) -> Result<Vec<StackType>> {
        let mut consumed = self.operation.consumed_from_stack()?;
        if let Operation::Store {
            kind: ValueKind::Reference,
            slot,
        } = self.operation
        {
            if let (Some(declared), Some(value)) = (self.declared_type(variables, slot), consumed.last_mut()) {
                *value = declared;
            }
        }
        Ok(consumed)
    }

    /// Pushed stack value, [`StackType::Void`] if nothing is pushed.
    ///
    /// With a variable table, a reference load reports the declared type of its slot.
    ///
    /// # Errors
    ///
    /// See [`Operation::pushed_to_stack`].
    pub fn pushed_to_stack(&self, variables: Option<&VariableTable>) -> Result<StackType> {
        if let Operation::Load {
            kind: ValueKind::Reference,
            slot,
        } = self.operation
        {
            if let Some(declared) = self.declared_type(variables, slot) {
                return Ok(declared);
            }
        }
        self.operation.pushed_to_stack()
    }

    /// The full stack effect, refined by `variables` where applicable.
    ///
    /// # Errors
    ///
    /// See [`Operation::stack_manipulation`].
    pub fn stack_manipulation(
        &self,
        variables: Option<&VariableTable>,
        successor_is_handler: bool,
    ) -> Result<StackManipulation> {
        match self.operation.stack_manipulation(successor_is_handler)? {
            StackManipulation::Uniform { .. } => Ok(StackManipulation::uniform(
                self.consumed_from_stack(variables)?,
                self.pushed_to_stack(variables)?,
            )),
            other => Ok(other),
        }
    }

    /// Local variable slots read.
    #[must_use]
    pub fn reads_variables(&self) -> BTreeSet<u16> {
        self.operation.reads_variables()
    }

    /// Local variable slots overwritten.
    #[must_use]
    pub fn writes_variables(&self) -> BTreeSet<u16> {
        self.operation.writes_variables()
    }

    /// Returns `true` if local variable `index` is overwritten.
    #[must_use]
    pub fn writes_variable(&self, index: u16) -> bool {
        self.operation.writes_variable(index)
    }

    fn declared_type(&self, variables: Option<&VariableTable>, slot: u16) -> Option<StackType> {
        variables?
            .type_at(slot, self.order)
            .filter(|declared| matches!(declared, StackType::Reference(_)))
            .cloned()
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
            && self.line == other.line
            && self.label == other.label
            && self.method.class_name() == other.method.class_name()
            && self.method.method_name() == other.method.method_name()
    }
}

impl Eq for Instruction {}

impl Hash for Instruction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method.class_name().hash(state);
        self.method.method_name().hash(state);
        self.line.hash(state);
        self.label.hash(state);
        self.order.hash(state);
    }
}

impl Ordered for Instruction {
    fn order(&self) -> i32 {
        self.order
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("method", &format_args!("{}", self.method))
            .field("order", &self.order)
            .field("label", &self.label)
            .field("line", &self.line)
            .finish()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: {} (line {line})", self.order, self.label),
            None => write!(f, "{}: {}", self.order, self.label),
        }
    }
}
