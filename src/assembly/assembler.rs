//! Label-based construction of method bodies.
//!
//! [`MethodAssembler`] builds the instruction stream of one method the way a decoder
//! would deliver it: instructions numbered by order, branch targets as orders, handler
//! ranges and a local variable table. Branches, handler ranges and variable lifetimes
//! refer to named labels, which are resolved in [`MethodAssembler::finish`].
//!
//! The assembler is the input side for tests, benchmarks and fuzzing; it does not encode
//! bytes.
//!
//! # Examples
//!
//! ```rust
//! use bytescope::assembly::{Condition, MethodAssembler, MethodIdentifier, Operation, ValueKind};
//!
//! let mut asm = MethodAssembler::new(MethodIdentifier::new("a/B", "loop", "(I)V")?);
//! asm.define_label("head")?;
//! asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?;
//! asm.branch(Condition::LessOrEqual, "done")?;
//! asm.emit(Operation::Increment { slot: 0, delta: -1 })?;
//! asm.goto("head")?;
//! asm.define_label("done")?;
//! asm.emit(Operation::Return(None))?;
//!
//! let body = asm.finish()?;
//! assert_eq!(body.instructions().len(), 5);
//! assert_eq!(body.instructions()[3].operation().branch_target(), Some(0));
//! # Ok::<(), bytescope::Error>(())
//! ```

use std::{collections::HashMap, sync::Arc};

use crate::{
    analysis::MethodBody,
    assembly::{
        handler::HandlerRange,
        instruction::{Instruction, MethodIdentifier},
        operation::{Condition, Operation, SwitchKind},
        variables::{VariableLifetime, VariableTable},
    },
    Error, Result,
};

/// An operation whose label operands are not resolved yet.
#[derive(Debug, Clone)]
enum PendingOperation {
    Ready(Operation),
    Branch { condition: Condition, label: String },
    Goto(String),
    Jsr(String),
    Ret(u16),
    Switch {
        kind: SwitchKind,
        default: String,
        cases: Vec<(i32, String)>,
    },
}

#[derive(Debug, Clone)]
struct PendingInstruction {
    line: Option<u32>,
    operation: PendingOperation,
}

/// A handler range awaiting label resolution.
#[derive(Debug, Clone)]
struct HandlerFixup {
    start: String,
    end: String,
    handler: String,
    catch_type: Option<String>,
}

/// A variable lifetime awaiting label resolution.
#[derive(Debug, Clone)]
struct VariableFixup {
    name: String,
    descriptor: String,
    slot: u16,
    start: String,
    end: String,
}

/// Assembles the instruction stream of one method.
///
/// A label names the order of the next emitted instruction. A label defined after the
/// last instruction names the end of the stream: it is valid as the end of a handler
/// range or variable lifetime, but not as a branch target.
#[derive(Debug, Clone)]
pub struct MethodAssembler {
    method: Arc<MethodIdentifier>,
    instructions: Vec<PendingInstruction>,
    labels: HashMap<String, i32>,
    handlers: Vec<HandlerFixup>,
    variables: Vec<VariableFixup>,
    line: Option<u32>,
}

impl MethodAssembler {
    /// Creates an assembler for `method`.
    #[must_use]
    pub fn new(method: MethodIdentifier) -> Self {
        MethodAssembler {
            method: Arc::new(method),
            instructions: Vec::new(),
            labels: HashMap::new(),
            handlers: Vec::new(),
            variables: Vec::new(),
            line: None,
        }
    }

    /// Returns the order the next emitted instruction will get.
    #[must_use]
    pub fn position(&self) -> i32 {
        order_of(self.instructions.len())
    }

    /// Attaches `line` to every instruction emitted from now on.
    pub fn line(&mut self, line: u32) -> &mut Self {
        self.line = Some(line);
        self
    }

    /// Emits an operation whose operands are already resolved and returns its order.
    ///
    /// Branch targets of operations emitted this way are taken as orders verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for the sentinel operations, which every method
    /// graph adds on its own.
    pub fn emit(&mut self, operation: Operation) -> Result<i32> {
        if matches!(operation, Operation::MethodEntry | Operation::MethodExit) {
            return Err(Error::Precondition(format!(
                "{} cannot be emitted into a method body",
                operation.mnemonic()
            )));
        }
        Ok(self.push(PendingOperation::Ready(operation)))
    }

    /// Emits a conditional branch to `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for an empty label. Undefined labels surface in
    /// [`MethodAssembler::finish`].
    pub fn branch(&mut self, condition: Condition, label: &str) -> Result<i32> {
        check_label(label)?;
        Ok(self.push(PendingOperation::Branch {
            condition,
            label: label.to_string(),
        }))
    }

    /// Emits `goto label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for an empty label. Undefined labels surface in
    /// [`MethodAssembler::finish`].
    pub fn goto(&mut self, label: &str) -> Result<i32> {
        check_label(label)?;
        Ok(self.push(PendingOperation::Goto(label.to_string())))
    }

    /// Emits `jsr label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for an empty label. Undefined labels surface in
    /// [`MethodAssembler::finish`].
    pub fn jsr(&mut self, label: &str) -> Result<i32> {
        check_label(label)?;
        Ok(self.push(PendingOperation::Jsr(label.to_string())))
    }

    /// Emits `ret slot`. Its targets are the instructions following every `jsr`.
    pub fn ret(&mut self, slot: u16) -> i32 {
        self.push(PendingOperation::Ret(slot))
    }

    /// Emits a switch over `(key, label)` cases.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if a `tableswitch` has no cases or its keys are not
    /// consecutive.
    pub fn switch(&mut self, kind: SwitchKind, default: &str, cases: &[(i32, &str)]) -> Result<i32> {
        if kind == SwitchKind::Table {
            if cases.is_empty() {
                return Err(Error::Precondition("tableswitch needs at least one case".to_string()));
            }
            if cases.windows(2).any(|pair| pair[1].0 != pair[0].0.wrapping_add(1)) {
                return Err(Error::Precondition("tableswitch keys must be consecutive".to_string()));
            }
        }
        Ok(self.push(PendingOperation::Switch {
            kind,
            default: default.to_string(),
            cases: cases.iter().map(|&(key, label)| (key, label.to_string())).collect(),
        }))
    }

    /// Defines `name` at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLabel`] if `name` is already defined and
    /// [`Error::Precondition`] if it is empty.
    pub fn define_label(&mut self, name: &str) -> Result<()> {
        check_label(name)?;
        if self.labels.contains_key(name) {
            return Err(Error::DuplicateLabel(name.to_string()));
        }
        self.labels.insert(name.to_string(), self.position());
        Ok(())
    }

    /// Protects `[start, end)` with the handler at `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for an empty label. Undefined labels surface in
    /// [`MethodAssembler::finish`].
    pub fn try_catch(
        &mut self,
        start: &str,
        end: &str,
        handler: &str,
        catch_type: Option<&str>,
    ) -> Result<()> {
        for label in [start, end, handler] {
            check_label(label)?;
        }
        self.handlers.push(HandlerFixup {
            start: start.to_string(),
            end: end.to_string(),
            handler: handler.to_string(),
            catch_type: catch_type.map(str::to_string),
        });
        Ok(())
    }

    /// Declares a local variable live on `[start, end)`.
    pub fn local_variable(&mut self, name: &str, descriptor: &str, slot: u16, start: &str, end: &str) {
        self.variables.push(VariableFixup {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            slot,
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    /// Resolves all labels and produces the method body.
    ///
    /// Instruction labels are the rendered operations, e.g. `iload_0` or `goto 4`.
    ///
    /// # Errors
    ///
    /// - [`Error::UndefinedLabel`] for a reference to a label that was never defined
    /// - [`Error::Precondition`] for a branch to the end of the stream or an invalid
    ///   handler range or variable lifetime
    /// - [`Error::MalformedDescriptor`] for an invalid variable descriptor
    pub fn finish(self) -> Result<MethodBody> {
        let len = order_of(self.instructions.len());
        let subroutine_returns: Vec<i32> = self
            .instructions
            .iter()
            .enumerate()
            .filter(|(_, pending)| matches!(pending.operation, PendingOperation::Jsr(_)))
            .map(|(index, _)| order_of(index) + 1)
            .collect();

        let mut instructions = Vec::with_capacity(self.instructions.len());
        for (index, pending) in self.instructions.iter().enumerate() {
            let operation = match &pending.operation {
                PendingOperation::Ready(operation) => operation.clone(),
                PendingOperation::Branch { condition, label } => Operation::Branch {
                    condition: *condition,
                    target: self.target(label, len)?,
                },
                PendingOperation::Goto(label) => Operation::Goto {
                    target: self.target(label, len)?,
                },
                PendingOperation::Jsr(label) => Operation::JumpSubroutine {
                    target: self.target(label, len)?,
                },
                PendingOperation::Ret(slot) => Operation::ReturnFromSubroutine {
                    slot: *slot,
                    targets: subroutine_returns.clone(),
                },
                PendingOperation::Switch {
                    kind,
                    default,
                    cases,
                } => Operation::Switch {
                    kind: *kind,
                    default: self.target(default, len)?,
                    cases: cases
                        .iter()
                        .map(|(key, label)| Ok((*key, self.target(label, len)?)))
                        .collect::<Result<Vec<_>>>()?,
                },
            };

            let label = operation.to_string();
            let mut instruction = Instruction::new(self.method.clone(), order_of(index), label, operation)?;
            if let Some(line) = pending.line {
                instruction = instruction.with_line(line);
            }
            instructions.push(Arc::new(instruction));
        }

        let mut handlers = Vec::with_capacity(self.handlers.len());
        for fixup in &self.handlers {
            handlers.push(HandlerRange::new(
                self.resolve(&fixup.start)?,
                self.resolve(&fixup.end)?,
                self.target(&fixup.handler, len)?,
                fixup.catch_type.clone(),
            )?);
        }

        let mut variables = VariableTable::new();
        for fixup in &self.variables {
            variables.push(VariableLifetime::new(
                fixup.name.as_str(),
                fixup.descriptor.as_str(),
                fixup.slot,
                self.resolve(&fixup.start)?,
                self.resolve(&fixup.end)?,
            )?);
        }

        Ok(MethodBody::new(self.method, instructions, handlers, variables))
    }

    fn push(&mut self, operation: PendingOperation) -> i32 {
        let order = self.position();
        self.instructions.push(PendingInstruction {
            line: self.line,
            operation,
        });
        order
    }

    fn resolve(&self, label: &str) -> Result<i32> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| Error::UndefinedLabel(label.to_string()))
    }

    fn target(&self, label: &str, len: i32) -> Result<i32> {
        let order = self.resolve(label)?;
        if order >= len {
            return Err(Error::Precondition(format!(
                "label '{label}' marks the end of the method and cannot be jumped to"
            )));
        }
        Ok(order)
    }
}

fn check_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::Precondition("labels must not be empty".to_string()));
    }
    Ok(())
}

fn order_of(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}
