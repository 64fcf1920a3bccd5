//! The closed set of JVM operations and their per-variant semantics.
//!
//! [`Operation`] has one variant per instruction kind. Each variant carries only the
//! operands it needs, and all behavior is defined by matching on the variant:
//!
//! - **Encoding** - [`Operation::opcode`] and [`Operation::mnemonic`]
//! - **Stack effect** - [`Operation::consumed_from_stack`], [`Operation::pushed_to_stack`]
//!   and [`Operation::stack_manipulation`]
//! - **Variables** - [`Operation::reads_variables`] and [`Operation::writes_variables`]
//! - **Control flow** - [`Operation::successors`] and
//!   [`Operation::successors_with_handlers`]
//!
//! Queries that have no meaningful answer for a variant fail with
//! [`Error::Unsupported`] instead of returning a misleading default. For example,
//! `athrow` has no plain consume/push signature because it discards the whole stack,
//! and its successors cannot be computed without the enclosing handler ranges.
//!
//! Branch targets are instruction *orders*, not byte offsets.
//!
//! # Examples
//!
//! ```rust
//! use bytescope::assembly::{Condition, Operation, StackType};
//!
//! let branch = Operation::Branch { condition: Condition::IntLess, target: 9 };
//! assert_eq!(branch.mnemonic(), "if_icmplt");
//! assert_eq!(branch.consumed_from_stack()?, vec![StackType::Int, StackType::Int]);
//! assert_eq!(branch.successors(4)?, vec![5, 9]);
//! # Ok::<(), bytescope::Error>(())
//! ```

use std::{collections::BTreeSet, fmt};

use bitflags::bitflags;
use strum::{EnumIter, IntoStaticStr};

use crate::{
    assembly::{
        descriptor::{parse_field_type, MethodDescriptor},
        handler::HandlerRange,
        instruction::{METHOD_ENTRY_ORDER, METHOD_EXIT_ORDER},
        opcodes,
        stack::{StackManipulation, StackShuffle, StackType, THROWABLE},
    },
    Error, Result,
};

/// Value kinds of the typed load, store and return instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ValueKind {
    /// `i` prefix
    Int,
    /// `l` prefix
    Long,
    /// `f` prefix
    Float,
    /// `d` prefix
    Double,
    /// `a` prefix
    Reference,
}

impl ValueKind {
    /// Returns the stack type of a value of this kind.
    #[must_use]
    pub fn stack_type(self) -> StackType {
        match self {
            ValueKind::Int => StackType::Int,
            ValueKind::Long => StackType::Long,
            ValueKind::Float => StackType::Float,
            ValueKind::Double => StackType::Double,
            ValueKind::Reference => StackType::Reference(None),
        }
    }

    /// Returns `true` for kinds that occupy two local variable slots.
    #[must_use]
    pub fn is_wide(self) -> bool {
        matches!(self, ValueKind::Long | ValueKind::Double)
    }

    fn index(self) -> u8 {
        match self {
            ValueKind::Int => 0,
            ValueKind::Long => 1,
            ValueKind::Float => 2,
            ValueKind::Double => 3,
            ValueKind::Reference => 4,
        }
    }
}

/// Operand kinds of the arithmetic and negation instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum NumericKind {
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl NumericKind {
    /// Returns the stack type of a value of this kind.
    #[must_use]
    pub fn stack_type(self) -> StackType {
        match self {
            NumericKind::Int => StackType::Int,
            NumericKind::Long => StackType::Long,
            NumericKind::Float => StackType::Float,
            NumericKind::Double => StackType::Double,
        }
    }

    fn index(self) -> u8 {
        match self {
            NumericKind::Int => 0,
            NumericKind::Long => 1,
            NumericKind::Float => 2,
            NumericKind::Double => 3,
        }
    }
}

/// Operand kinds of the shift and bitwise instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum IntegralKind {
    /// `int`
    Int,
    /// `long`
    Long,
}

impl IntegralKind {
    /// Returns the stack type of a value of this kind.
    #[must_use]
    pub fn stack_type(self) -> StackType {
        match self {
            IntegralKind::Int => StackType::Int,
            IntegralKind::Long => StackType::Long,
        }
    }
}

/// Element kinds of primitive and reference arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ArrayKind {
    /// `boolean[]`, shares `baload`/`bastore` with `byte[]`
    Boolean,
    /// `byte[]`
    Byte,
    /// `char[]`
    Char,
    /// `short[]`
    Short,
    /// `int[]`
    Int,
    /// `long[]`
    Long,
    /// `float[]`
    Float,
    /// `double[]`
    Double,
    /// Arrays of references
    Reference,
}

impl ArrayKind {
    /// Returns the stack type of an element loaded from such an array.
    #[must_use]
    pub fn element_type(self) -> StackType {
        match self {
            ArrayKind::Boolean
            | ArrayKind::Byte
            | ArrayKind::Char
            | ArrayKind::Short
            | ArrayKind::Int => StackType::Int,
            ArrayKind::Long => StackType::Long,
            ArrayKind::Float => StackType::Float,
            ArrayKind::Double => StackType::Double,
            ArrayKind::Reference => StackType::Reference(None),
        }
    }

    /// Returns the array descriptor, e.g. `[Z`.
    #[must_use]
    pub fn array_descriptor(self) -> &'static str {
        match self {
            ArrayKind::Boolean => "[Z",
            ArrayKind::Byte => "[B",
            ArrayKind::Char => "[C",
            ArrayKind::Short => "[S",
            ArrayKind::Int => "[I",
            ArrayKind::Long => "[J",
            ArrayKind::Float => "[F",
            ArrayKind::Double => "[D",
            ArrayKind::Reference => "[Ljava/lang/Object;",
        }
    }

    /// Returns the `atype` operand of `newarray`, `None` for reference arrays.
    #[must_use]
    pub fn atype(self) -> Option<u8> {
        match self {
            ArrayKind::Boolean => Some(4),
            ArrayKind::Char => Some(5),
            ArrayKind::Float => Some(6),
            ArrayKind::Double => Some(7),
            ArrayKind::Byte => Some(8),
            ArrayKind::Short => Some(9),
            ArrayKind::Int => Some(10),
            ArrayKind::Long => Some(11),
            ArrayKind::Reference => None,
        }
    }

    fn load_opcode(self) -> u8 {
        match self {
            ArrayKind::Int => opcodes::IALOAD,
            ArrayKind::Long => opcodes::LALOAD,
            ArrayKind::Float => opcodes::FALOAD,
            ArrayKind::Double => opcodes::DALOAD,
            ArrayKind::Reference => opcodes::AALOAD,
            ArrayKind::Boolean | ArrayKind::Byte => opcodes::BALOAD,
            ArrayKind::Char => opcodes::CALOAD,
            ArrayKind::Short => opcodes::SALOAD,
        }
    }

    fn store_opcode(self) -> u8 {
        self.load_opcode() + (opcodes::IASTORE - opcodes::IALOAD)
    }
}

/// The two-operand arithmetic instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ArithmeticOp {
    /// `add`
    Add,
    /// `sub`
    Sub,
    /// `mul`
    Mul,
    /// `div`
    Div,
    /// `rem`
    Rem,
}

/// The shift and bitwise instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum BitwiseOp {
    /// `shl`
    Shl,
    /// `shr`
    Shr,
    /// `ushr`
    Ushr,
    /// `and`
    And,
    /// `or`
    Or,
    /// `xor`
    Xor,
}

impl BitwiseOp {
    /// Returns `true` for shifts, whose distance operand is always an `int`.
    #[must_use]
    pub fn is_shift(self) -> bool {
        matches!(self, BitwiseOp::Shl | BitwiseOp::Shr | BitwiseOp::Ushr)
    }
}

/// The primitive conversions `i2l` through `i2s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Conversion {
    /// `i2l`
    IntToLong,
    /// `i2f`
    IntToFloat,
    /// `i2d`
    IntToDouble,
    /// `l2i`
    LongToInt,
    /// `l2f`
    LongToFloat,
    /// `l2d`
    LongToDouble,
    /// `f2i`
    FloatToInt,
    /// `f2l`
    FloatToLong,
    /// `f2d`
    FloatToDouble,
    /// `d2i`
    DoubleToInt,
    /// `d2l`
    DoubleToLong,
    /// `d2f`
    DoubleToFloat,
    /// `i2b`
    IntToByte,
    /// `i2c`
    IntToChar,
    /// `i2s`
    IntToShort,
}

impl Conversion {
    /// Returns the consumed type.
    #[must_use]
    pub fn source(self) -> StackType {
        match self {
            Conversion::IntToLong
            | Conversion::IntToFloat
            | Conversion::IntToDouble
            | Conversion::IntToByte
            | Conversion::IntToChar
            | Conversion::IntToShort => StackType::Int,
            Conversion::LongToInt | Conversion::LongToFloat | Conversion::LongToDouble => {
                StackType::Long
            }
            Conversion::FloatToInt | Conversion::FloatToLong | Conversion::FloatToDouble => {
                StackType::Float
            }
            Conversion::DoubleToInt | Conversion::DoubleToLong | Conversion::DoubleToFloat => {
                StackType::Double
            }
        }
    }

    /// Returns the pushed type.
    #[must_use]
    pub fn target(self) -> StackType {
        match self {
            Conversion::LongToInt
            | Conversion::FloatToInt
            | Conversion::DoubleToInt
            | Conversion::IntToByte
            | Conversion::IntToChar
            | Conversion::IntToShort => StackType::Int,
            Conversion::IntToLong | Conversion::FloatToLong | Conversion::DoubleToLong => {
                StackType::Long
            }
            Conversion::IntToFloat | Conversion::LongToFloat | Conversion::DoubleToFloat => {
                StackType::Float
            }
            Conversion::IntToDouble | Conversion::LongToDouble | Conversion::FloatToDouble => {
                StackType::Double
            }
        }
    }

    fn opcode(self) -> u8 {
        match self {
            Conversion::IntToLong => opcodes::I2L,
            Conversion::IntToFloat => opcodes::I2F,
            Conversion::IntToDouble => opcodes::I2D,
            Conversion::LongToInt => opcodes::L2I,
            Conversion::LongToFloat => opcodes::L2F,
            Conversion::LongToDouble => opcodes::L2D,
            Conversion::FloatToInt => opcodes::F2I,
            Conversion::FloatToLong => opcodes::F2L,
            Conversion::FloatToDouble => opcodes::F2D,
            Conversion::DoubleToInt => opcodes::D2I,
            Conversion::DoubleToLong => opcodes::D2L,
            Conversion::DoubleToFloat => opcodes::D2F,
            Conversion::IntToByte => opcodes::I2B,
            Conversion::IntToChar => opcodes::I2C,
            Conversion::IntToShort => opcodes::I2S,
        }
    }
}

/// The comparisons that push `-1`, `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Comparison {
    /// `lcmp`
    Long,
    /// `fcmpl`, NaN compares as less
    FloatNanLess,
    /// `fcmpg`, NaN compares as greater
    FloatNanGreater,
    /// `dcmpl`
    DoubleNanLess,
    /// `dcmpg`
    DoubleNanGreater,
}

impl Comparison {
    fn operand(self) -> StackType {
        match self {
            Comparison::Long => StackType::Long,
            Comparison::FloatNanLess | Comparison::FloatNanGreater => StackType::Float,
            Comparison::DoubleNanLess | Comparison::DoubleNanGreater => StackType::Double,
        }
    }
}

/// Conditions of the conditional branch instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Condition {
    /// `ifeq`
    Equal,
    /// `ifne`
    NotEqual,
    /// `iflt`
    Less,
    /// `ifge`
    GreaterOrEqual,
    /// `ifgt`
    Greater,
    /// `ifle`
    LessOrEqual,
    /// `if_icmpeq`
    IntEqual,
    /// `if_icmpne`
    IntNotEqual,
    /// `if_icmplt`
    IntLess,
    /// `if_icmpge`
    IntGreaterOrEqual,
    /// `if_icmpgt`
    IntGreater,
    /// `if_icmple`
    IntLessOrEqual,
    /// `if_acmpeq`
    RefEqual,
    /// `if_acmpne`
    RefNotEqual,
    /// `ifnull`
    Null,
    /// `ifnonnull`
    NonNull,
}

impl Condition {
    /// Returns the consumed operand constraints, bottom to top.
    #[must_use]
    pub fn operands(self) -> Vec<StackType> {
        match self {
            Condition::Equal
            | Condition::NotEqual
            | Condition::Less
            | Condition::GreaterOrEqual
            | Condition::Greater
            | Condition::LessOrEqual => vec![StackType::Int],
            Condition::IntEqual
            | Condition::IntNotEqual
            | Condition::IntLess
            | Condition::IntGreaterOrEqual
            | Condition::IntGreater
            | Condition::IntLessOrEqual => vec![StackType::Int, StackType::Int],
            Condition::RefEqual | Condition::RefNotEqual => {
                vec![StackType::Reference(None), StackType::Reference(None)]
            }
            Condition::Null | Condition::NonNull => vec![StackType::Reference(None)],
        }
    }

    fn opcode(self) -> u8 {
        match self {
            Condition::Equal => opcodes::IFEQ,
            Condition::NotEqual => opcodes::IFNE,
            Condition::Less => opcodes::IFLT,
            Condition::GreaterOrEqual => opcodes::IFGE,
            Condition::Greater => opcodes::IFGT,
            Condition::LessOrEqual => opcodes::IFLE,
            Condition::IntEqual => opcodes::IF_ICMPEQ,
            Condition::IntNotEqual => opcodes::IF_ICMPNE,
            Condition::IntLess => opcodes::IF_ICMPLT,
            Condition::IntGreaterOrEqual => opcodes::IF_ICMPGE,
            Condition::IntGreater => opcodes::IF_ICMPGT,
            Condition::IntLessOrEqual => opcodes::IF_ICMPLE,
            Condition::RefEqual => opcodes::IF_ACMPEQ,
            Condition::RefNotEqual => opcodes::IF_ACMPNE,
            Condition::Null => opcodes::IFNULL,
            Condition::NonNull => opcodes::IFNONNULL,
        }
    }
}

/// The two switch encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchKind {
    /// `tableswitch`, dense keys
    Table,
    /// `lookupswitch`, sparse keys
    Lookup,
}

/// Field access instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum FieldAccess {
    /// `getstatic`
    GetStatic,
    /// `putstatic`
    PutStatic,
    /// `getfield`
    GetField,
    /// `putfield`
    PutField,
}

/// Method invocation instructions, except `invokedynamic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum InvokeKind {
    /// `invokevirtual`
    Virtual,
    /// `invokespecial`
    Special,
    /// `invokestatic`
    Static,
    /// `invokeinterface`
    Interface,
}

/// `monitorenter` and `monitorexit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorKind {
    /// `monitorenter`
    Enter,
    /// `monitorexit`
    Exit,
}

/// A constant pushed by `aconst_null`, the `*const_*` family, `bipush`, `sipush` or `ldc`.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `null`
    Null,
    /// An `int` constant
    Int(i32),
    /// A `long` constant
    Long(i64),
    /// A `float` constant
    Float(f32),
    /// A `double` constant
    Double(f64),
    /// A string literal
    String(String),
    /// A class literal, by internal name
    Class(String),
}

impl Constant {
    /// Returns the stack type of the pushed value.
    #[must_use]
    pub fn stack_type(&self) -> StackType {
        match self {
            Constant::Null => StackType::Reference(None),
            Constant::Int(_) => StackType::Int,
            Constant::Long(_) => StackType::Long,
            Constant::Float(_) => StackType::Float,
            Constant::Double(_) => StackType::Double,
            Constant::String(_) => StackType::reference("java/lang/String"),
            Constant::Class(_) => StackType::reference("java/lang/Class"),
        }
    }

    /// Returns the shortest opcode that pushes this constant.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Constant::Null => opcodes::ACONST_NULL,
            Constant::Int(value @ -1..=5) => (i32::from(opcodes::ICONST_0) + value) as u8,
            Constant::Int(value) if i8::try_from(*value).is_ok() => opcodes::BIPUSH,
            Constant::Int(value) if i16::try_from(*value).is_ok() => opcodes::SIPUSH,
            Constant::Long(0) => opcodes::LCONST_0,
            Constant::Long(1) => opcodes::LCONST_1,
            Constant::Long(_) => opcodes::LDC2_W,
            Constant::Double(value) => match value.to_bits() {
                bits if bits == 0.0f64.to_bits() => opcodes::DCONST_0,
                bits if bits == 1.0f64.to_bits() => opcodes::DCONST_1,
                _ => opcodes::LDC2_W,
            },
            Constant::Float(value) => match value.to_bits() {
                bits if bits == 0.0f32.to_bits() => opcodes::FCONST_0,
                bits if bits == 1.0f32.to_bits() => opcodes::FCONST_1,
                bits if bits == 2.0f32.to_bits() => opcodes::FCONST_2,
                _ => opcodes::LDC,
            },
            Constant::Int(_) | Constant::String(_) | Constant::Class(_) => opcodes::LDC,
        }
    }

    fn has_operand(&self) -> bool {
        matches!(
            self.opcode(),
            opcodes::BIPUSH | opcodes::SIPUSH | opcodes::LDC | opcodes::LDC2_W
        )
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "null"),
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Long(value) => write!(f, "{value}L"),
            Constant::Float(value) => write!(f, "{value}F"),
            Constant::Double(value) => write!(f, "{value}D"),
            Constant::String(value) => write!(f, "{value:?}"),
            Constant::Class(name) => write!(f, "{name}.class"),
        }
    }
}

/// Coarse control-flow behavior of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowType {
    /// Execution continues at the next instruction
    Sequential,
    /// Either the next instruction or the branch target
    ConditionalBranch,
    /// Always the branch target
    UnconditionalBranch,
    /// `jsr`, enters a subroutine
    Subroutine,
    /// `ret`, leaves a subroutine
    SubroutineReturn,
    /// Multi-way branch
    Switch,
    /// Leaves the method normally
    Return,
    /// Raises an exception
    Throw,
    /// The method-entry sentinel
    Entry,
    /// The method-exit sentinel
    Exit,
}

bitflags! {
    /// Summary properties of an operation, for quick filtering.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OperationFlags: u16 {
        /// Transfers control somewhere other than the next instruction
        const BRANCH = 0x0001;
        /// The transfer depends on a runtime value
        const CONDITIONAL = 0x0002;
        /// Never falls through to the next instruction
        const TERMINAL = 0x0004;
        /// Successors depend on the enclosing handler ranges
        const THROWS = 0x0008;
        /// Reads a local variable
        const READS_VARIABLE = 0x0010;
        /// Writes a local variable
        const WRITES_VARIABLE = 0x0020;
        /// Calls another method
        const INVOKE = 0x0040;
        /// Allocates an object or array
        const ALLOCATES = 0x0080;
        /// One of the synthetic method-entry/method-exit instructions
        const SENTINEL = 0x0100;
    }
}

/// One JVM instruction kind with its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Synthetic instruction that precedes the first real instruction
    MethodEntry,
    /// Synthetic instruction that every way of leaving the method flows into
    MethodExit,
    /// `nop`
    Nop,
    /// Push a constant
    Constant(Constant),
    /// Load a local variable
    Load {
        /// Value kind
        kind: ValueKind,
        /// Local variable slot
        slot: u16,
    },
    /// Store into a local variable
    Store {
        /// Value kind
        kind: ValueKind,
        /// Local variable slot
        slot: u16,
    },
    /// `iinc`
    Increment {
        /// Local variable slot
        slot: u16,
        /// Signed increment
        delta: i16,
    },
    /// Load an array element
    ArrayLoad(ArrayKind),
    /// Store an array element
    ArrayStore(ArrayKind),
    /// `pop`, `pop2`, `dup*` and `swap`
    Shuffle(StackShuffle),
    /// Two-operand arithmetic
    Arithmetic {
        /// The operator
        op: ArithmeticOp,
        /// Operand kind
        kind: NumericKind,
    },
    /// Shift or bitwise operation
    Bitwise {
        /// The operator
        op: BitwiseOp,
        /// Operand kind
        kind: IntegralKind,
    },
    /// Arithmetic negation
    Negate(NumericKind),
    /// Primitive conversion
    Convert(Conversion),
    /// `lcmp`, `fcmp*` and `dcmp*`
    Compare(Comparison),
    /// Conditional branch
    Branch {
        /// Branch condition
        condition: Condition,
        /// Order of the branch target
        target: i32,
    },
    /// `goto`
    Goto {
        /// Order of the jump target
        target: i32,
    },
    /// `jsr`
    JumpSubroutine {
        /// Order of the subroutine entry
        target: i32,
    },
    /// `ret`
    ReturnFromSubroutine {
        /// Slot holding the return address
        slot: u16,
        /// Orders `ret` may return to: the instruction after every `jsr` of the method
        targets: Vec<i32>,
    },
    /// `tableswitch` or `lookupswitch`
    Switch {
        /// Encoding
        kind: SwitchKind,
        /// Order of the default target
        default: i32,
        /// `(key, target order)` pairs
        cases: Vec<(i32, i32)>,
    },
    /// `*return`, `None` for `return`
    Return(Option<ValueKind>),
    /// `athrow`
    Throw,
    /// Field read or write
    Field {
        /// Access instruction
        access: FieldAccess,
        /// Internal name of the declaring class
        owner: String,
        /// Field name
        name: String,
        /// Field descriptor
        descriptor: String,
    },
    /// Method invocation
    Invoke {
        /// Invocation instruction
        kind: InvokeKind,
        /// Internal name of the declaring class
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor
        descriptor: String,
    },
    /// `invokedynamic`
    InvokeDynamic {
        /// Call site name
        name: String,
        /// Call site descriptor
        descriptor: String,
    },
    /// `new`
    New {
        /// Internal name of the instantiated class
        class: String,
    },
    /// `newarray`
    NewArray(ArrayKind),
    /// `anewarray`
    NewReferenceArray {
        /// Internal name or array descriptor of the component type
        class: String,
    },
    /// `multianewarray`
    MultiNewArray {
        /// Array descriptor of the created array
        descriptor: String,
        /// Number of dimension counts consumed
        dimensions: u8,
    },
    /// `arraylength`
    ArrayLength,
    /// `checkcast`
    CheckCast {
        /// Internal name or array descriptor of the target type
        class: String,
    },
    /// `instanceof`
    InstanceOf {
        /// Internal name or array descriptor of the tested type
        class: String,
    },
    /// `monitorenter` / `monitorexit`
    Monitor(MonitorKind),
}

impl Operation {
    /// Returns the JVM opcode.
    ///
    /// The sentinels have no opcode of their own and report the reserved `impdep1`
    /// (entry) and `impdep2` (exit).
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Operation::MethodEntry => opcodes::IMPDEP1,
            Operation::MethodExit => opcodes::IMPDEP2,
            Operation::Nop => opcodes::NOP,
            Operation::Constant(constant) => constant.opcode(),
            Operation::Load { kind, slot } => match slot {
                0..=3 => opcodes::ILOAD_0 + kind.index() * 4 + *slot as u8,
                _ => opcodes::ILOAD + kind.index(),
            },
            Operation::Store { kind, slot } => match slot {
                0..=3 => opcodes::ISTORE_0 + kind.index() * 4 + *slot as u8,
                _ => opcodes::ISTORE + kind.index(),
            },
            Operation::Increment { .. } => opcodes::IINC,
            Operation::ArrayLoad(kind) => kind.load_opcode(),
            Operation::ArrayStore(kind) => kind.store_opcode(),
            Operation::Shuffle(shuffle) => match shuffle {
                StackShuffle::Pop => opcodes::POP,
                StackShuffle::Pop2 => opcodes::POP2,
                StackShuffle::Dup => opcodes::DUP,
                StackShuffle::DupX1 => opcodes::DUP_X1,
                StackShuffle::DupX2 => opcodes::DUP_X2,
                StackShuffle::Dup2 => opcodes::DUP2,
                StackShuffle::Dup2X1 => opcodes::DUP2_X1,
                StackShuffle::Dup2X2 => opcodes::DUP2_X2,
                StackShuffle::Swap => opcodes::SWAP,
            },
            Operation::Arithmetic { op, kind } => {
                let row = match op {
                    ArithmeticOp::Add => 0,
                    ArithmeticOp::Sub => 1,
                    ArithmeticOp::Mul => 2,
                    ArithmeticOp::Div => 3,
                    ArithmeticOp::Rem => 4,
                };
                opcodes::IADD + row * 4 + kind.index()
            }
            Operation::Bitwise { op, kind } => {
                let row = match op {
                    BitwiseOp::Shl => 0,
                    BitwiseOp::Shr => 1,
                    BitwiseOp::Ushr => 2,
                    BitwiseOp::And => 3,
                    BitwiseOp::Or => 4,
                    BitwiseOp::Xor => 5,
                };
                let column = match kind {
                    IntegralKind::Int => 0,
                    IntegralKind::Long => 1,
                };
                opcodes::ISHL + row * 2 + column
            }
            Operation::Negate(kind) => opcodes::INEG + kind.index(),
            Operation::Convert(conversion) => conversion.opcode(),
            Operation::Compare(comparison) => match comparison {
                Comparison::Long => opcodes::LCMP,
                Comparison::FloatNanLess => opcodes::FCMPL,
                Comparison::FloatNanGreater => opcodes::FCMPG,
                Comparison::DoubleNanLess => opcodes::DCMPL,
                Comparison::DoubleNanGreater => opcodes::DCMPG,
            },
            Operation::Branch { condition, .. } => condition.opcode(),
            Operation::Goto { .. } => opcodes::GOTO,
            Operation::JumpSubroutine { .. } => opcodes::JSR,
            Operation::ReturnFromSubroutine { .. } => opcodes::RET,
            Operation::Switch { kind, .. } => match kind {
                SwitchKind::Table => opcodes::TABLESWITCH,
                SwitchKind::Lookup => opcodes::LOOKUPSWITCH,
            },
            Operation::Return(Some(kind)) => opcodes::IRETURN + kind.index(),
            Operation::Return(None) => opcodes::RETURN,
            Operation::Throw => opcodes::ATHROW,
            Operation::Field { access, .. } => match access {
                FieldAccess::GetStatic => opcodes::GETSTATIC,
                FieldAccess::PutStatic => opcodes::PUTSTATIC,
                FieldAccess::GetField => opcodes::GETFIELD,
                FieldAccess::PutField => opcodes::PUTFIELD,
            },
            Operation::Invoke { kind, .. } => match kind {
                InvokeKind::Virtual => opcodes::INVOKEVIRTUAL,
                InvokeKind::Special => opcodes::INVOKESPECIAL,
                InvokeKind::Static => opcodes::INVOKESTATIC,
                InvokeKind::Interface => opcodes::INVOKEINTERFACE,
            },
            Operation::InvokeDynamic { .. } => opcodes::INVOKEDYNAMIC,
            Operation::New { .. } => opcodes::NEW,
            Operation::NewArray(ArrayKind::Reference) | Operation::NewReferenceArray { .. } => {
                opcodes::ANEWARRAY
            }
            Operation::NewArray(_) => opcodes::NEWARRAY,
            Operation::MultiNewArray { .. } => opcodes::MULTIANEWARRAY,
            Operation::ArrayLength => opcodes::ARRAYLENGTH,
            Operation::CheckCast { .. } => opcodes::CHECKCAST,
            Operation::InstanceOf { .. } => opcodes::INSTANCEOF,
            Operation::Monitor(MonitorKind::Enter) => opcodes::MONITORENTER,
            Operation::Monitor(MonitorKind::Exit) => opcodes::MONITOREXIT,
        }
    }

    /// Returns the mnemonic of [`Operation::opcode`].
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Operation::MethodEntry => "method-entry",
            Operation::MethodExit => "method-exit",
            other => opcodes::mnemonic(other.opcode()).unwrap_or("unknown"),
        }
    }

    /// Returns the coarse control-flow behavior.
    #[must_use]
    pub fn flow(&self) -> FlowType {
        match self {
            Operation::MethodEntry => FlowType::Entry,
            Operation::MethodExit => FlowType::Exit,
            Operation::Branch { .. } => FlowType::ConditionalBranch,
            Operation::Goto { .. } => FlowType::UnconditionalBranch,
            Operation::JumpSubroutine { .. } => FlowType::Subroutine,
            Operation::ReturnFromSubroutine { .. } => FlowType::SubroutineReturn,
            Operation::Switch { .. } => FlowType::Switch,
            Operation::Return(_) => FlowType::Return,
            Operation::Throw => FlowType::Throw,
            _ => FlowType::Sequential,
        }
    }

    /// Returns the summary flags.
    #[must_use]
    pub fn flags(&self) -> OperationFlags {
        let mut flags = match self.flow() {
            FlowType::Sequential => OperationFlags::empty(),
            FlowType::ConditionalBranch => OperationFlags::BRANCH | OperationFlags::CONDITIONAL,
            FlowType::Switch => {
                OperationFlags::BRANCH | OperationFlags::CONDITIONAL | OperationFlags::TERMINAL
            }
            FlowType::UnconditionalBranch
            | FlowType::Subroutine
            | FlowType::SubroutineReturn => OperationFlags::BRANCH | OperationFlags::TERMINAL,
            FlowType::Return => OperationFlags::TERMINAL,
            FlowType::Throw => OperationFlags::TERMINAL | OperationFlags::THROWS,
            FlowType::Entry => OperationFlags::SENTINEL,
            FlowType::Exit => OperationFlags::SENTINEL | OperationFlags::TERMINAL,
        };
        if !self.reads_variables().is_empty() {
            flags |= OperationFlags::READS_VARIABLE;
        }
        if !self.writes_variables().is_empty() {
            flags |= OperationFlags::WRITES_VARIABLE;
        }
        match self {
            Operation::Invoke { .. } | Operation::InvokeDynamic { .. } => {
                flags |= OperationFlags::INVOKE;
            }
            Operation::New { .. }
            | Operation::NewArray(_)
            | Operation::NewReferenceArray { .. }
            | Operation::MultiNewArray { .. } => flags |= OperationFlags::ALLOCATES,
            _ => {}
        }
        flags
    }

    /// Returns the branch target of `goto`, `jsr` and conditional branches.
    #[must_use]
    pub fn branch_target(&self) -> Option<i32> {
        match self {
            Operation::Branch { target, .. }
            | Operation::Goto { target }
            | Operation::JumpSubroutine { target } => Some(*target),
            _ => None,
        }
    }

    /// Returns the consumed stack values, bottom to top.
    ///
    /// # Errors
    ///
    /// - [`Error::Unsupported`] for shuffles, `athrow` and method-exit, whose effect is not
    ///   a fixed consume/push pair; use [`Operation::stack_manipulation`] instead
    /// - [`Error::MalformedDescriptor`] if a field or method descriptor cannot be parsed
    pub fn consumed_from_stack(&self) -> Result<Vec<StackType>> {
        let reference = || StackType::Reference(None);
        let consumed = match self {
            Operation::Shuffle(_) | Operation::Throw | Operation::MethodExit => {
                return Err(self.non_uniform())
            }
            Operation::MethodEntry
            | Operation::Nop
            | Operation::Constant(_)
            | Operation::Load { .. }
            | Operation::Increment { .. }
            | Operation::Goto { .. }
            | Operation::JumpSubroutine { .. }
            | Operation::ReturnFromSubroutine { .. }
            | Operation::Return(None)
            | Operation::New { .. } => Vec::new(),
            Operation::Store { kind, .. } | Operation::Return(Some(kind)) => {
                vec![kind.stack_type()]
            }
            Operation::ArrayLoad(_) => vec![reference(), StackType::Int],
            Operation::ArrayStore(kind) => vec![reference(), StackType::Int, kind.element_type()],
            Operation::Arithmetic { kind, .. } => vec![kind.stack_type(), kind.stack_type()],
            Operation::Bitwise { op, kind } if op.is_shift() => {
                vec![kind.stack_type(), StackType::Int]
            }
            Operation::Bitwise { kind, .. } => vec![kind.stack_type(), kind.stack_type()],
            Operation::Negate(kind) => vec![kind.stack_type()],
            Operation::Convert(conversion) => vec![conversion.source()],
            Operation::Compare(comparison) => vec![comparison.operand(), comparison.operand()],
            Operation::Branch { condition, .. } => condition.operands(),
            Operation::Switch { .. }
            | Operation::NewArray(_)
            | Operation::NewReferenceArray { .. } => vec![StackType::Int],
            Operation::Field {
                access,
                owner,
                descriptor,
                ..
            } => match access {
                FieldAccess::GetStatic => Vec::new(),
                FieldAccess::PutStatic => vec![parse_field_type(descriptor)?],
                FieldAccess::GetField => vec![StackType::reference(owner.as_str())],
                FieldAccess::PutField => vec![
                    StackType::reference(owner.as_str()),
                    parse_field_type(descriptor)?,
                ],
            },
            Operation::Invoke {
                kind,
                owner,
                descriptor,
                ..
            } => {
                let parsed = MethodDescriptor::parse(descriptor)?;
                let mut consumed = Vec::with_capacity(parsed.parameters.len() + 1);
                if *kind != InvokeKind::Static {
                    consumed.push(StackType::reference(owner.as_str()));
                }
                consumed.extend(parsed.parameters);
                consumed
            }
            Operation::InvokeDynamic { descriptor, .. } => {
                MethodDescriptor::parse(descriptor)?.parameters
            }
            Operation::MultiNewArray { dimensions, .. } => {
                vec![StackType::Int; usize::from(*dimensions)]
            }
            Operation::ArrayLength
            | Operation::CheckCast { .. }
            | Operation::InstanceOf { .. }
            | Operation::Monitor(_) => vec![reference()],
        };
        Ok(consumed)
    }

    /// Returns the pushed stack value, [`StackType::Void`] if nothing is pushed.
    ///
    /// # Errors
    ///
    /// Same as [`Operation::consumed_from_stack`].
    pub fn pushed_to_stack(&self) -> Result<StackType> {
        let pushed = match self {
            Operation::Shuffle(_) | Operation::Throw | Operation::MethodExit => {
                return Err(self.non_uniform())
            }
            Operation::Constant(constant) => constant.stack_type(),
            Operation::Load { kind, .. } => kind.stack_type(),
            Operation::ArrayLoad(kind) => kind.element_type(),
            Operation::Arithmetic { kind, .. } | Operation::Negate(kind) => kind.stack_type(),
            Operation::Bitwise { kind, .. } => kind.stack_type(),
            Operation::Convert(conversion) => conversion.target(),
            Operation::Compare(_) | Operation::ArrayLength | Operation::InstanceOf { .. } => {
                StackType::Int
            }
            Operation::JumpSubroutine { .. } => StackType::ReturnAddress,
            Operation::Field {
                access: FieldAccess::GetStatic | FieldAccess::GetField,
                descriptor,
                ..
            } => parse_field_type(descriptor)?,
            Operation::Invoke { descriptor, .. } | Operation::InvokeDynamic { descriptor, .. } => {
                MethodDescriptor::parse(descriptor)?.returns
            }
            Operation::New { class } | Operation::CheckCast { class } => {
                StackType::reference(class.as_str())
            }
            Operation::NewArray(kind) => StackType::reference(kind.array_descriptor()),
            Operation::NewReferenceArray { class } => StackType::reference(array_of(class)),
            Operation::MultiNewArray { descriptor, .. } => StackType::reference(descriptor.as_str()),
            _ => StackType::Void,
        };
        Ok(pushed)
    }

    /// Returns the full stack effect of this operation.
    ///
    /// `successor_is_handler` states whether control continues at an exception handler
    /// entry. It only matters for `athrow`: the stack is cleared, and the caught exception
    /// is pushed when a handler receives it.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedDescriptor`] if a field or method descriptor cannot be parsed.
    pub fn stack_manipulation(&self, successor_is_handler: bool) -> Result<StackManipulation> {
        match self {
            Operation::Shuffle(shuffle) => Ok(StackManipulation::Shuffle(*shuffle)),
            Operation::Throw => Ok(StackManipulation::Clear {
                pushed: successor_is_handler.then(|| StackType::reference(THROWABLE)),
            }),
            Operation::MethodExit => Ok(StackManipulation::Clear { pushed: None }),
            _ => Ok(StackManipulation::uniform(
                self.consumed_from_stack()?,
                self.pushed_to_stack()?,
            )),
        }
    }

    /// Returns the local variable slots read by this operation.
    ///
    /// Wide values occupy two consecutive slots and report both.
    #[must_use]
    pub fn reads_variables(&self) -> BTreeSet<u16> {
        match self {
            Operation::Load { kind, slot } => slots(*slot, kind.is_wide()),
            Operation::Increment { slot, .. } | Operation::ReturnFromSubroutine { slot, .. } => {
                slots(*slot, false)
            }
            _ => BTreeSet::new(),
        }
    }

    /// Returns the local variable slots overwritten by this operation.
    #[must_use]
    pub fn writes_variables(&self) -> BTreeSet<u16> {
        match self {
            Operation::Store { kind, slot } => slots(*slot, kind.is_wide()),
            Operation::Increment { slot, .. } => slots(*slot, false),
            _ => BTreeSet::new(),
        }
    }

    /// Returns `true` if this operation overwrites local variable `index`.
    #[must_use]
    pub fn writes_variable(&self, index: u16) -> bool {
        self.writes_variables().contains(&index)
    }

    /// Returns the orders control may continue at, for an instruction at `order`.
    ///
    /// The result is sorted and free of duplicates. Returns and method-exit have no
    /// successors. Method-entry continues at order `0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] for `athrow`, whose successors depend on the
    /// enclosing handler ranges; use [`Operation::successors_with_handlers`].
    pub fn successors(&self, order: i32) -> Result<Vec<i32>> {
        let successors = match self {
            Operation::MethodEntry => vec![METHOD_ENTRY_ORDER + 1],
            Operation::MethodExit | Operation::Return(_) => Vec::new(),
            Operation::Throw => {
                return Err(Error::Unsupported(
                    "athrow successors depend on the enclosing handler ranges".to_string(),
                ))
            }
            Operation::Goto { target } | Operation::JumpSubroutine { target } => vec![*target],
            Operation::Branch { target, .. } => sorted_unique([order + 1, *target]),
            Operation::Switch { default, cases, .. } => {
                sorted_unique(std::iter::once(*default).chain(cases.iter().map(|&(_, t)| t)))
            }
            Operation::ReturnFromSubroutine { targets, .. } => {
                sorted_unique(targets.iter().copied())
            }
            _ => vec![order + 1],
        };
        Ok(successors)
    }

    /// Returns the successors of an instruction at `order`, taking handler ranges into
    /// account.
    ///
    /// For `athrow` these are the entries of every handler whose range contains `order`,
    /// plus method-exit for the case that no handler catches the exception. Every other
    /// operation ignores `handlers`.
    ///
    /// # Errors
    ///
    /// Never fails for `athrow`; other operations fail as [`Operation::successors`] does.
    pub fn successors_with_handlers(&self, order: i32, handlers: &[HandlerRange]) -> Result<Vec<i32>> {
        match self {
            Operation::Throw => Ok(sorted_unique(
                handlers
                    .iter()
                    .filter(|range| range.contains(order))
                    .map(HandlerRange::handler)
                    .chain(std::iter::once(METHOD_EXIT_ORDER)),
            )),
            _ => self.successors(order),
        }
    }

    fn non_uniform(&self) -> Error {
        Error::Unsupported(format!(
            "{} has no uniform consume/push signature",
            self.mnemonic()
        ))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self {
            Operation::Constant(constant) if constant.has_operand() => {
                write!(f, "{mnemonic} {constant}")
            }
            Operation::Load { slot, .. } | Operation::Store { slot, .. } if *slot > 3 => {
                write!(f, "{mnemonic} {slot}")
            }
            Operation::Increment { slot, delta } => write!(f, "{mnemonic} {slot} {delta}"),
            Operation::Branch { target, .. }
            | Operation::Goto { target }
            | Operation::JumpSubroutine { target } => write!(f, "{mnemonic} {target}"),
            Operation::ReturnFromSubroutine { slot, .. } => write!(f, "{mnemonic} {slot}"),
            Operation::Switch { default, cases, .. } => {
                write!(f, "{mnemonic} {{")?;
                for (i, (key, target)) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {target}")?;
                }
                write!(f, "}} default: {default}")
            }
            Operation::Field {
                owner,
                name,
                descriptor,
                ..
            } => write!(f, "{mnemonic} {owner}.{name} {descriptor}"),
            Operation::Invoke {
                owner,
                name,
                descriptor,
                ..
            } => write!(f, "{mnemonic} {owner}.{name}{descriptor}"),
            Operation::InvokeDynamic { name, descriptor } => {
                write!(f, "{mnemonic} {name}{descriptor}")
            }
            Operation::New { class }
            | Operation::NewReferenceArray { class }
            | Operation::CheckCast { class }
            | Operation::InstanceOf { class } => write!(f, "{mnemonic} {class}"),
            Operation::NewArray(kind) => {
                let element: &'static str = kind.into();
                write!(f, "{mnemonic} {element}")
            }
            Operation::MultiNewArray {
                descriptor,
                dimensions,
            } => write!(f, "{mnemonic} {descriptor} {dimensions}"),
            _ => write!(f, "{mnemonic}"),
        }
    }
}

fn sorted_unique<I: IntoIterator<Item = i32>>(orders: I) -> Vec<i32> {
    orders.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

fn slots(slot: u16, wide: bool) -> BTreeSet<u16> {
    let mut set = BTreeSet::from([slot]);
    if wide {
        set.insert(slot.saturating_add(1));
    }
    set
}

fn array_of(component: &str) -> String {
    if component.starts_with('[') {
        format!("[{component}")
    } else {
        format!("[L{component};")
    }
}
