use thiserror::Error;

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Invariant {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Invariant {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants follow the failure classes of the analysis pipeline. Construction-order bugs of
/// the caller, queries that do not apply to an operation variant and broken analysis invariants
/// each have their own variant. Lookups that find nothing are not errors and are reported through
/// `Option` or empty collections instead.
///
/// # Error Categories
///
/// ## Caller Errors
/// - [`Error::Precondition`] - Missing identifiers or otherwise invalid constructor input
/// - [`Error::InvalidArgument`] - An edge endpoint or queried node is not part of the graph
/// - [`Error::DuplicateEdge`] - The same edge was added twice without an update
/// - [`Error::DuplicateLabel`] / [`Error::UndefinedLabel`] - Assembler label misuse
///
/// ## Variant Errors
/// - [`Error::Unsupported`] - The query has no meaningful answer for this operation variant
///
/// ## Analysis Errors
/// - [`Error::Invariant`] - A structural invariant of CFG, PDT or CDG construction is broken
/// - [`Error::OrderCollision`] - Two nodes share an instruction order
/// - [`Error::StackUnderflow`] / [`Error::StackMismatch`] - Type stack simulation failed
/// - [`Error::MalformedDescriptor`] - A JVM descriptor could not be parsed
///
/// # Examples
///
/// ```rust
/// use bytescope::{Error, assembly::MethodIdentifier};
///
/// match MethodIdentifier::new("", "run", "()V") {
///     Err(Error::Precondition(message)) => println!("rejected: {message}"),
///     Err(other) => println!("unexpected: {other}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A constructor or builder received input it cannot accept.
    #[error("Precondition violated - {0}")]
    Precondition(String),

    /// A node or edge endpoint does not belong to the graph it was passed to.
    #[error("Invalid argument - {0}")]
    InvalidArgument(String),

    /// An edge with the same source, target and weight already exists.
    ///
    /// Use the builder's update operations to replace an existing edge.
    #[error("Edge {from} -> {to} already exists")]
    DuplicateEdge {
        /// Display form of the source node
        from: String,
        /// Display form of the target node
        to: String,
    },

    /// The requested query is not defined for this operation variant.
    #[error("Unsupported operation - {0}")]
    Unsupported(String),

    /// A structural invariant of the analysis does not hold.
    ///
    /// This indicates malformed input from the decoding layer or a bug in graph
    /// construction. The error records the source location where it was raised.
    #[error("Invariant violated - {file}:{line}: {message}")]
    Invariant {
        /// The message to be printed for the invariant violation
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// More than one node carries the same instruction order.
    #[error("Multiple nodes share the order {0}")]
    OrderCollision(i32),

    /// A JVM field or method descriptor is malformed.
    #[error("Malformed descriptor - {0}")]
    MalformedDescriptor(String),

    /// The simulated type stack holds fewer words than an operation needs.
    #[error("Type stack underflow - needed {needed} words, {available} available")]
    StackUnderflow {
        /// Number of stack words the operation requires
        needed: usize,
        /// Number of stack words present
        available: usize,
    },

    /// A value on the simulated type stack does not satisfy an operation's constraint.
    #[error("Type stack mismatch - expected {expected}, found {found}")]
    StackMismatch {
        /// The constraint of the consuming operation
        expected: String,
        /// The type found on the stack
        found: String,
    },

    /// A label was defined twice in the same method.
    #[error("Label '{0}' is already defined")]
    DuplicateLabel(String),

    /// A branch refers to a label that was never defined.
    #[error("Label '{0}' is not defined")]
    UndefinedLabel(String),
}
