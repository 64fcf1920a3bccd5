//! Control flow edge kinds for the CFG.
//!
//! The CFG stores plain edges; the kind of an edge is derived on demand from the source
//! instruction and the target order, so it never has to be kept in sync with the graph.

use crate::assembly::{HandlerRange, Instruction, Operation, METHOD_EXIT_ORDER};

/// The kind of control flow represented by an edge.
///
/// # Examples
///
/// ```rust
/// use bytescope::analysis::CfgEdgeKind;
///
/// let edge_kind = CfgEdgeKind::ConditionalTrue;
/// assert!(edge_kind.is_conditional());
/// assert_eq!(edge_kind.label(), Some("T"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgEdgeKind {
    /// Fall-through, `goto`, or the edge out of method-entry.
    Unconditional,

    /// The taken side of a conditional branch.
    ConditionalTrue,

    /// The fall-through side of a conditional branch.
    ConditionalFalse,

    /// A switch case edge.
    Switch {
        /// The first case key leading to the target, `None` for the default target.
        case_value: Option<i32>,
    },

    /// A `jsr` into a subroutine or a `ret` back out of it.
    Subroutine,

    /// An `athrow` caught by an enclosing handler.
    ExceptionHandler {
        /// Internal name of the caught class; `None` for catch-all handlers.
        catch_type: Option<String>,
    },

    /// Control leaving the method, by return or by an uncaught exception.
    Exit,
}

impl CfgEdgeKind {
    /// Classifies the edge from `source` to the instruction at `target`.
    #[must_use]
    pub fn classify(source: &Instruction, target: i32, handlers: &[HandlerRange]) -> Self {
        if target == METHOD_EXIT_ORDER {
            return CfgEdgeKind::Exit;
        }

        match source.operation() {
            Operation::Branch { .. } => {
                if target == source.order() + 1 {
                    CfgEdgeKind::ConditionalFalse
                } else {
                    CfgEdgeKind::ConditionalTrue
                }
            }
            Operation::Switch { cases, .. } => CfgEdgeKind::Switch {
                case_value: cases
                    .iter()
                    .find(|&&(_, case_target)| case_target == target)
                    .map(|&(key, _)| key),
            },
            Operation::JumpSubroutine { .. } | Operation::ReturnFromSubroutine { .. } => {
                CfgEdgeKind::Subroutine
            }
            Operation::Throw => CfgEdgeKind::ExceptionHandler {
                catch_type: handlers
                    .iter()
                    .find(|range| range.contains(source.order()) && range.handler() == target)
                    .and_then(|range| range.catch_type().map(str::to_string)),
            },
            _ => CfgEdgeKind::Unconditional,
        }
    }

    /// Returns `true` for both sides of a conditional branch.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionalTrue | Self::ConditionalFalse)
    }

    /// Returns `true` for edges into exception handlers.
    #[must_use]
    pub const fn is_exceptional(&self) -> bool {
        matches!(self, Self::ExceptionHandler { .. })
    }

    /// Returns `true` for switch case edges.
    #[must_use]
    pub const fn is_switch(&self) -> bool {
        matches!(self, Self::Switch { .. })
    }

    /// The branch outcome label stored on the graph edge: `"T"` for the taken side of a
    /// conditional branch, `"F"` for its fall-through side.
    #[must_use]
    pub const fn label(&self) -> Option<&'static str> {
        match self {
            Self::ConditionalTrue => Some("T"),
            Self::ConditionalFalse => Some("F"),
            _ => None,
        }
    }

    /// Short description used when rendering edges.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Unconditional => String::new(),
            Self::ConditionalTrue => "T".to_string(),
            Self::ConditionalFalse => "F".to_string(),
            Self::Switch { case_value } => {
                case_value.map_or("default".to_string(), |v| format!("case {v}"))
            }
            Self::Subroutine => "jsr".to_string(),
            Self::ExceptionHandler { catch_type } => {
                format!("catch {}", catch_type.as_deref().unwrap_or("any"))
            }
            Self::Exit => "exit".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assembly::{Condition, MethodIdentifier, SwitchKind};

    fn at(order: i32, operation: Operation) -> Instruction {
        let method = Arc::new(MethodIdentifier::new("a/B", "m", "()V").unwrap());
        Instruction::new(method, order, operation.to_string(), operation).unwrap()
    }

    #[test]
    fn test_branch_sides() {
        let branch = at(
            3,
            Operation::Branch {
                condition: Condition::Equal,
                target: 9,
            },
        );
        assert_eq!(CfgEdgeKind::classify(&branch, 4, &[]), CfgEdgeKind::ConditionalFalse);
        assert_eq!(CfgEdgeKind::classify(&branch, 9, &[]), CfgEdgeKind::ConditionalTrue);
        assert_eq!(CfgEdgeKind::ConditionalFalse.label(), Some("F"));
        assert!(CfgEdgeKind::ConditionalFalse.is_conditional());
    }

    #[test]
    fn test_switch_cases() {
        let switch = at(
            0,
            Operation::Switch {
                kind: SwitchKind::Lookup,
                default: 5,
                cases: vec![(1, 2), (10, 3)],
            },
        );
        assert_eq!(
            CfgEdgeKind::classify(&switch, 3, &[]),
            CfgEdgeKind::Switch {
                case_value: Some(10)
            }
        );
        let default = CfgEdgeKind::classify(&switch, 5, &[]);
        assert_eq!(default, CfgEdgeKind::Switch { case_value: None });
        assert_eq!(default.describe(), "default");
        assert_eq!(default.label(), None);
    }

    #[test]
    fn test_throw_edges() {
        let throw = at(5, Operation::Throw);
        let handlers = [
            HandlerRange::new(2, 10, 7, Some("java/io/IOException".to_string())).unwrap(),
        ];
        let caught = CfgEdgeKind::classify(&throw, 7, &handlers);
        assert!(caught.is_exceptional());
        assert_eq!(caught.describe(), "catch java/io/IOException");
        assert_eq!(
            CfgEdgeKind::classify(&throw, METHOD_EXIT_ORDER, &handlers),
            CfgEdgeKind::Exit
        );
    }
}
