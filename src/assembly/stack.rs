//! Operand stack types and stack-effect simulation.
//!
//! Every operation describes its effect on the operand stack as a
//! [`StackManipulation`]. Most operations have a *uniform* effect: they pop a fixed
//! list of typed values and push at most one. Two families do not:
//!
//! - the shuffles (`pop`, `pop2`, `dup*`, `swap`) rearrange values by *word* count, so
//!   their effect depends on whether the involved values are category-2 (`long`,
//!   `double`) or not
//! - `athrow` and the method-exit sentinel discard the whole stack
//!
//! A [`TypeStack`] applies manipulations forwards (executing an instruction) and
//! reverts them backwards (undoing an instruction while walking a path in reverse).

use std::fmt;

use strum::EnumIter;

use crate::{Error, Result};

/// Internal name of the type pushed onto the stack of an exception handler.
pub const THROWABLE: &str = "java/lang/Throwable";

/// Internal name of the class two unrelated reference types merge into.
pub const OBJECT: &str = "java/lang/Object";

/// The verification type of one operand stack value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StackType {
    /// `int` and everything the JVM widens to it (`boolean`, `byte`, `char`, `short`)
    Int,
    /// `long` (category 2)
    Long,
    /// `float`
    Float,
    /// `double` (category 2)
    Double,
    /// An object or array reference, with its internal name or array descriptor when known
    Reference(Option<String>),
    /// The return address pushed by `jsr`
    ReturnAddress,
    /// A single-word value of unknown type
    Any,
    /// No value; the push side of operations that push nothing
    Void,
}

impl StackType {
    /// Creates a reference type with a known class or array descriptor.
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        StackType::Reference(Some(name.into()))
    }

    /// Returns the number of stack words the value occupies.
    #[must_use]
    pub fn words(&self) -> usize {
        match self {
            StackType::Long | StackType::Double => 2,
            StackType::Void => 0,
            _ => 1,
        }
    }

    /// Returns `true` for `long` and `double`.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        self.words() == 2
    }

    /// Returns `true` if a value of this type may be consumed where `constraint` is
    /// expected.
    ///
    /// References match regardless of their class since no class hierarchy is available.
    /// A return address satisfies a reference constraint.
    /// [`StackType::Any`] matches, and is matched by, every single-word type.
    #[must_use]
    pub fn satisfies(&self, constraint: &StackType) -> bool {
        match (constraint, self) {
            (StackType::Void, _) | (_, StackType::Void) => false,
            (StackType::Any, found) | (found, StackType::Any) => found.words() == 1,
            (StackType::Reference(_), StackType::Reference(_)) => true,
            // astore also spills the return address pushed by jsr
            (StackType::Reference(_), StackType::ReturnAddress) => true,
            (expected, found) => expected == found,
        }
    }

    /// Merges two values that meet at a control-flow join.
    ///
    /// [`StackType::Any`] and `Reference(None)` carry no information and give way to the
    /// other side. Two different classes merge into [`OBJECT`]. Returns `None` if the
    /// values are incompatible.
    #[must_use]
    pub fn merge(&self, other: &StackType) -> Option<StackType> {
        match (self, other) {
            (left, right) if left == right => Some(left.clone()),
            (StackType::Void, _) | (_, StackType::Void) => None,
            (StackType::Any, found) | (found, StackType::Any) => {
                (found.words() == 1).then(|| found.clone())
            }
            (
                StackType::Reference(None),
                found @ (StackType::Reference(_) | StackType::ReturnAddress),
            )
            | (
                found @ (StackType::Reference(_) | StackType::ReturnAddress),
                StackType::Reference(None),
            ) => Some(found.clone()),
            (StackType::Reference(Some(_)), StackType::Reference(Some(_))) => {
                Some(StackType::reference(OBJECT))
            }
            _ => None,
        }
    }
}

/// Merges two value lists, bottom to top, aligned at the top of the stack.
///
/// A wide value lines up with two [`StackType::Any`] words. Below the shorter list the
/// values of the longer one are kept.
///
/// # Errors
///
/// [`Error::StackMismatch`] if two aligned values do not merge.
pub fn merge_values(left: &[StackType], right: &[StackType]) -> Result<Vec<StackType>> {
    let conflict = || Error::StackMismatch {
        expected: describe(left),
        found: describe(right),
    };
    let mut lhs = left.iter().rev().peekable();
    let mut rhs = right.iter().rev().peekable();
    let mut merged = Vec::with_capacity(left.len().max(right.len()));

    loop {
        let value = match (lhs.next(), rhs.next()) {
            (None, None) => break,
            (Some(only), None) | (None, Some(only)) => only.clone(),
            (Some(a), Some(b)) if a.words() == b.words() => a.merge(b).ok_or_else(conflict)?,
            (Some(wide), Some(StackType::Any)) if wide.is_wide() => {
                rhs.next_if_eq(&&StackType::Any).ok_or_else(conflict)?;
                wide.clone()
            }
            (Some(StackType::Any), Some(wide)) if wide.is_wide() => {
                lhs.next_if_eq(&&StackType::Any).ok_or_else(conflict)?;
                wide.clone()
            }
            _ => return Err(conflict()),
        };
        merged.push(value);
    }

    merged.reverse();
    Ok(merged)
}

impl fmt::Display for StackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackType::Int => write!(f, "int"),
            StackType::Long => write!(f, "long"),
            StackType::Float => write!(f, "float"),
            StackType::Double => write!(f, "double"),
            StackType::Reference(Some(name)) => write!(f, "ref {name}"),
            StackType::Reference(None) => write!(f, "ref"),
            StackType::ReturnAddress => write!(f, "returnAddress"),
            StackType::Any => write!(f, "any"),
            StackType::Void => write!(f, "void"),
        }
    }
}

/// The word-oriented stack shuffle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum StackShuffle {
    /// Discard one word
    Pop,
    /// Discard two words
    Pop2,
    /// Duplicate one word
    Dup,
    /// Duplicate one word below the next word
    DupX1,
    /// Duplicate one word below the next two words
    DupX2,
    /// Duplicate two words
    Dup2,
    /// Duplicate two words below the next word
    Dup2X1,
    /// Duplicate two words below the next two words
    Dup2X2,
    /// Exchange the top two single words
    Swap,
}

impl StackShuffle {
    /// Number of words in the moved or duplicated top group.
    #[must_use]
    pub fn top_words(self) -> usize {
        match self {
            StackShuffle::Pop
            | StackShuffle::Dup
            | StackShuffle::DupX1
            | StackShuffle::DupX2
            | StackShuffle::Swap => 1,
            StackShuffle::Pop2 | StackShuffle::Dup2 | StackShuffle::Dup2X1 | StackShuffle::Dup2X2 => 2,
        }
    }

    /// Number of words the duplicated group is inserted below.
    #[must_use]
    pub fn skipped_words(self) -> usize {
        match self {
            StackShuffle::DupX1 | StackShuffle::Dup2X1 | StackShuffle::Swap => 1,
            StackShuffle::DupX2 | StackShuffle::Dup2X2 => 2,
            _ => 0,
        }
    }

    fn is_pop(self) -> bool {
        matches!(self, StackShuffle::Pop | StackShuffle::Pop2)
    }
}

/// The effect of one instruction on the operand stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackManipulation {
    /// Pop `consumed` (listed bottom to top), then push `pushed` unless it is
    /// [`StackType::Void`].
    Uniform {
        /// Consumed value constraints, bottom to top
        consumed: Vec<StackType>,
        /// The pushed value, or `Void`
        pushed: StackType,
    },
    /// A word-oriented rearrangement.
    Shuffle(StackShuffle),
    /// Discard the whole stack, then optionally push one value.
    ///
    /// Reverting also discards the whole stack: what was there before cannot be known.
    Clear {
        /// Value pushed after clearing, e.g. the caught exception at a handler entry
        pushed: Option<StackType>,
    },
}

impl StackManipulation {
    /// Shorthand for a uniform effect.
    #[must_use]
    pub fn uniform(consumed: Vec<StackType>, pushed: StackType) -> Self {
        StackManipulation::Uniform { consumed, pushed }
    }
}

/// A simulated operand stack of verification types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeStack {
    values: Vec<StackType>,
}

impl TypeStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        TypeStack::default()
    }

    /// Creates a stack holding `values`, bottom to top.
    #[must_use]
    pub fn from_values(values: Vec<StackType>) -> Self {
        TypeStack { values }
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the stack holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of words occupied.
    #[must_use]
    pub fn words(&self) -> usize {
        self.values.iter().map(StackType::words).sum()
    }

    /// Returns the top value.
    #[must_use]
    pub fn top(&self) -> Option<&StackType> {
        self.values.last()
    }

    /// Returns the value `depth` entries below the top; `0` is the top.
    #[must_use]
    pub fn peek(&self, depth: usize) -> Option<&StackType> {
        self.values.iter().rev().nth(depth)
    }

    /// Returns the values, bottom to top.
    #[must_use]
    pub fn values(&self) -> &[StackType] {
        &self.values
    }

    /// Consumes the stack, returning its values bottom to top.
    #[must_use]
    pub fn into_values(self) -> Vec<StackType> {
        self.values
    }

    /// Pushes a value; `Void` is ignored.
    pub fn push(&mut self, value: StackType) {
        if value != StackType::Void {
            self.values.push(value);
        }
    }

    /// Executes `manipulation` on this stack.
    ///
    /// # Errors
    ///
    /// [`Error::StackUnderflow`] if the stack holds too few words, [`Error::StackMismatch`]
    /// if a consumed value violates its constraint or a shuffle would split a wide value.
    pub fn apply(&mut self, manipulation: &StackManipulation) -> Result<()> {
        match manipulation {
            StackManipulation::Uniform { consumed, pushed } => {
                self.ensure_words(consumed.iter().map(StackType::words).sum())?;
                for expected in consumed.iter().rev() {
                    let found = self.pop_value()?;
                    if !found.satisfies(expected) {
                        return Err(mismatch(expected, &found));
                    }
                }
                self.push(pushed.clone());
            }
            StackManipulation::Shuffle(shuffle) => {
                let top = self.take_words(shuffle.top_words())?;
                if shuffle.is_pop() {
                    return Ok(());
                }
                let skipped = self.take_words(shuffle.skipped_words())?;
                if *shuffle == StackShuffle::Swap {
                    self.values.extend(top);
                    self.values.extend(skipped);
                } else {
                    self.values.extend(top.iter().cloned());
                    self.values.extend(skipped);
                    self.values.extend(top);
                }
            }
            StackManipulation::Clear { pushed } => {
                self.values.clear();
                if let Some(value) = pushed {
                    self.push(value.clone());
                }
            }
        }
        Ok(())
    }

    /// Undoes `manipulation`, turning the stack after an instruction into the stack before
    /// it.
    ///
    /// Values discarded by the instruction come back as their constraint type, or as
    /// [`StackType::Any`] words for `pop`/`pop2`. The duplicated group of a `dup*` is
    /// restored from the merge of both copies.
    ///
    /// # Errors
    ///
    /// Same as [`TypeStack::apply`].
    pub fn revert(&mut self, manipulation: &StackManipulation) -> Result<()> {
        match manipulation {
            StackManipulation::Uniform { consumed, pushed } => {
                if *pushed != StackType::Void {
                    let found = self.pop_value()?;
                    if !found.satisfies(pushed) {
                        return Err(mismatch(pushed, &found));
                    }
                }
                self.values.extend(consumed.iter().cloned());
            }
            StackManipulation::Shuffle(shuffle) => {
                if shuffle.is_pop() {
                    for _ in 0..shuffle.top_words() {
                        self.values.push(StackType::Any);
                    }
                    return Ok(());
                }
                if *shuffle == StackShuffle::Swap {
                    let upper = self.take_words(1)?;
                    let lower = self.take_words(1)?;
                    self.values.extend(upper);
                    self.values.extend(lower);
                    return Ok(());
                }
                let top = self.take_words(shuffle.top_words())?;
                let skipped = self.take_words(shuffle.skipped_words())?;
                let copy = self.take_words(shuffle.top_words())?;
                let original = merge_values(&copy, &top)?;
                self.values.extend(skipped);
                self.values.extend(original);
            }
            StackManipulation::Clear { .. } => self.values.clear(),
        }
        Ok(())
    }

    fn ensure_words(&self, needed: usize) -> Result<()> {
        let available = self.words();
        if available < needed {
            return Err(Error::StackUnderflow { needed, available });
        }
        Ok(())
    }

    fn pop_value(&mut self) -> Result<StackType> {
        self.values.pop().ok_or(Error::StackUnderflow {
            needed: 1,
            available: 0,
        })
    }

    /// Pops values covering exactly `words` words, returned bottom to top.
    fn take_words(&mut self, words: usize) -> Result<Vec<StackType>> {
        self.ensure_words(words)?;
        let mut taken = Vec::new();
        let mut covered = 0;
        while covered < words {
            let value = self.pop_value()?;
            covered += value.words();
            taken.push(value);
        }
        taken.reverse();
        if covered != words {
            return Err(Error::StackMismatch {
                expected: format!("{words} words"),
                found: describe(&taken),
            });
        }
        Ok(taken)
    }
}

impl fmt::Display for TypeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", describe(&self.values))
    }
}

fn describe(values: &[StackType]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn mismatch(expected: &StackType, found: &StackType) -> Error {
    Error::StackMismatch {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn stack(values: &[StackType]) -> TypeStack {
        TypeStack::from_values(values.to_vec())
    }

    #[test]
    fn test_uniform_apply_and_revert() {
        let add = StackManipulation::uniform(vec![StackType::Int, StackType::Int], StackType::Int);
        let mut s = stack(&[StackType::Long, StackType::Int, StackType::Int]);

        s.apply(&add).unwrap();
        assert_eq!(s.values(), &[StackType::Long, StackType::Int]);

        s.revert(&add).unwrap();
        assert_eq!(s.values(), &[StackType::Long, StackType::Int, StackType::Int]);
    }

    #[test]
    fn test_uniform_type_errors() {
        let add = StackManipulation::uniform(vec![StackType::Int, StackType::Int], StackType::Int);

        let mut short = stack(&[StackType::Int]);
        assert_eq!(
            short.apply(&add),
            Err(Error::StackUnderflow {
                needed: 2,
                available: 1
            })
        );

        let mut wrong = stack(&[StackType::Int, StackType::Float]);
        assert!(matches!(wrong.apply(&add), Err(Error::StackMismatch { .. })));
    }

    #[test]
    fn test_references_match_any_class() {
        let store = StackManipulation::uniform(vec![StackType::Reference(None)], StackType::Void);
        let mut s = stack(&[StackType::reference("java/lang/String")]);
        s.apply(&store).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_dup_x1() {
        let mut s = stack(&[StackType::Float, StackType::Int]);
        s.apply(&StackManipulation::Shuffle(StackShuffle::DupX1))
            .unwrap();
        assert_eq!(s.values(), &[StackType::Int, StackType::Float, StackType::Int]);
    }

    #[test]
    fn test_dup2_on_wide_value() {
        let mut s = stack(&[StackType::Double]);
        s.apply(&StackManipulation::Shuffle(StackShuffle::Dup2))
            .unwrap();
        assert_eq!(s.values(), &[StackType::Double, StackType::Double]);
        assert_eq!(s.words(), 4);
    }

    #[test]
    fn test_dup_x2_form_two() {
        // value2 is a long, so dup_x2 inserts below it
        let mut s = stack(&[StackType::Long, StackType::Int]);
        s.apply(&StackManipulation::Shuffle(StackShuffle::DupX2))
            .unwrap();
        assert_eq!(s.values(), &[StackType::Int, StackType::Long, StackType::Int]);
    }

    #[test]
    fn test_shuffle_cannot_split_wide_value() {
        let mut s = stack(&[StackType::Long]);
        assert!(matches!(
            s.apply(&StackManipulation::Shuffle(StackShuffle::Dup)),
            Err(Error::StackMismatch { .. })
        ));
    }

    #[test]
    fn test_shuffles_revert_to_original() {
        let original = stack(&[
            StackType::Reference(None),
            StackType::Float,
            StackType::Int,
            StackType::Float,
        ]);
        for shuffle in StackShuffle::iter() {
            let mut s = original.clone();
            let manipulation = StackManipulation::Shuffle(shuffle);
            s.apply(&manipulation).unwrap();
            s.revert(&manipulation).unwrap();
            if shuffle == StackShuffle::Pop {
                assert_eq!(s.top(), Some(&StackType::Any));
            } else if shuffle == StackShuffle::Pop2 {
                assert_eq!(s.peek(1), Some(&StackType::Any));
            } else {
                assert_eq!(s, original, "{shuffle:?} did not revert");
            }
        }
    }

    #[test]
    fn test_clear_both_directions() {
        let throw = StackManipulation::Clear {
            pushed: Some(StackType::reference(THROWABLE)),
        };
        let mut s = stack(&[StackType::Int, StackType::Reference(None)]);
        s.apply(&throw).unwrap();
        assert_eq!(s.values(), &[StackType::reference(THROWABLE)]);
        s.revert(&throw).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_merge_types() {
        let string = StackType::reference("java/lang/String");
        assert_eq!(StackType::Int.merge(&StackType::Int), Some(StackType::Int));
        assert_eq!(StackType::Any.merge(&StackType::Float), Some(StackType::Float));
        assert_eq!(StackType::Any.merge(&StackType::Long), None);
        assert_eq!(StackType::Reference(None).merge(&string), Some(string.clone()));
        assert_eq!(
            string.merge(&StackType::reference("java/lang/Integer")),
            Some(StackType::reference(OBJECT))
        );
        assert_eq!(
            StackType::Reference(None).merge(&StackType::ReturnAddress),
            Some(StackType::ReturnAddress)
        );
        assert_eq!(StackType::Int.merge(&StackType::Float), None);
        assert_eq!(string.merge(&StackType::ReturnAddress), None);
    }

    #[test]
    fn test_merge_values_aligns_at_top() {
        let merged = merge_values(&[StackType::Double, StackType::Any], &[StackType::Int]).unwrap();
        assert_eq!(merged, vec![StackType::Double, StackType::Int]);

        let deeper = merge_values(&[StackType::Int], &[StackType::Reference(None), StackType::Any]).unwrap();
        assert_eq!(deeper, vec![StackType::Reference(None), StackType::Int]);

        let wide = merge_values(&[StackType::Any, StackType::Any], &[StackType::Long]).unwrap();
        assert_eq!(wide, vec![StackType::Long]);

        assert!(matches!(
            merge_values(&[StackType::Any], &[StackType::Long]),
            Err(Error::StackMismatch { .. })
        ));
        assert!(matches!(
            merge_values(&[StackType::Int], &[StackType::Float]),
            Err(Error::StackMismatch { .. })
        ));
    }

    #[test]
    fn test_dup_revert_refines_placeholder() {
        let mut s = stack(&[StackType::Any, StackType::Int]);
        s.revert(&StackManipulation::Shuffle(StackShuffle::Dup)).unwrap();
        assert_eq!(s.values(), &[StackType::Int]);

        let mut clash = stack(&[StackType::Float, StackType::Int]);
        assert!(matches!(
            clash.revert(&StackManipulation::Shuffle(StackShuffle::Dup)),
            Err(Error::StackMismatch { .. })
        ));
    }

    #[test]
    fn test_display() {
        let s = stack(&[StackType::Int, StackType::reference("java/lang/Object")]);
        assert_eq!(s.to_string(), "[int, ref java/lang/Object]");
        assert_eq!(s.peek(1), Some(&StackType::Int));
    }
}
