//! Local variable tables.
//!
//! A [`VariableTable`] records the declared type of each local variable slot over the
//! instruction ranges where it is live. Stack-effect queries consult it to give
//! reference loads and stores their declared class instead of an anonymous reference.

use crate::{
    assembly::{descriptor::parse_field_type, stack::StackType},
    Error, Result,
};

/// One entry of a local variable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableLifetime {
    name: String,
    descriptor: String,
    slot: u16,
    start: i32,
    end: i32,
    stack_type: StackType,
}

impl VariableLifetime {
    /// Creates a lifetime for `slot`, live on the order range `[start, end)`.
    ///
    /// # Errors
    ///
    /// - [`Error::Precondition`] for an empty name or `start > end`
    /// - [`Error::MalformedDescriptor`] if `descriptor` is not a field descriptor
    pub fn new(
        name: impl Into<String>,
        descriptor: impl Into<String>,
        slot: u16,
        start: i32,
        end: i32,
    ) -> Result<Self> {
        let name = name.into();
        let descriptor = descriptor.into();
        if name.is_empty() {
            return Err(Error::Precondition(format!(
                "variable in slot {slot} has no name"
            )));
        }
        if start > end {
            return Err(Error::Precondition(format!(
                "variable '{name}' starts at {start} after its end {end}"
            )));
        }
        let stack_type = parse_field_type(&descriptor)?;

        Ok(VariableLifetime {
            name,
            descriptor,
            slot,
            start,
            end,
            stack_type,
        })
    }

    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Local variable slot.
    #[must_use]
    pub fn slot(&self) -> u16 {
        self.slot
    }

    /// First order at which the variable is live.
    #[must_use]
    pub fn start(&self) -> i32 {
        self.start
    }

    /// First order after the live range.
    #[must_use]
    pub fn end(&self) -> i32 {
        self.end
    }

    /// The declared type as a stack type.
    #[must_use]
    pub fn stack_type(&self) -> &StackType {
        &self.stack_type
    }

    /// Returns `true` if this lifetime describes the slot accessed at `order`.
    ///
    /// A store initializes a variable right before its live range starts, so the
    /// instruction immediately preceding `start` matches as well.
    #[must_use]
    pub fn covers(&self, slot: u16, order: i32) -> bool {
        self.slot == slot && self.start <= order.saturating_add(1) && order < self.end
    }
}

/// The local variable table of one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    lifetimes: Vec<VariableLifetime>,
}

impl VariableTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        VariableTable::default()
    }

    /// Adds a lifetime.
    pub fn push(&mut self, lifetime: VariableLifetime) {
        self.lifetimes.push(lifetime);
    }

    /// Returns all lifetimes in insertion order.
    #[must_use]
    pub fn lifetimes(&self) -> &[VariableLifetime] {
        &self.lifetimes
    }

    /// Returns the number of lifetimes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lifetimes.len()
    }

    /// Returns `true` if the table has no lifetimes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lifetimes.is_empty()
    }

    /// Returns the lifetime describing `slot` at `order`.
    #[must_use]
    pub fn lookup(&self, slot: u16, order: i32) -> Option<&VariableLifetime> {
        self.lifetimes.iter().find(|l| l.covers(slot, order))
    }

    /// Returns the declared type of `slot` at `order`.
    #[must_use]
    pub fn type_at(&self, slot: u16, order: i32) -> Option<&StackType> {
        self.lookup(slot, order).map(VariableLifetime::stack_type)
    }
}

impl FromIterator<VariableLifetime> for VariableTable {
    fn from_iter<I: IntoIterator<Item = VariableLifetime>>(iter: I) -> Self {
        VariableTable {
            lifetimes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> VariableTable {
        [
            VariableLifetime::new("this", "Lcom/example/Foo;", 0, 0, 12).unwrap(),
            VariableLifetime::new("name", "Ljava/lang/String;", 1, 4, 9).unwrap(),
            VariableLifetime::new("count", "I", 1, 9, 12).unwrap(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_type_at() {
        let table = table();
        assert_eq!(
            table.type_at(0, 5),
            Some(&StackType::reference("com/example/Foo"))
        );
        assert_eq!(
            table.type_at(1, 6),
            Some(&StackType::reference("java/lang/String"))
        );
        assert_eq!(table.type_at(1, 10), Some(&StackType::Int));
        assert_eq!(table.type_at(2, 5), None);
        assert_eq!(table.type_at(0, 12), None);
    }

    #[test]
    fn test_store_before_start_matches() {
        let table = table();
        // the astore at 3 initializes `name`, live from 4
        assert_eq!(table.lookup(1, 3).map(VariableLifetime::name), Some("name"));
        assert_eq!(table.lookup(1, 2), None);
    }

    #[test]
    fn test_invalid_lifetimes() {
        assert!(matches!(
            VariableLifetime::new("", "I", 0, 0, 1),
            Err(Error::Precondition(_))
        ));
        assert!(VariableLifetime::new("x", "I", 0, 5, 1).is_err());
        assert!(matches!(
            VariableLifetime::new("x", "Q", 0, 0, 1),
            Err(Error::MalformedDescriptor(_))
        ));
    }
}
