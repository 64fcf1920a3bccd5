//! Exception handler ranges.

use std::fmt;

use crate::{Error, Result};

/// A region of the instruction stream protected by one exception handler.
///
/// The range is the half-open order interval `[start, end)`; `handler` is the order of
/// the first instruction of the handler code.
///
/// # Examples
///
/// ```rust
/// use bytescope::assembly::HandlerRange;
///
/// let range = HandlerRange::new(2, 10, 7, Some("java/io/IOException".to_string()))?;
/// assert!(range.contains(2));
/// assert!(range.contains(9));
/// assert!(!range.contains(10));
/// # Ok::<(), bytescope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRange {
    start: i32,
    end: i32,
    handler: i32,
    catch_type: Option<String>,
}

impl HandlerRange {
    /// Creates a handler range.
    ///
    /// `catch_type` is the internal name of the caught exception class, `None` for a
    /// handler that catches everything (`finally`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if an order is negative or `start > end`.
    pub fn new(start: i32, end: i32, handler: i32, catch_type: Option<String>) -> Result<Self> {
        if start < 0 || end < 0 || handler < 0 {
            return Err(Error::Precondition(format!(
                "handler range [{start}, {end}) -> {handler} uses a negative order"
            )));
        }
        if start > end {
            return Err(Error::Precondition(format!(
                "handler range start {start} lies after its end {end}"
            )));
        }

        Ok(HandlerRange {
            start,
            end,
            handler,
            catch_type,
        })
    }

    /// Order of the first protected instruction.
    #[must_use]
    pub fn start(&self) -> i32 {
        self.start
    }

    /// Order of the first instruction after the protected region.
    #[must_use]
    pub fn end(&self) -> i32 {
        self.end
    }

    /// Order of the handler entry.
    #[must_use]
    pub fn handler(&self) -> i32 {
        self.handler
    }

    /// Internal name of the caught class, `None` for catch-all handlers.
    #[must_use]
    pub fn catch_type(&self) -> Option<&str> {
        self.catch_type.as_deref()
    }

    /// Returns `true` if the instruction at `order` is protected by this handler.
    #[must_use]
    pub fn contains(&self, order: i32) -> bool {
        self.start <= order && order < self.end
    }
}

impl fmt::Display for HandlerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) -> {} catch {}",
            self.start,
            self.end,
            self.handler,
            self.catch_type.as_deref().unwrap_or("any")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let range = HandlerRange::new(2, 10, 7, None).unwrap();
        assert!(!range.contains(1));
        assert!(range.contains(5));
        assert!(!range.contains(10));
        assert_eq!(range.catch_type(), None);
        assert_eq!(range.to_string(), "[2, 10) -> 7 catch any");
    }

    #[test]
    fn test_empty_range() {
        let range = HandlerRange::new(4, 4, 6, None).unwrap();
        assert!(!range.contains(4));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(matches!(
            HandlerRange::new(5, 2, 7, None),
            Err(Error::Precondition(_))
        ));
        assert!(HandlerRange::new(-1, 2, 7, None).is_err());
    }
}
