//! JVM field and method descriptor parsing (JVMS §4.3).
//!
//! Descriptors are reduced straight to [`StackType`]s: `boolean`, `byte`, `char` and
//! `short` collapse to `int`, object types keep their internal name and array types keep
//! their full descriptor.

use crate::{assembly::stack::StackType, Error, Result};

/// Parses a field descriptor such as `I`, `Ljava/lang/String;` or `[[J`.
///
/// # Errors
///
/// Returns [`Error::MalformedDescriptor`] for empty, truncated or trailing input and for
/// `V`, which is not a field type.
pub fn parse_field_type(descriptor: &str) -> Result<StackType> {
    let bytes = descriptor.as_bytes();
    let mut pos = 0;
    let parsed = parse_type(descriptor, bytes, &mut pos, false)?;
    if pos != bytes.len() {
        return Err(Error::MalformedDescriptor(format!(
            "trailing characters in field descriptor '{descriptor}'"
        )));
    }
    Ok(parsed)
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Parameter types in declaration order
    pub parameters: Vec<StackType>,
    /// Return type, [`StackType::Void`] for `V`
    pub returns: StackType,
}

impl MethodDescriptor {
    /// Parses a method descriptor such as `(ILjava/lang/String;)V`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDescriptor`] if the input is not a well-formed method
    /// descriptor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bytescope::assembly::{MethodDescriptor, StackType};
    ///
    /// let desc = MethodDescriptor::parse("(J[I)Ljava/lang/Object;")?;
    /// assert_eq!(desc.parameters, vec![StackType::Long, StackType::reference("[I")]);
    /// assert_eq!(desc.returns, StackType::reference("java/lang/Object"));
    /// # Ok::<(), bytescope::Error>(())
    /// ```
    pub fn parse(descriptor: &str) -> Result<Self> {
        let bytes = descriptor.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(Error::MalformedDescriptor(format!(
                "method descriptor '{descriptor}' does not start with '('"
            )));
        }

        let mut pos = 1;
        let mut parameters = Vec::new();
        loop {
            match bytes.get(pos) {
                Some(b')') => {
                    pos += 1;
                    break;
                }
                Some(_) => parameters.push(parse_type(descriptor, bytes, &mut pos, false)?),
                None => {
                    return Err(Error::MalformedDescriptor(format!(
                        "unterminated parameter list in '{descriptor}'"
                    )))
                }
            }
        }

        let returns = parse_type(descriptor, bytes, &mut pos, true)?;
        if pos != bytes.len() {
            return Err(Error::MalformedDescriptor(format!(
                "trailing characters in method descriptor '{descriptor}'"
            )));
        }

        Ok(MethodDescriptor {
            parameters,
            returns,
        })
    }

    /// Returns the number of stack words taken by the parameters.
    #[must_use]
    pub fn parameter_words(&self) -> usize {
        self.parameters.iter().map(StackType::words).sum()
    }
}

fn parse_type(descriptor: &str, bytes: &[u8], pos: &mut usize, allow_void: bool) -> Result<StackType> {
    let start = *pos;
    let Some(&tag) = bytes.get(start) else {
        return Err(Error::MalformedDescriptor(format!(
            "missing type in '{descriptor}'"
        )));
    };
    *pos += 1;

    let parsed = match tag {
        b'B' | b'C' | b'I' | b'S' | b'Z' => StackType::Int,
        b'J' => StackType::Long,
        b'F' => StackType::Float,
        b'D' => StackType::Double,
        b'V' if allow_void => StackType::Void,
        b'L' => {
            let end = bytes[start..]
                .iter()
                .position(|&b| b == b';')
                .map(|offset| start + offset)
                .ok_or_else(|| {
                    Error::MalformedDescriptor(format!("unterminated class name in '{descriptor}'"))
                })?;
            if end == start + 1 {
                return Err(Error::MalformedDescriptor(format!(
                    "empty class name in '{descriptor}'"
                )));
            }
            *pos = end + 1;
            StackType::reference(&descriptor[start + 1..end])
        }
        b'[' => {
            parse_type(descriptor, bytes, pos, false)?;
            StackType::reference(&descriptor[start..*pos])
        }
        other => {
            return Err(Error::MalformedDescriptor(format!(
                "unexpected '{}' in '{descriptor}'",
                other as char
            )))
        }
    };
    Ok(parsed)
}
