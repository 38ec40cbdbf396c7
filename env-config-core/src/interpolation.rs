//! `{dotted.path}` interpolation over the raw YAML tree.
//!
//! Any string under `profile` may reference another scalar in the same document,
//! including the injected `env` section:
//!
//! ```yaml
//! vars:
//!   base: private
//! profile:
//!   aws:
//!     key: '{vars.base}/key'
//!   db:
//!     password: '{env.DB_PASS}/456'
//! ```
//!
//! `{{` and `}}` produce literal braces.

use crate::{ParseError, scalar_to_string};
use serde_yaml::Value;

/// A segment of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Reference to a dotted path in the document: `{a.b}`
    Reference(String),
}

/// Split a string into literal and reference segments.
///
/// # Errors
///
/// Returns `ParseError::Interpolation` for an unterminated `{`, an empty
/// reference `{}` or a stray single `}`.
pub fn parse_interpolation(input: &str) -> Result<Vec<Segment>, ParseError> {
    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current_literal = String::new();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                current_literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                current_literal.push('}');
            }
            '{' => {
                if !current_literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                }

                let mut path = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    path.push(c);
                }

                if !closed {
                    return Err(ParseError::Interpolation(format!(
                        "unterminated '{{' in '{}'",
                        input
                    )));
                }
                let path = path.trim();
                if path.is_empty() {
                    return Err(ParseError::Interpolation(format!(
                        "empty reference in '{}'",
                        input
                    )));
                }
                segments.push(Segment::Reference(path.to_string()));
            }
            '}' => {
                return Err(ParseError::Interpolation(format!(
                    "single '}}' in '{}' (use '}}}}' for a literal brace)",
                    input
                )));
            }
            _ => current_literal.push(c),
        }
    }

    if !current_literal.is_empty() {
        segments.push(Segment::Literal(current_literal));
    }

    Ok(segments)
}

/// Resolves references against one document, detecting reference cycles.
pub(crate) struct Interpolator<'a> {
    root: &'a Value,
    stack: Vec<String>,
}

impl<'a> Interpolator<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Self {
            root,
            stack: Vec::new(),
        }
    }

    pub(crate) fn interpolate(&mut self, input: &str) -> Result<String, ParseError> {
        let mut result = String::with_capacity(input.len());
        for segment in parse_interpolation(input)? {
            match segment {
                Segment::Literal(text) => result.push_str(&text),
                Segment::Reference(path) => result.push_str(&self.lookup(&path)?),
            }
        }
        Ok(result)
    }

    fn lookup(&mut self, path: &str) -> Result<String, ParseError> {
        if self.stack.iter().any(|p| p == path) {
            return Err(ParseError::Interpolation(format!(
                "reference cycle: {} -> {}",
                self.stack.join(" -> "),
                path
            )));
        }

        let mut node = self.root;
        for part in path.split('.') {
            let next = match node {
                Value::Mapping(map) => map.get(part),
                Value::Sequence(seq) => part.parse::<usize>().ok().and_then(|i| seq.get(i)),
                _ => None,
            };
            node = next.ok_or_else(|| {
                ParseError::Interpolation(format!("unknown reference '{{{}}}'", path))
            })?;
        }

        match node {
            Value::String(s) => {
                self.stack.push(path.to_string());
                let resolved = self.interpolate(s);
                self.stack.pop();
                resolved
            }
            other => scalar_to_string(other).ok_or_else(|| {
                ParseError::Interpolation(format!(
                    "reference '{{{}}}' does not point at a scalar value",
                    path
                ))
            }),
        }
    }
}
