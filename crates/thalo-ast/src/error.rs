//! Structured syntax errors and the value-or-error field wrapper.

use serde::{Deserialize, Serialize};
use thalo_position_tracking::Location;

/// A locally-recoverable parse error embedded in the AST.
///
/// Syntax errors are data, never `Err`: extraction continues past them so a
/// partially-broken entry still produces usable siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    /// Stable snake_case code, e.g. `unknown_directive`, `missing_timezone`
    pub code: String,
    /// Human-readable description
    pub message: String,
    /// The original text that failed to parse
    pub text: String,
    /// Where the bad text sits, block-relative
    pub location: Location,
}

impl SyntaxError {
    /// Creates a syntax error.
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        text: impl Into<String>,
        location: Location,
    ) -> Self {
        Self { code: code.into(), message: message.into(), text: text.into(), location }
    }
}

/// A header or value field that parsed, or the structured error it left behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldOrError<T> {
    /// The field parsed; its location covers the source text it came from.
    Value { value: T, location: Location },
    /// The field did not parse.
    Error(SyntaxError),
}

impl<T> FieldOrError<T> {
    /// Wraps a parsed value.
    pub fn value(value: T, location: Location) -> Self {
        FieldOrError::Value { value, location }
    }

    /// The parsed value, if any.
    pub fn ok(&self) -> Option<&T> {
        match self {
            FieldOrError::Value { value, .. } => Some(value),
            FieldOrError::Error(_) => None,
        }
    }

    /// The embedded error, if any.
    pub fn err(&self) -> Option<&SyntaxError> {
        match self {
            FieldOrError::Value { .. } => None,
            FieldOrError::Error(error) => Some(error),
        }
    }

    /// The field's location, whichever arm is present.
    pub fn location(&self) -> Location {
        match self {
            FieldOrError::Value { location, .. } => *location,
            FieldOrError::Error(error) => error.location,
        }
    }

    /// Maps the value arm, preserving errors and locations.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldOrError<U> {
        match self {
            FieldOrError::Value { value, location } => {
                FieldOrError::Value { value: f(value), location }
            }
            FieldOrError::Error(error) => FieldOrError::Error(error),
        }
    }
}
