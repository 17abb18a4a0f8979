//! The closed error taxonomy for lowering (see crate docs §7).
//!
//! Every fallible core operation returns `Result<T, LowerError>`. There is
//! no partial-success contract: the first error aborts lowering of the
//! current module.

use std::fmt;

use crate::position::Position;

/// A single fatal lowering error, tagged by kind, with an optional source
/// location and an explanatory message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub message: String,
    pub at: Option<Position>,
}

/// The error taxonomy. One variant per failure family named in the spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LowerErrorKind {
    /// Referenced identifier/type/field not defined in any reachable scope.
    LookupError,
    /// Operand, argument, or assignment incompatible with the
    /// declared/expected type and not `castable`/`typeApplies`.
    TypeMismatch,
    /// No overload matches the actual argument-type list.
    DispatchError,
    /// Attempted assignment to a const, cross-module variable, or
    /// non-existent binding.
    Reassignment,
    /// Direct or indirect self-inlining detected via an ENTERFN walk.
    Recursion,
    /// Object literal missing/providing extra fields, or an empty array
    /// literal without a type annotation.
    LiteralShape,
    /// Statements after a terminating return, detected at construction.
    UnreachableCode,
    /// Malformed assignable path (leading dot, double dot, call-on-function
    /// property, and similar shape violations).
    Syntax,
}

impl LowerError {
    fn new(kind: LowerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: None,
        }
    }

    #[must_use]
    pub fn at(mut self, pos: Position) -> Self {
        self.at = Some(pos);
        self
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::new(LowerErrorKind::LookupError, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(LowerErrorKind::TypeMismatch, message)
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::new(LowerErrorKind::DispatchError, message)
    }

    pub fn reassignment(message: impl Into<String>) -> Self {
        Self::new(LowerErrorKind::Reassignment, message)
    }

    pub fn recursion(message: impl Into<String>) -> Self {
        Self::new(LowerErrorKind::Recursion, message)
    }

    pub fn literal_shape(message: impl Into<String>) -> Self {
        Self::new(LowerErrorKind::LiteralShape, message)
    }

    pub fn unreachable_code(message: impl Into<String>) -> Self {
        Self::new(LowerErrorKind::UnreachableCode, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(LowerErrorKind::Syntax, message)
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.at {
            write!(f, "{:?} at {pos}: {}", self.kind, self.message)
        } else {
            write!(f, "{:?}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for LowerError {}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LowerError>;
