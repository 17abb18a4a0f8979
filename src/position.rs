//! Source position tracking.
//!
//! The scanner/parser that produce the input parse tree are external
//! collaborators (see crate docs), so this is a thin, standalone position
//! type rather than something re-derived from an upstream source map.

use std::fmt;

/// A 0-indexed line/column position in a source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}
