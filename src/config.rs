//! Compiler options for the lowering pipeline.
//!
//! Grounded on the teacher's `CheckerOptions` (a flat struct of strictness
//! toggles threaded through the checker); this core has a much narrower set
//! of concerns, so the toggles here are specific to lowering rather than to
//! full type checking.

/// Options threaded through every lowering entry point.
#[derive(Debug, Clone)]
pub struct LowerOptions {
    /// When true, `Type::castable` is never consulted outside the
    /// emit-to-event boundary; a cast attempted elsewhere becomes a hard
    /// `TypeMismatch` instead of a silent widen (see crate docs, open
    /// question: cast widening policy).
    pub strict_casts: bool,

    /// When true, statements after a terminating return are a `warn!` log
    /// event instead of a hard `UnreachableCode` error.
    pub allow_unreachable_code: bool,

    /// Recursion/instantiation depth ceiling for `solidify`, `realize`, and
    /// function inlining. Exceeding it raises a `LowerError` instead of
    /// overflowing the stack.
    pub max_instantiation_depth: u32,

    /// When true, every appended microstatement is also rendered (see
    /// crate docs §6) to a `tracing::trace!` event.
    pub trace_microstatements: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            strict_casts: true,
            allow_unreachable_code: false,
            max_instantiation_depth: 256,
            trace_microstatements: false,
        }
    }
}

impl LowerOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_trace_microstatements(mut self, yes: bool) -> Self {
        self.trace_microstatements = yes;
        self
    }

    #[must_use]
    pub fn with_allow_unreachable_code(mut self, yes: bool) -> Self {
        self.allow_unreachable_code = yes;
        self
    }

    #[must_use]
    pub fn with_max_instantiation_depth(mut self, depth: u32) -> Self {
        self.max_instantiation_depth = depth;
        self
    }
}
