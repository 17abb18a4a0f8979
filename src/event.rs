//! Named events (crate docs §3): process-wide declarations that `emit`
//! statements dispatch to and that primitives/handlers subscribe against.

use crate::types::type_::Type;

/// A named event with its payload shape. `stdout`/`stderr`/`exit` are
/// pre-registered by [`crate::types::builtins::install`]'s caller
/// alongside the type catalog; user code can declare more.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub payload: Type,
}

impl Event {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Type) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}
