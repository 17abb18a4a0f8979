//! The primitive catalog: operators, higher-order array functions, and
//! the sequence/self-recursion family (crate docs §4.5).

pub mod higher_order;
pub mod registry;
pub mod sequence;

use crate::scope::Scope;

/// Install every primitive into `scope` (expected to already have the
/// built-in type catalog installed via [`crate::types::builtins::install`]).
pub fn install(scope: &Scope) {
    registry::install(scope);
    higher_order::install(scope);
    sequence::install(scope);
}
