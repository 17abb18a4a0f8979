//! The type system: solidification, structural typing, and the built-in
//! type catalog (crate docs §4.2/§6).

pub mod builtins;
pub mod interface;
pub mod type_;

use type_::Type;

/// A small identity-keyed association from generic standins / interface
/// types to the concrete `Type` each was bound to while matching a single
/// call site (crate docs §4.2). Cleared per dispatch attempt; never
/// shared across unrelated calls.
///
/// Backed by a `Vec` rather than a hash map: entries are keyed by `Rc`
/// pointer identity (`Type::ptr_eq`), and these maps hold at most a
/// handful of bindings per call, so a linear scan is both correct and
/// simpler than a custom `Hash` impl over pointer identity.
#[derive(Default, Debug)]
pub struct InterfaceMap {
    bindings: Vec<(Type, Type)>,
}

impl InterfaceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Type, value: Type) {
        if let Some(slot) = self.bindings.iter_mut().find(|(k, _)| k.ptr_eq(&key)) {
            slot.1 = value;
        } else {
            self.bindings.push((key, value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &Type) -> Option<&Type> {
        self.bindings
            .iter()
            .find(|(k, _)| k.ptr_eq(key))
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Type, Type)> {
        self.bindings.iter()
    }
}
