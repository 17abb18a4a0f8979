//! Lazy constant declarations (crate docs §4): a top-level `const` is not
//! lowered until something actually references it, and the result is
//! memoized so a constant referenced from a dozen call sites is only
//! lowered once.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{NodeId, SharedArena, TypeRef};
use crate::microstatement::Microstatement;

#[derive(Debug)]
pub struct ConstantDecl {
    pub name: String,
    pub type_ann: Option<TypeRef>,
    pub value: NodeId,
    pub arena: SharedArena,
    resolved: RefCell<Option<Rc<Microstatement>>>,
}

impl ConstantDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, type_ann: Option<TypeRef>, value: NodeId, arena: SharedArena) -> Self {
        Self {
            name: name.into(),
            type_ann,
            value,
            arena,
            resolved: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn resolved(&self) -> Option<Rc<Microstatement>> {
        self.resolved.borrow().clone()
    }

    pub fn set_resolved(&self, value: Rc<Microstatement>) {
        *self.resolved.borrow_mut() = Some(value);
    }
}
