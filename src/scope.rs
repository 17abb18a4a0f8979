//! Nested lexical scopes (crate docs §4.1): every declaration — types,
//! function overload sets, operators, events, constants, and already-lowered
//! values — lives in one `FxHashMap` per scope, with lookup falling back
//! through a primary parent chain and then a secondary parent (used for
//! closures reaching into their defining scope after exhausting their own
//! block chain).

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::constant::ConstantDecl;
use crate::event::Event;
use crate::microstatement::Microstatement;
use crate::types::interface::OperatorDef;
use crate::types::type_::Type;
use crate::userfunction::UserFunction;

/// Anything a name can resolve to within a scope.
#[derive(Clone, Debug)]
pub enum Entity {
    Type(Type),
    Functions(Vec<Rc<UserFunction>>),
    Operators(Vec<Rc<OperatorDef>>),
    Event(Rc<Event>),
    Constant(Rc<ConstantDecl>),
    Value(Rc<Microstatement>),
}

#[derive(Debug)]
struct ScopeData {
    name: String,
    vals: FxHashMap<String, Entity>,
    parent: Option<Scope>,
    secondary_parent: Option<Scope>,
}

/// A lexical scope. Cheap to clone (`Rc<RefCell<_>>` underneath); clones
/// share mutable storage, matching the teacher's shared-scope-handle idiom.
#[derive(Clone, Debug)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(ScopeData {
            name: name.into(),
            vals: FxHashMap::default(),
            parent: None,
            secondary_parent: None,
        })))
    }

    /// A child scope (e.g. a function body) chained to `self` as its
    /// primary parent.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let child = Self::new(name);
        child.0.borrow_mut().parent = Some(self.clone());
        child
    }

    /// Attach a secondary parent (a closure's defining scope), consulted
    /// only after the primary chain is exhausted.
    pub fn set_secondary_parent(&self, parent: Scope) {
        self.0.borrow_mut().secondary_parent = Some(parent);
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn put(&self, name: impl Into<String>, entity: Entity) {
        self.0.borrow_mut().vals.insert(name.into(), entity);
    }

    pub fn put_function(&self, name: &str, func: Rc<UserFunction>) {
        let mut data = self.0.borrow_mut();
        match data.vals.get_mut(name) {
            Some(Entity::Functions(overloads)) => overloads.push(func),
            _ => {
                data.vals.insert(name.to_string(), Entity::Functions(vec![func]));
            }
        }
    }

    pub fn put_operator(&self, op: Rc<OperatorDef>) {
        let symbol = op.symbol.clone();
        let mut data = self.0.borrow_mut();
        match data.vals.get_mut(&symbol) {
            Some(Entity::Operators(overloads)) => overloads.push(op),
            _ => {
                data.vals.insert(symbol, Entity::Operators(vec![op]));
            }
        }
    }

    /// Local-only lookup: does not walk parents.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Entity> {
        self.0.borrow().vals.get(name).cloned()
    }

    /// Walk the primary parent chain first (innermost to outermost), then
    /// fall back to the secondary parent chain if nothing was found
    /// (crate docs §4.1's `deepGet`).
    #[must_use]
    pub fn deep_get(&self, name: &str) -> Option<Entity> {
        let mut cur = Some(self.clone());
        while let Some(scope) = cur {
            if let Some(entity) = scope.get(name) {
                return Some(entity);
            }
            cur = scope.0.borrow().parent.clone();
        }

        let mut cur = self.0.borrow().secondary_parent.clone();
        while let Some(scope) = cur {
            if let Some(entity) = scope.get(name) {
                return Some(entity);
            }
            cur = scope.0.borrow().parent.clone();
        }
        None
    }

    #[must_use]
    pub fn deep_get_type(&self, name: &str) -> Option<Type> {
        match self.deep_get(name) {
            Some(Entity::Type(t)) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn deep_get_functions(&self, name: &str) -> Option<Vec<Rc<UserFunction>>> {
        match self.deep_get(name) {
            Some(Entity::Functions(fns)) => Some(fns),
            _ => None,
        }
    }

    #[must_use]
    pub fn deep_get_constant(&self, name: &str) -> Option<Rc<ConstantDecl>> {
        match self.deep_get(name) {
            Some(Entity::Constant(c)) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn deep_get_event(&self, name: &str) -> Option<Rc<Event>> {
        match self.deep_get(name) {
            Some(Entity::Event(e)) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::type_::Type;
    use indexmap::IndexMap;

    #[test]
    fn child_walks_primary_parent_chain() {
        let root = Scope::new("root");
        let int64 = Type::new_builtin("int64", IndexMap::new());
        root.put("int64", Entity::Type(int64));
        let child = root.child("inner");
        assert!(matches!(child.deep_get("int64"), Some(Entity::Type(_))));
        assert!(child.get("int64").is_none());
    }

    #[test]
    fn secondary_parent_only_consulted_after_primary_exhausted() {
        let outer = Scope::new("outer");
        let defining = Scope::new("defining");
        defining.put("x", Entity::Type(Type::new_builtin("string", IndexMap::new())));
        let child = outer.child("closure_body");
        child.set_secondary_parent(defining);
        assert!(child.deep_get("x").is_some());

        let shadow_outer = Scope::new("outer2");
        shadow_outer.put("x", Entity::Type(Type::new_builtin("int64", IndexMap::new())));
        let child2 = shadow_outer.child("closure_body2");
        child2.put("x", Entity::Type(Type::new_builtin("bool", IndexMap::new())));
        assert_eq!(
            match child2.deep_get("x") {
                Some(Entity::Type(t)) => t.typename().to_string(),
                _ => String::new(),
            },
            "bool"
        );
    }

    #[test]
    fn put_function_accumulates_overloads() {
        let scope = Scope::new("root");
        let ty = Type::new_builtin("int64", IndexMap::new());
        let arena = crate::ast::SharedArena::default();
        let f1 = Rc::new(crate::userfunction::UserFunction::new(
            "f",
            vec![("a".to_string(), ty.clone())],
            ty.clone(),
            crate::ast::FunctionBody::Statements(Vec::new()),
            arena.clone(),
            scope.clone(),
        ));
        let f2 = Rc::new(crate::userfunction::UserFunction::new(
            "f",
            vec![("a".to_string(), ty.clone()), ("b".to_string(), ty.clone())],
            ty,
            crate::ast::FunctionBody::Statements(Vec::new()),
            arena,
            scope.clone(),
        ));
        scope.put_function("f", f1);
        scope.put_function("f", f2);
        assert_eq!(scope.deep_get_functions("f").unwrap().len(), 2);
    }
}
