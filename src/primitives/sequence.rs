//! The sequence/self-recursion primitive family (crate docs §4.5): the
//! only place true recursion is legal. Rather than inlining a recursive
//! body (which `UserFunction::inline_call` hard-errors on, crate docs
//! §4.3), `reduce` is an opaque native call — the runtime drives the
//! iteration. Its declared return type here is a generic standin `U` that
//! never appears in any formal parameter, so it can never be bound by
//! ordinary argument-type dispatch; `UserFunction::inline_call` recomputes
//! it at the call site from the closure argument's own return type
//! instead (`userfunction::inline_higher_order`).

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{Arena, FunctionBody, SharedArena};
use crate::scope::{Entity, Scope};
use crate::userfunction::UserFunction;

fn empty_arena() -> SharedArena {
    Rc::new(RefCell::new(Arena::new()))
}

pub fn install(scope: &Scope) {
    let generics_scope = scope.child("__sequence_generics");
    let t = crate::types::type_::Type::new_generic_standin("T");
    let u = crate::types::type_::Type::new_generic_standin("U");
    generics_scope.put("T", Entity::Type(t));
    generics_scope.put("U", Entity::Type(u.clone()));

    let seq_template = scope.deep_get_type("Seq").expect("Seq builtin installed");
    let seq_of_t = seq_template
        .solidify(&["T".to_string()], &generics_scope)
        .expect("Seq<T> solidifies");
    let initial_reduce = scope.deep_get_type("InitialReduce").expect("InitialReduce builtin installed");
    let function_ty = crate::types::type_::Type::new_builtin("function", indexmap::IndexMap::new());

    let args = vec![
        ("seq".to_string(), seq_of_t),
        ("init".to_string(), initial_reduce),
        ("fn".to_string(), function_ty),
    ];
    let func = Rc::new(
        UserFunction::new("reduce".to_string(), args, u, FunctionBody::Statements(Vec::new()), empty_arena(), scope.clone())
            .as_primitive("seq_reduce"),
    );
    scope.put_function("reduce", func);
}
