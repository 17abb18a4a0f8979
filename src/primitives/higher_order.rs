//! Higher-order array primitives (crate docs §4.5): `map`/`each`/`filter`
//! over `Array<T>`, each taking a closure argument. The declared signature
//! installed here gives `map`'s `U` no binding site among its *formal*
//! parameters (`U` never appears in `args`, only in `ret`) — at an actual
//! call site, `UserFunction::inline_call` traces the closure argument back
//! to its `UserFunction` and recomputes `U` from the closure's own
//! realized return type instead (`userfunction::inline_higher_order`).

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{Arena, FunctionBody, SharedArena};
use crate::scope::{Entity, Scope};
use crate::userfunction::UserFunction;

fn empty_arena() -> SharedArena {
    Rc::new(RefCell::new(Arena::new()))
}

pub fn install(scope: &Scope) {
    let generics_scope = scope.child("__higher_order_generics");
    let t = crate::types::type_::Type::new_generic_standin("T");
    let u = crate::types::type_::Type::new_generic_standin("U");
    generics_scope.put("T", Entity::Type(t.clone()));
    generics_scope.put("U", Entity::Type(u.clone()));

    let array_template = scope.deep_get_type("Array").expect("Array builtin installed");
    let array_of_t = array_template
        .solidify(&["T".to_string()], &generics_scope)
        .expect("Array<T> solidifies");
    let array_of_u = array_template
        .solidify(&["U".to_string()], &generics_scope)
        .expect("Array<U> solidifies");

    let function_ty = crate::types::type_::Type::new_builtin("function", indexmap::IndexMap::new());
    let void_ty = scope.deep_get_type("void").expect("void builtin installed");

    install_one(scope, "map", vec![("arr", array_of_t.clone()), ("fn", function_ty.clone())], array_of_u, "arr_map");
    install_one(scope, "each", vec![("arr", array_of_t.clone()), ("fn", function_ty.clone())], void_ty, "arr_each");
    install_one(scope, "filter", vec![("arr", array_of_t.clone()), ("fn", function_ty)], array_of_t, "arr_filter");
}

fn install_one(
    scope: &Scope,
    name: &str,
    args: Vec<(&str, crate::types::type_::Type)>,
    ret: crate::types::type_::Type,
    native: &str,
) {
    let args = args.into_iter().map(|(n, t)| (n.to_string(), t)).collect();
    let func = Rc::new(
        UserFunction::new(name.to_string(), args, ret, FunctionBody::Statements(Vec::new()), empty_arena(), scope.clone())
            .as_primitive(native),
    );
    scope.put_function(name, func);
}
