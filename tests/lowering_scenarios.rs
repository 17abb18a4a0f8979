//! End-to-end lowering scenarios driven through the fixture builder rather
//! than a real parser (out of scope for this crate, see `src/ast`).

use mslower::ast::test_support::Builder;
use mslower::ast::{FunctionBody, TypeRef};
use mslower::config::LowerOptions;
use mslower::microstatement::MicrostatementKind;

/// S1. `fn inc(x: int64): int64 = x + 1`, inlined at `inc(5)`: the call
/// argument replaces `x` and the body's arithmetic is inlined in place —
/// there is no `Call` microstatement left for `inc` itself.
#[test]
fn simple_return_inlines_with_no_residual_call() {
    let scope = mslower::root_scope();
    let mut b = Builder::new();

    let x = b.var("x");
    let one = b.constant("1");
    let sum = b.binop(x, "+", one);
    let body = b.exit_with(sum);

    let def = b.function_def(
        Some("inc"),
        vec![("x", TypeRef::simple("int64"))],
        Some(TypeRef::simple("int64")),
        FunctionBody::Statements(vec![body]),
    );
    let five = b.constant("5");

    let arena = std::rc::Rc::new(std::cell::RefCell::new(b.arena));
    let (stmts, result) = mslower::lower_call(&scope, &arena, def, &[five], &LowerOptions::default()).unwrap();

    assert_eq!(result.ty.typename(), "int64");
    assert!(
        stmts.iter().all(|s| !matches!(&s.kind, MicrostatementKind::Call { function, .. } if function == "inc")),
        "the call to `inc` should have been fully inlined"
    );
    assert!(
        stmts.iter().any(|s| matches!(&s.kind, MicrostatementKind::Call { function, .. } if function == "__prim_add_i64")),
        "the body's `+` should lower to the int64 add primitive"
    );
}

/// S2. An object literal lowers through the same `newarr`/`pusharr`
/// protocol as an array literal, with fields reordered to declaration
/// order regardless of the order they're written in; field access through
/// `.` lowers to an index-keyed `register` call, not a name-keyed one.
#[test]
fn object_literal_reorders_fields_and_field_access_resolves_type() {
    let scope = mslower::root_scope();

    let mut pair_props = indexmap::IndexMap::new();
    pair_props.insert("a".to_string(), scope.deep_get_type("int64").unwrap());
    pair_props.insert("b".to_string(), scope.deep_get_type("string").unwrap());
    scope.put(
        "Pair",
        mslower::scope::Entity::Type(mslower::types::type_::Type::new_builtin("Pair", pair_props)),
    );

    let mut b = Builder::new();
    let seven = b.constant("7");
    let x_str = b.constant("\"x\"");
    // written out of declaration order: b before a
    let literal = b.object_literal(Some("Pair"), vec![("b", x_str), ("a", seven)]);
    let binding = b.let_decl("p", None, literal);
    let access = b.field_access("p", "a");
    let ret = b.exit_with(access);

    let def = b.function_def(
        Some("mk"),
        vec![],
        Some(TypeRef::simple("int64")),
        FunctionBody::Statements(vec![binding, ret]),
    );

    let arena = std::rc::Rc::new(std::cell::RefCell::new(b.arena));
    let (stmts, result) = mslower::lower_call(&scope, &arena, def, &[], &LowerOptions::default()).unwrap();

    assert_eq!(result.ty.typename(), "int64");

    let newarr_count = stmts
        .iter()
        .filter(|s| matches!(&s.kind, MicrostatementKind::Call { function, .. } if function == "newarr"))
        .count();
    assert_eq!(newarr_count, 1, "the object literal lowers through exactly one newarr call");

    let pusharr_calls: Vec<_> = stmts
        .iter()
        .filter(|s| matches!(&s.kind, MicrostatementKind::Call { function, .. } if function == "pusharr"))
        .collect();
    assert_eq!(pusharr_calls.len(), 2, "one pusharr per declared field");

    // field `a` (7) must be pushed before field `b` ("x"), matching
    // Pair's declared property order, not the literal's source order.
    let first_value_name = match &pusharr_calls[0].kind {
        MicrostatementKind::Call { args, .. } => args[1].clone(),
        _ => unreachable!(),
    };
    let first_value = stmts.iter().find(|s| s.name == first_value_name).unwrap();
    match &first_value.kind {
        MicrostatementKind::Constant(mslower::microstatement::ConstantValue::Int(7)) => {}
        other => panic!("expected the first pushed field to be `a: 7`, got {other:?}"),
    }

    // `p.a` lowers to an index-keyed `register` call retyped to `a`'s
    // declared type, not a name-keyed `getprop`.
    let register_call = stmts
        .iter()
        .find(|s| matches!(&s.kind, MicrostatementKind::Call { function, .. } if function == "register"))
        .expect("a register call for field access");
    assert_eq!(register_call.ty.typename(), "int64");
    match &register_call.kind {
        MicrostatementKind::Call { args, .. } => {
            let idx_stmt = stmts.iter().find(|s| s.name == args[1]).unwrap();
            match &idx_stmt.kind {
                MicrostatementKind::Constant(mslower::microstatement::ConstantValue::Int(0)) => {}
                other => panic!("expected field `a`'s index to be 0, got {other:?}"),
            }
        }
        _ => unreachable!(),
    }
}

/// S5. A function with an early return inside a conditional compiles to a
/// single guarded trailing result rather than multiple exit points — and
/// the `if` branch and the statements following it are each genuinely
/// gated behind their own `cond(flag, closure)` call, not spliced into the
/// body unconditionally.
#[test]
fn early_return_produces_a_single_guarded_result() {
    let scope = mslower::root_scope();
    let mut b = Builder::new();

    let cond = b.var("c");
    let one = b.constant("1");
    let ret_one = b.exit_with(one);
    let conditional = b.conditional(vec![(cond, vec![ret_one])], None);
    let two = b.constant("2");
    let ret_two = b.exit_with(two);

    let def = b.function_def(
        Some("f"),
        vec![("c", TypeRef::simple("bool"))],
        Some(TypeRef::simple("int64")),
        FunctionBody::Statements(vec![conditional, ret_two]),
    );
    let flag = b.constant("true");

    let arena = std::rc::Rc::new(std::cell::RefCell::new(b.arena));
    let (stmts, result) = mslower::lower_call(&scope, &arena, def, &[flag], &LowerOptions::default()).unwrap();

    assert_eq!(result.ty.typename(), "int64");

    let cond_calls: Vec<_> = stmts
        .iter()
        .filter(|s| matches!(&s.kind, MicrostatementKind::Call { function, .. } if function == "cond"))
        .collect();
    assert_eq!(
        cond_calls.len(),
        2,
        "the `if` branch and the guarded tail after it each gate behind their own `cond` call"
    );

    // the first `cond` call gates the `if` branch directly on `c`, and
    // the gated closure actually carries the branch's body rather than
    // having run it unconditionally.
    let first_args = match &cond_calls[0].kind {
        MicrostatementKind::Call { args, .. } => args.clone(),
        _ => unreachable!(),
    };
    let flag_stmt = stmts.iter().find(|s| s.name == first_args[0]).expect("the gating flag is a lowered statement");
    assert_eq!(flag_stmt.ty.typename(), "bool");
    let branch_closure = stmts.iter().find(|s| s.name == first_args[1]).expect("the gated closure body");
    match &branch_closure.kind {
        MicrostatementKind::ClosureBody(inner) => assert!(
            !inner.is_empty(),
            "the `if` branch's body must sit inside the gated closure, not be spliced in unconditionally"
        ),
        other => panic!("expected a ClosureBody, got {other:?}"),
    }

    // `return 2` after the `if` is itself gated behind a second
    // `cond(retNotSet, ...)` call rather than running unconditionally.
    let second_args = match &cond_calls[1].kind {
        MicrostatementKind::Call { args, .. } => args.clone(),
        _ => unreachable!(),
    };
    let tail_closure = stmts.iter().find(|s| s.name == second_args[1]).expect("the guarded tail's closure body");
    match &tail_closure.kind {
        MicrostatementKind::ClosureBody(inner) => assert!(!inner.is_empty(), "the guarded tail must carry `return 2`'s body"),
        other => panic!("expected a ClosureBody, got {other:?}"),
    }

    assert!(
        stmts.iter().filter(|s| matches!(s.kind, MicrostatementKind::Return { .. })).count() == 0,
        "a guarded body should have no hard Return microstatement"
    );
    assert!(
        stmts.iter().all(|s| !matches!(&s.kind, MicrostatementKind::Call { function, .. } if function == "select")),
        "the guarded result surfaces directly as `retVal`, not through an invented merge primitive"
    );
}

/// S6. Direct self-recursion is rejected during inlining rather than
/// expanded into an infinite body.
#[test]
fn direct_self_recursion_is_a_hard_error() {
    let scope = mslower::root_scope();
    let mut b = Builder::new();

    let call = b.call("f", vec![]);
    let body = b.exit_with(call);
    let def = b.function_def(Some("f"), vec![], Some(TypeRef::simple("int64")), FunctionBody::Statements(vec![body]));

    let arena = std::rc::Rc::new(std::cell::RefCell::new(b.arena));
    let err = mslower::lower_call(&scope, &arena, def, &[], &LowerOptions::default()).unwrap_err();
    assert_eq!(err.kind, mslower::error::LowerErrorKind::Recursion);
}

/// Dispatch is deterministic and "last wins": repeated dispatch against the
/// same overload set always picks the same (most-recently-registered
/// applicable) overload, never alternating.
#[test]
fn dispatch_is_deterministic_last_wins_across_repeated_calls() {
    let scope = mslower::root_scope();
    let mut b = Builder::new();

    let a = b.var("a");
    let ret = b.exit_with(a);
    let def1 = b.function_def(
        Some("id"),
        vec![("a", TypeRef::simple("int64"))],
        Some(TypeRef::simple("int64")),
        FunctionBody::Statements(vec![ret]),
    );

    let a2 = b.var("a");
    let ret2 = b.exit_with(a2);
    let def2 = b.function_def(
        Some("id"),
        vec![("a", TypeRef::simple("int64"))],
        Some(TypeRef::simple("int64")),
        FunctionBody::Statements(vec![ret2]),
    );

    let arena = std::rc::Rc::new(std::cell::RefCell::new(b.arena));
    mslower::lowering::decl::register_function_def(def1, &arena, &scope).unwrap();
    let second_registration = mslower::lowering::decl::register_function_def(def2, &arena, &scope).unwrap();

    let overloads = scope.deep_get_functions("id").expect("`id` registered");
    let int64 = scope.deep_get_type("int64").unwrap();

    let (first_pick, _) = mslower::userfunction::UserFunction::dispatch(&overloads, &[int64.clone()], &scope).unwrap();
    let (second_pick, _) = mslower::userfunction::UserFunction::dispatch(&overloads, &[int64], &scope).unwrap();

    assert!(std::rc::Rc::ptr_eq(&first_pick, &second_pick), "dispatch must be stable across repeated calls");
    assert!(
        std::rc::Rc::ptr_eq(&first_pick, &second_registration),
        "the most recently registered applicable overload must win"
    );
}
