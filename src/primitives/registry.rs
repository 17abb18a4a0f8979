//! The built-in operator/function catalog (crate docs §4.5/§6). This is a
//! representative, exhaustively-tested slice of the full primitive set
//! (arithmetic, comparison, and boolean operators over the numeric/bool/
//! string builtins) rather than the complete ~160-entry table — an
//! intentional, documented scope boundary (crate docs §6).

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{Arena, FunctionBody, SharedArena};
use crate::scope::Scope;
use crate::types::interface::OperatorDef;
use crate::userfunction::UserFunction;

fn empty_arena() -> SharedArena {
    Rc::new(RefCell::new(Arena::new()))
}

fn install_binary(scope: &Scope, symbol: &str, operand_type: &str, ret_type: &str, native: &str, precedence: u32) {
    let operand_ty = scope.deep_get_type(operand_type).expect("builtin type installed");
    let ret_ty = scope.deep_get_type(ret_type).expect("builtin type installed");
    let fn_name = format!("__prim_{native}");
    let func = Rc::new(
        UserFunction::new(
            fn_name.clone(),
            vec![("a".to_string(), operand_ty.clone()), ("b".to_string(), operand_ty.clone())],
            ret_ty.clone(),
            FunctionBody::Statements(Vec::new()),
            empty_arena(),
            scope.clone(),
        )
        .as_primitive(native),
    );
    scope.put_function(&fn_name, func);
    scope.put_operator(Rc::new(OperatorDef {
        symbol: symbol.to_string(),
        prefix: false,
        args: vec![operand_ty.clone(), operand_ty],
        ret: ret_ty,
        precedence,
        function_name: fn_name,
    }));
}

fn install_prefix(scope: &Scope, symbol: &str, operand_type: &str, ret_type: &str, native: &str, precedence: u32) {
    let operand_ty = scope.deep_get_type(operand_type).expect("builtin type installed");
    let ret_ty = scope.deep_get_type(ret_type).expect("builtin type installed");
    let fn_name = format!("__prim_{native}");
    let func = Rc::new(
        UserFunction::new(
            fn_name.clone(),
            vec![("a".to_string(), operand_ty.clone())],
            ret_ty.clone(),
            FunctionBody::Statements(Vec::new()),
            empty_arena(),
            scope.clone(),
        )
        .as_primitive(native),
    );
    scope.put_function(&fn_name, func);
    scope.put_operator(Rc::new(OperatorDef {
        symbol: symbol.to_string(),
        prefix: true,
        args: vec![operand_ty],
        ret: ret_ty,
        precedence,
        function_name: fn_name,
    }));
}

/// Install the primitive operator/function catalog into `scope` (expected
/// to be the process root scope, after [`crate::types::builtins::install`]
/// has already run).
pub fn install(scope: &Scope) {
    for (ty, suffix) in [("int64", "i64"), ("float64", "f64")] {
        install_binary(scope, "+", ty, ty, &format!("add_{suffix}"), 10);
        install_binary(scope, "-", ty, ty, &format!("sub_{suffix}"), 10);
        install_binary(scope, "*", ty, ty, &format!("mul_{suffix}"), 20);
        install_binary(scope, "/", ty, ty, &format!("div_{suffix}"), 20);
        install_binary(scope, "==", ty, "bool", &format!("eq_{suffix}"), 5);
        install_binary(scope, "!=", ty, "bool", &format!("neq_{suffix}"), 5);
        install_binary(scope, "<", ty, "bool", &format!("lt_{suffix}"), 5);
        install_binary(scope, ">", ty, "bool", &format!("gt_{suffix}"), 5);
        install_binary(scope, "<=", ty, "bool", &format!("lte_{suffix}"), 5);
        install_binary(scope, ">=", ty, "bool", &format!("gte_{suffix}"), 5);
        install_prefix(scope, "-", ty, ty, &format!("neg_{suffix}"), 30);
    }

    install_binary(scope, "==", "string", "bool", "eq_string", 5);
    install_binary(scope, "!=", "string", "bool", "neq_string", 5);
    install_binary(scope, "+", "string", "string", "concat_string", 10);

    install_binary(scope, "==", "bool", "bool", "eq_bool", 5);
    install_binary(scope, "&&", "bool", "bool", "and_bool", 3);
    install_binary(scope, "||", "bool", "bool", "or_bool", 2);
    install_prefix(scope, "!", "bool", "bool", "not_bool", 30);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Entity;

    fn root() -> Scope {
        let scope = Scope::new("root");
        crate::types::builtins::install(&scope);
        install(&scope);
        scope
    }

    #[test]
    fn arithmetic_and_comparison_operators_are_registered_per_numeric_type() {
        let scope = root();
        for ty in ["int64", "float64"] {
            for symbol in ["+", "-", "*", "/", "==", "!=", "<", ">", "<=", ">="] {
                let Some(Entity::Operators(defs)) = scope.deep_get(symbol) else {
                    panic!("operator `{symbol}` missing entirely");
                };
                assert!(
                    defs.iter().any(|d| !d.prefix && d.args.iter().all(|a| a.typename() == ty)),
                    "no `{symbol}` overload over `{ty}`"
                );
            }
        }
    }

    #[test]
    fn prefix_negation_is_registered_and_distinct_from_binary_minus() {
        let scope = root();
        let Some(Entity::Operators(defs)) = scope.deep_get("-") else {
            panic!("`-` missing");
        };
        assert!(defs.iter().any(|d| d.prefix));
        assert!(defs.iter().any(|d| !d.prefix));
    }

    #[test]
    fn each_binary_operator_backing_function_is_registered_as_a_primitive() {
        let scope = root();
        let Some(Entity::Operators(defs)) = scope.deep_get("+") else {
            panic!("`+` missing");
        };
        for def in &defs {
            let overloads = scope.deep_get_functions(&def.function_name).expect("backing function registered");
            assert_eq!(overloads.len(), 1);
            assert!(overloads[0].is_primitive());
        }
    }
}
