//! The fixed built-in type catalog (crate docs §6). Installed once into the
//! root scope before any user code is lowered.

use indexmap::IndexMap;

use crate::scope::{Entity, Scope};
use crate::types::type_::Type;

fn leaf(name: &str) -> Type {
    Type::new_builtin(name, IndexMap::new())
}

fn install_leaf(scope: &Scope, name: &str) -> Type {
    let ty = leaf(name);
    scope.put(name, Entity::Type(ty.clone()));
    ty
}

fn install_template(
    scope: &Scope,
    name: &str,
    generic_names: &[&str],
    properties: impl FnOnce(&[Type]) -> IndexMap<String, Type>,
) {
    let standins: Vec<Type> = generic_names.iter().map(|n| Type::new_generic_standin(*n)).collect();
    let mut generics = IndexMap::new();
    for (idx, name) in generic_names.iter().enumerate() {
        generics.insert((*name).to_string(), idx);
    }
    let template = Type::new_template(name, generics, properties(&standins));
    scope.put(name, Entity::Type(template));
}

/// Populate `scope` (expected to be the process root scope) with every
/// built-in type the lowering pipeline may resolve by name.
pub fn install(scope: &Scope) {
    for name in [
        "void", "int8", "int16", "int32", "int64", "float32", "float64", "bool", "string",
        "function", "operator", "Self", "type", "scope", "microstatement", "InitialReduce",
    ] {
        install_leaf(scope, name);
    }

    let string_ty = scope.deep_get_type("string").expect("string installed above");
    let int64_ty = scope.deep_get_type("int64").expect("int64 installed above");

    let mut error_props = IndexMap::new();
    error_props.insert("message".to_string(), string_ty.clone());
    scope.put("Error", Entity::Type(Type::new_builtin("Error", error_props)));

    let mut event_props = IndexMap::new();
    event_props.insert("name".to_string(), string_ty.clone());
    scope.put("Event", Entity::Type(Type::new_builtin("Event", event_props)));

    let mut exec_props = IndexMap::new();
    exec_props.insert("stdout".to_string(), string_ty.clone());
    exec_props.insert("stderr".to_string(), string_ty.clone());
    exec_props.insert("exit_code".to_string(), int64_ty.clone());
    scope.put("ExecRes", Entity::Type(Type::new_builtin("ExecRes", exec_props)));

    let mut req_props = IndexMap::new();
    req_props.insert("method".to_string(), string_ty.clone());
    req_props.insert("url".to_string(), string_ty.clone());
    req_props.insert("body".to_string(), string_ty.clone());
    scope.put(
        "InternalRequest",
        Entity::Type(Type::new_builtin("InternalRequest", req_props)),
    );

    let mut resp_props = IndexMap::new();
    resp_props.insert("status".to_string(), int64_ty.clone());
    resp_props.insert("body".to_string(), string_ty.clone());
    scope.put(
        "InternalResponse",
        Entity::Type(Type::new_builtin("InternalResponse", resp_props)),
    );

    install_template(scope, "Array", &["T"], |standins| {
        let mut props = IndexMap::new();
        props.insert("element".to_string(), standins[0].clone());
        props
    });

    install_template(scope, "Seq", &["T"], |standins| {
        let mut props = IndexMap::new();
        props.insert("element".to_string(), standins[0].clone());
        props
    });

    install_template(scope, "Maybe", &["T"], |standins| {
        let mut props = IndexMap::new();
        props.insert("value".to_string(), standins[0].clone());
        props
    });

    install_template(scope, "Result", &["T", "E"], |standins| {
        let mut props = IndexMap::new();
        props.insert("value".to_string(), standins[0].clone());
        props.insert("error".to_string(), standins[1].clone());
        props
    });

    install_template(scope, "Either", &["A", "B"], |standins| {
        let mut props = IndexMap::new();
        props.insert("left".to_string(), standins[0].clone());
        props.insert("right".to_string(), standins[1].clone());
        props
    });

    install_template(scope, "KeyVal", &["K", "V"], |standins| {
        let mut props = IndexMap::new();
        props.insert("key".to_string(), standins[0].clone());
        props.insert("val".to_string(), standins[1].clone());
        props
    });
}
