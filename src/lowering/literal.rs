//! Literal lowering (crate docs §4.4): numeric/string/bool constant
//! tokens, object literals (structural field-by-field construction), and
//! array literals (the `newarr`/`pusharr` builder protocol). Object
//! literals use the exact same protocol as array literals — a type's
//! storage is just an array keyed by declared property index (crate docs
//! §4.4, scenario S2, testable property #6).

use std::rc::Rc;

use crate::ast::{Arena, NodeId};
use crate::error::{LowerError, Result};
use crate::microstatement::{ConstantValue, Microstatement, MicrostatementBuffer, MicrostatementKind};
use crate::scope::Scope;
use crate::types::type_::Type;

pub fn lower_constant(lexeme: &str, scope: &Scope, buffer: &mut MicrostatementBuffer) -> Result<Rc<Microstatement>> {
    let (value, type_name) = if lexeme == "true" || lexeme == "false" {
        (ConstantValue::Bool(lexeme == "true"), "bool")
    } else if lexeme.starts_with('"') && lexeme.ends_with('"') && lexeme.len() >= 2 {
        (ConstantValue::Str(lexeme[1..lexeme.len() - 1].to_string()), "string")
    } else if lexeme.contains('.') {
        let parsed = lexeme
            .parse::<f64>()
            .map_err(|_| LowerError::syntax(format!("malformed float literal `{lexeme}`")))?;
        (ConstantValue::Float(parsed), "float64")
    } else {
        let parsed = lexeme
            .parse::<i64>()
            .map_err(|_| LowerError::syntax(format!("malformed integer literal `{lexeme}`")))?;
        (ConstantValue::Int(parsed), "int64")
    };

    let ty = scope
        .deep_get_type(type_name)
        .ok_or_else(|| LowerError::lookup(format!("builtin type `{type_name}` is not installed")))?;
    Ok(buffer.push(MicrostatementKind::Constant(value), ty, None))
}

/// `"8"` for the fixed-width primitives that store inline, `"0"` for
/// everything else (`string`, compound/user types), crate docs §4.4
/// testable property #7.
fn element_size(ty: &Type) -> &'static str {
    match ty.typename() {
        "int64" | "float64" | "bool" => "8",
        _ => "0",
    }
}

/// Shared `newarr(count)` + one `pusharr(arr, value, size)` per element
/// protocol behind both object and array literals: `n` elements produce
/// `n + 1` CONSTDEC/CALL pairs total.
fn lower_newarr_pusharr(
    scope: &Scope,
    elements: &[(Rc<Microstatement>, Type)],
    result_ty: Type,
    buffer: &mut MicrostatementBuffer,
) -> Result<Rc<Microstatement>> {
    let int64_ty = scope
        .deep_get_type("int64")
        .ok_or_else(|| LowerError::lookup("builtin type `int64` is not installed"))?;

    let count_const = buffer.push(MicrostatementKind::Constant(ConstantValue::Int(elements.len() as i64)), int64_ty.clone(), None);
    let mut arr = buffer.push(
        MicrostatementKind::Call {
            function: "newarr".to_string(),
            args: smallvec::smallvec![count_const.name.clone()],
        },
        result_ty.clone(),
        None,
    );

    for (value, value_ty) in elements {
        let size_lexeme: i64 = element_size(value_ty).parse().expect("element_size returns a valid int64 lexeme");
        let size_const = buffer.push(MicrostatementKind::Constant(ConstantValue::Int(size_lexeme)), int64_ty.clone(), None);
        let name = arr.name.clone();
        arr = buffer.push_named(
            name,
            MicrostatementKind::Call {
                function: "pusharr".to_string(),
                args: smallvec::smallvec![arr.name.clone(), value.name.clone(), size_const.name.clone()],
            },
            result_ty.clone(),
            None,
        );
    }

    Ok(arr)
}

pub fn lower_object_literal(
    type_name: Option<&str>,
    fields: &[(String, NodeId)],
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    let type_name = type_name.ok_or_else(|| {
        LowerError::literal_shape("object literals need an explicit type name in this core")
    })?;
    let ty = Type::resolve_name(type_name, scope)?;

    let mut elements = Vec::with_capacity(ty.properties().len());
    {
        let missing: Vec<&str> = ty
            .properties()
            .keys()
            .filter(|name| !fields.iter().any(|(n, _)| &n == name))
            .map(|name| name.as_str())
            .collect();
        let extra: Vec<&str> = fields
            .iter()
            .map(|(n, _)| n.as_str())
            .filter(|name| !ty.properties().contains_key(*name))
            .collect();
        if !missing.is_empty() || !extra.is_empty() {
            let mut detail = Vec::new();
            if !missing.is_empty() {
                detail.push(format!("missing field(s): {}", missing.join(", ")));
            }
            if !extra.is_empty() {
                detail.push(format!("extra field(s): {}", extra.join(", ")));
            }
            return Err(LowerError::literal_shape(format!(
                "`{type_name}` literal does not match its declared fields ({})",
                detail.join("; ")
            )));
        }

        for prop_name in ty.properties().keys() {
            let (_, value_id) = fields
                .iter()
                .find(|(n, _)| n == prop_name)
                .expect("field-set equality with the declared type already checked above");
            let value = crate::lowering::expr::lower_assignable(*value_id, arena, scope, buffer, call_stack)?;
            let value_ty = value.ty.clone();
            elements.push((value, value_ty));
        }
    }

    lower_newarr_pusharr(scope, &elements, ty, buffer)
}

pub fn lower_array_literal(
    type_name: Option<&str>,
    elements: &[NodeId],
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    let mut lowered = Vec::with_capacity(elements.len());
    for id in elements {
        lowered.push(crate::lowering::expr::lower_assignable(*id, arena, scope, buffer, call_stack)?);
    }

    let element_ty = if let Some(name) = type_name {
        Type::resolve_name(name, scope)?
    } else if let Some(first) = lowered.first() {
        first.ty.clone()
    } else {
        return Err(LowerError::literal_shape(
            "an empty array literal needs an explicit element type",
        ));
    };

    let array_ty = scope
        .deep_get_type("Array")
        .ok_or_else(|| LowerError::lookup("builtin type `Array` is not installed"))?
        .solidify(&[element_ty.typename().to_string()], scope)?;

    let sized_elements: Vec<(Rc<Microstatement>, Type)> = lowered.into_iter().map(|v| (v, element_ty.clone())).collect();
    lower_newarr_pusharr(scope, &sized_elements, array_ty, buffer)
}
