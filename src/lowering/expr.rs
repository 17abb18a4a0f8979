//! Expression lowering: operator precedence resolution over a flattened
//! `assignables` token sequence (`fromAssignablesAst`) and the
//! base-assignable chain state machine (`fromBaseAssignableAst`), crate
//! docs §4.4.
//!
//! The chain walker here only recognizes the fixed set of shapes the
//! in-tree fixture builder ([`crate::ast::test_support::Builder`])
//! produces, rather than an arbitrary general base-assignable grammar —
//! there is no real parser in this core to drive a more general walk
//! against (crate docs §1/§6).

use std::rc::Rc;

use crate::ast::{Arena, AssignableTok, BaseTok, Node, NodeId};
use crate::error::{LowerError, Result};
use crate::microstatement::{Microstatement, MicrostatementBuffer};
use crate::scope::{Entity, Scope};
use crate::types::type_::Type;
use crate::types::InterfaceMap;
use crate::userfunction::UserFunction;

pub fn lower_assignable(
    id: NodeId,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    let Node::Assignables(toks) = arena.get(id) else {
        return Err(LowerError::syntax("expected an assignable expression"));
    };

    if toks.len() == 1 {
        let AssignableTok::Base(base) = &toks[0] else {
            return Err(LowerError::syntax("operator with no operand"));
        };
        return lower_base_chain(base, arena, scope, buffer, call_stack);
    }

    let mut i = 0;
    let mut operands: Vec<Rc<Microstatement>> = Vec::new();
    let mut op_syms: Vec<String> = Vec::new();

    if let AssignableTok::Operator(sym) = &toks[0] {
        let AssignableTok::Base(rhs_toks) = &toks[1] else {
            return Err(LowerError::syntax("malformed prefix operator expression"));
        };
        let rhs = lower_base_chain(rhs_toks, arena, scope, buffer, call_stack)?;
        let result = apply_operator(sym, true, &[rhs], scope, buffer, call_stack)?;
        operands.push(result);
        i = 2;
    }

    while i < toks.len() {
        match &toks[i] {
            AssignableTok::Base(b) => {
                operands.push(lower_base_chain(b, arena, scope, buffer, call_stack)?);
            }
            AssignableTok::Operator(sym) => op_syms.push(sym.clone()),
        }
        i += 1;
    }

    while !op_syms.is_empty() {
        let mut best_idx = 0;
        let mut best_prec = operator_precedence(&op_syms[0], scope);
        for (idx, sym) in op_syms.iter().enumerate().skip(1) {
            let prec = operator_precedence(sym, scope);
            if prec > best_prec {
                best_prec = prec;
                best_idx = idx;
            }
        }
        let lhs = operands[best_idx].clone();
        let rhs = operands[best_idx + 1].clone();
        let result = apply_operator(&op_syms[best_idx], false, &[lhs, rhs], scope, buffer, call_stack)?;
        operands.splice(best_idx..=best_idx + 1, [result]);
        op_syms.remove(best_idx);
    }

    operands
        .into_iter()
        .next()
        .ok_or_else(|| LowerError::syntax("empty assignable expression"))
}

fn operator_precedence(symbol: &str, scope: &Scope) -> u32 {
    match scope.deep_get(symbol) {
        Some(Entity::Operators(defs)) => defs.first().map_or(0, |d| d.precedence),
        _ => 0,
    }
}

fn apply_operator(
    symbol: &str,
    prefix: bool,
    args: &[Rc<Microstatement>],
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    let Some(Entity::Operators(defs)) = scope.deep_get(symbol) else {
        return Err(LowerError::dispatch(format!("no such operator `{symbol}`")));
    };
    let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
    let mut chosen_name = None;
    for def in &defs {
        if def.prefix != prefix || def.args.len() != args.len() {
            continue;
        }
        let mut scratch = InterfaceMap::new();
        if def
            .args
            .iter()
            .zip(arg_types.iter())
            .all(|(expected, actual)| expected.type_applies(actual, scope, &mut scratch))
        {
            chosen_name = Some(def.function_name.clone());
        }
    }
    let function_name = chosen_name
        .ok_or_else(|| LowerError::dispatch(format!("no overload of operator `{symbol}` applies")))?;

    let overloads = scope
        .deep_get_functions(&function_name)
        .ok_or_else(|| LowerError::lookup(format!("operator function `{function_name}` not found")))?;
    let (func, map) = UserFunction::dispatch(&overloads, &arg_types, scope)?;
    func.inline_call(args, &map, scope, buffer, call_stack)
}

fn lower_base_chain(
    toks: &[BaseTok],
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    match toks {
        [BaseTok::Var(name)] => crate::lowering::var::lookup(name, scope, buffer),
        [BaseTok::Constant(lexeme)] => crate::lowering::literal::lower_constant(lexeme, scope, buffer),
        [BaseTok::ObjectLiteral { type_name, fields }] => {
            crate::lowering::literal::lower_object_literal(type_name.as_deref(), fields, arena, scope, buffer, call_stack)
        }
        [BaseTok::ArrayLiteral { type_name, elements }] => {
            crate::lowering::literal::lower_array_literal(type_name.as_deref(), elements, arena, scope, buffer, call_stack)
        }
        [BaseTok::Group(inner)] => lower_assignable(*inner, arena, scope, buffer, call_stack),
        [BaseTok::FunctionLiteral(def_id)] => {
            crate::lowering::decl::lower_function_literal(*def_id, arena, scope, buffer)
        }
        [BaseTok::Var(callee), BaseTok::Call(args)] => {
            lower_call(callee, &[], args, arena, scope, buffer, call_stack)
        }
        [BaseTok::Var(recv), BaseTok::Dot, BaseTok::Var(field)] => lower_field_access(recv, field, scope, buffer),
        [BaseTok::Var(recv), BaseTok::Dot, BaseTok::Var(method), BaseTok::Call(args)] => {
            let recv_ms = crate::lowering::var::lookup(recv, scope, buffer)?;
            lower_call(method, &[recv_ms], args, arena, scope, buffer, call_stack)
        }
        [BaseTok::Var(recv), BaseTok::ArrayAccess(idx)] => {
            let recv_ms = crate::lowering::var::lookup(recv, scope, buffer)?;
            let idx_ms = lower_assignable(*idx, arena, scope, buffer, call_stack)?;
            let element_ty = recv_ms
                .ty
                .property("element")
                .ok_or_else(|| LowerError::type_mismatch(format!("`{recv}` is not indexable")))?;

            let result_template = scope
                .deep_get_type("Result")
                .ok_or_else(|| LowerError::lookup("builtin type `Result` is not installed"))?;

            let wrapped_idx_ty = result_template.solidify(&["int64".to_string(), "Error".to_string()], scope)?;
            let wrapped_idx = buffer.push(
                crate::microstatement::MicrostatementKind::Call {
                    function: "okR".to_string(),
                    args: smallvec::smallvec![idx_ms.name.clone()],
                },
                wrapped_idx_ty,
                None,
            );

            let result_ty = result_template.solidify(&[element_ty.typename().to_string(), "Error".to_string()], scope)?;
            Ok(buffer.push(
                crate::microstatement::MicrostatementKind::Call {
                    function: "resfrom".to_string(),
                    args: smallvec::smallvec![recv_ms.name.clone(), wrapped_idx.name.clone()],
                },
                result_ty,
                None,
            ))
        }
        _ => Err(LowerError::syntax("unsupported base-assignable chain shape")),
    }
}

fn lower_call(
    callee: &str,
    leading: &[Rc<Microstatement>],
    arg_ids: &[NodeId],
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    let mut args: Vec<Rc<Microstatement>> = leading.to_vec();
    for id in arg_ids {
        args.push(lower_assignable(*id, arena, scope, buffer, call_stack)?);
    }
    let overloads = scope
        .deep_get_functions(callee)
        .ok_or_else(|| LowerError::lookup(format!("no such function `{callee}`")))?;
    let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
    let (func, map) = UserFunction::dispatch(&overloads, &arg_types, scope)?;
    func.inline_call(&args, &map, scope, buffer, call_stack)
}

/// Field access lowers to `CONSTDEC(<declared property index>)` followed
/// by an index-keyed `register(arr, idx)` call retyped to the field's
/// declared type — a type's storage is the same array the `newarr`/
/// `pusharr` literal protocol builds, so a field is just that array
/// indexed by its declared position (crate docs §4.4).
fn lower_field_access(recv: &str, field: &str, scope: &Scope, buffer: &mut MicrostatementBuffer) -> Result<Rc<Microstatement>> {
    let recv_ms = crate::lowering::var::lookup(recv, scope, buffer)?;
    let field_ty = recv_ms
        .ty
        .property(field)
        .ok_or_else(|| LowerError::lookup(format!("`{}` has no field `{field}`", recv_ms.ty.typename())))?;
    let index = recv_ms
        .ty
        .property_index(field)
        .ok_or_else(|| LowerError::lookup(format!("`{}` has no field `{field}`", recv_ms.ty.typename())))?;

    let int64_ty = scope
        .deep_get_type("int64")
        .ok_or_else(|| LowerError::lookup("builtin type `int64` is not installed"))?;
    let idx_ms = buffer.push(
        crate::microstatement::MicrostatementKind::Constant(crate::microstatement::ConstantValue::Int(index as i64)),
        int64_ty,
        None,
    );

    Ok(buffer.push(
        crate::microstatement::MicrostatementKind::Call {
            function: "register".to_string(),
            args: smallvec::smallvec![recv_ms.name.clone(), idx_ms.name.clone()],
        },
        field_ty,
        None,
    ))
}
