//! Statement-sequence lowering: dispatches each statement node to the
//! right lowering routine and drives the early-return guard rewrite
//! (crate docs §4.3/§4.4).

use std::rc::Rc;

use crate::ast::{Arena, Node, NodeId};
use crate::config::LowerOptions;
use crate::error::{LowerError, Result};
use crate::lowering::control::{self, RetGuard};
use crate::microstatement::{Microstatement, MicrostatementBuffer, MicrostatementKind};
use crate::scope::Scope;
use crate::types::type_::Type;

/// Lower a function body's statement list end to end, producing the
/// function's overall result microstatement. Manages the `retVal`/
/// `retNotSet` guard pair ([`RetGuard`]) across the whole body, shared by
/// every nested conditional that needs one.
pub fn lower_block(
    stmts: &[NodeId],
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    lower_function_body(stmts, &Type::new_builtin("void", indexmap::IndexMap::new()), arena, scope, buffer, call_stack, &LowerOptions::default())
}

#[allow(clippy::too_many_arguments)]
pub fn lower_function_body(
    stmts: &[NodeId],
    ret_ty: &Type,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
    opts: &LowerOptions,
) -> Result<Rc<Microstatement>> {
    let mut guard: Option<RetGuard> = None;
    let trailing = lower_stmt_seq(stmts, arena, scope, buffer, call_stack, ret_ty, &mut guard, opts)?;

    match guard {
        // Every early return funneled through `retVal`/`retNotSet`
        // (crate docs §4.3/§9, scenario S5: "ends with `return retVal`") —
        // there is no merge with `trailing`, since whatever `trailing`
        // lowered to may live inside a conditionally-executed
        // `ClosureBody` and is not safe to read unconditionally.
        Some(g) => {
            let ret_val = buffer
                .find(&g.ret_name)
                .ok_or_else(|| LowerError::lookup("`retVal` guard slot missing at end of function body"))?;
            Ok(buffer.push(
                MicrostatementKind::Reassign {
                    of: ret_val.name.clone(),
                },
                ret_ty.clone(),
                ret_val.position,
            ))
        }
        None => trailing.ok_or_else(|| LowerError::syntax("function body produces no value")),
    }
}

/// Lower one statement sequence (a function body, or one branch of a
/// conditional). Returns the value the sequence ends with, if any. An
/// `Exit` encountered here either produces a hard `Return` (no guard
/// active yet) or records itself against `guard` and stops — in both
/// cases further statements in *this* slice are unreachable.
///
/// Once a conditional leaves `guard` set (whether it set it just now, or
/// it was already set by an earlier sibling statement), every statement
/// still left in `stmts` might never have been meant to run — some
/// earlier branch could already have returned. Those are lowered into a
/// single `cond(retNotSet, closure)`-gated tail rather than spliced in
/// unconditionally.
#[allow(clippy::too_many_arguments)]
pub fn lower_stmt_seq(
    stmts: &[NodeId],
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
    ret_ty: &Type,
    guard: &mut Option<RetGuard>,
    opts: &LowerOptions,
) -> Result<Option<Rc<Microstatement>>> {
    let mut last: Option<Rc<Microstatement>> = None;

    for (idx, id) in stmts.iter().enumerate() {
        let node = arena.get(*id);
        match node {
            Node::ConstDecl { name, value, .. } => {
                last = Some(crate::lowering::decl::lower_const_decl(name, *value, arena, scope, buffer, call_stack)?);
            }
            Node::LetDecl { name, value, .. } => {
                last = Some(crate::lowering::decl::lower_let_decl(name, *value, arena, scope, buffer, call_stack)?);
            }
            Node::Assignment { path, value } => {
                last = Some(crate::lowering::assignment::lower_assignment(path, *value, arena, scope, buffer, call_stack)?);
            }
            Node::Assignables(_) => {
                last = Some(crate::lowering::expr::lower_assignable(*id, arena, scope, buffer, call_stack)?);
            }
            Node::Emit { event, value } => {
                last = Some(control::lower_emit(event, *value, arena, scope, buffer, call_stack)?);
            }
            Node::Conditional { branches, else_branch } => {
                control::lower_conditional(
                    branches,
                    else_branch.as_ref(),
                    ret_ty,
                    arena,
                    scope,
                    buffer,
                    call_stack,
                    guard,
                    opts,
                )?;

                if let Some(g) = guard.clone() {
                    let remaining = &stmts[idx + 1..];
                    if !remaining.is_empty() {
                        let flag = buffer
                            .find(&g.flag_name)
                            .ok_or_else(|| LowerError::lookup("`retNotSet` guard slot missing"))?;
                        control::lower_guarded_block(&flag, remaining, ret_ty, arena, scope, buffer, call_stack, guard, opts, "tail")?;
                    }
                    return Ok(None);
                }
            }
            Node::Exit(value) => {
                let remaining = stmts.len() - idx - 1;
                if remaining > 0 {
                    if opts.allow_unreachable_code {
                        tracing::warn!(count = remaining, "statements after return are unreachable");
                    } else {
                        return Err(LowerError::unreachable_code(format!(
                            "{remaining} statement(s) after this return are never reached"
                        )));
                    }
                }
                let value_ms = match value {
                    Some(v) => crate::lowering::expr::lower_assignable(*v, arena, scope, buffer, call_stack)?,
                    None => {
                        let void_ty = scope
                            .deep_get_type("void")
                            .ok_or_else(|| LowerError::lookup("builtin type `void` is not installed"))?;
                        buffer.push(MicrostatementKind::Constant(crate::microstatement::ConstantValue::Bool(false)), void_ty, None)
                    }
                };
                match guard {
                    Some(g) => {
                        control::set_guarded_return(g, &value_ms, scope, buffer)?;
                    }
                    None => {
                        buffer.push(
                            MicrostatementKind::Return {
                                value: Some(value_ms.name.clone()),
                            },
                            value_ms.ty.clone(),
                            value_ms.position,
                        );
                    }
                }
                return Ok(Some(value_ms));
            }
            Node::FunctionDef(_) => {
                return Err(LowerError::syntax("nested named function definitions are not supported here"));
            }
        }
    }

    Ok(last)
}
