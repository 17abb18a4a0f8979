//! Conditional and early-return rewriting (crate docs §4.3's
//! `maybeTransform`/§9 "conditional/early-return rewriting"): a function
//! body with a `return` nested inside an `if`/`else` is restructured so
//! the function has exactly one trailing result expression, guarded by a
//! synthetic `retVal`/`retNotSet` pair, rather than multiple exit points.
//!
//! Rather than re-parsing the body into literal anonymous-function
//! closures the way `maybeTransform` does, each branch (and, once a guard
//! is active, everything lowered after a conditional) is lowered into its
//! own sub-sequence and lifted out as a [`MicrostatementKind::ClosureBody`]
//! gated by a `cond(flag, closure)` call — the branch only actually runs
//! at the primitive's discretion, not unconditionally at lowering time.

use std::rc::Rc;

use crate::ast::{Arena, Node, NodeId};
use crate::config::LowerOptions;
use crate::error::{LowerError, Result};
use crate::microstatement::{ConstantValue, Microstatement, MicrostatementBuffer, MicrostatementKind};
use crate::scope::Scope;
use crate::types::type_::Type;

/// Names of the synthetic guard pair introduced the first time a function
/// body needs one. Reused by every early return in the same function.
#[derive(Clone, Debug)]
pub struct RetGuard {
    pub ret_name: String,
    pub flag_name: String,
}

fn body_has_exit(body: &[NodeId], arena: &Arena) -> bool {
    body.iter().any(|id| matches!(arena.get(*id), Node::Exit(_)))
}

fn ensure_guard(guard: &mut Option<RetGuard>, ret_ty: &Type, scope: &Scope, buffer: &mut MicrostatementBuffer) -> Result<()> {
    if guard.is_some() {
        return Ok(());
    }
    let default = buffer.push(
        MicrostatementKind::Call {
            function: "default".to_string(),
            args: smallvec::smallvec![],
        },
        ret_ty.clone(),
        None,
    );
    buffer.push_named(
        "retVal".to_string(),
        MicrostatementKind::Alloc {
            of: default.name.clone(),
            mutable: true,
        },
        ret_ty.clone(),
        None,
    );
    let bool_ty = scope
        .deep_get_type("bool")
        .ok_or_else(|| LowerError::lookup("builtin type `bool` is not installed"))?;
    let true_const = buffer.push(MicrostatementKind::Constant(ConstantValue::Bool(true)), bool_ty.clone(), None);
    buffer.push_named(
        "retNotSet".to_string(),
        MicrostatementKind::Alloc {
            of: true_const.name.clone(),
            mutable: true,
        },
        bool_ty,
        None,
    );
    *guard = Some(RetGuard {
        ret_name: "retVal".to_string(),
        flag_name: "retNotSet".to_string(),
    });
    Ok(())
}

/// Record an early return against an active guard: `retVal = value;
/// retNotSet = false`.
pub fn set_guarded_return(guard: &RetGuard, value: &Rc<Microstatement>, scope: &Scope, buffer: &mut MicrostatementBuffer) -> Result<()> {
    buffer.push_named(
        guard.ret_name.clone(),
        MicrostatementKind::Alloc {
            of: value.name.clone(),
            mutable: true,
        },
        value.ty.clone(),
        value.position,
    );
    let bool_ty = scope
        .deep_get_type("bool")
        .ok_or_else(|| LowerError::lookup("builtin type `bool` is not installed"))?;
    let false_const = buffer.push(MicrostatementKind::Constant(ConstantValue::Bool(false)), bool_ty.clone(), None);
    buffer.push_named(
        guard.flag_name.clone(),
        MicrostatementKind::Alloc {
            of: false_const.name.clone(),
            mutable: true,
        },
        bool_ty,
        value.position,
    );
    Ok(())
}

/// Lower `body` into its own sub-sequence, lift what it produced out of
/// `buffer` into a [`MicrostatementKind::ClosureBody`], and gate it behind
/// a `cond(flag, closure)` call — the branch's statements sit in `buffer`
/// either way (so later `find`/REREF passes still see every binding it
/// makes), but nothing in it runs except at `cond`'s discretion.
#[allow(clippy::too_many_arguments)]
pub(crate) fn lower_guarded_block(
    flag: &Rc<Microstatement>,
    body: &[NodeId],
    ret_ty: &Type,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
    guard: &mut Option<RetGuard>,
    opts: &LowerOptions,
    label: &str,
) -> Result<()> {
    let branch_scope = scope.child(label);
    let start = buffer.as_slice().len();
    crate::lowering::statement::lower_stmt_seq(body, arena, &branch_scope, buffer, call_stack, ret_ty, guard, opts)?;
    let body_stmts = buffer.split_off(start);

    let void_ty = scope
        .deep_get_type("void")
        .ok_or_else(|| LowerError::lookup("builtin type `void` is not installed"))?;
    let closure = buffer.push(MicrostatementKind::ClosureBody(body_stmts), void_ty.clone(), None);
    buffer.push(
        MicrostatementKind::Call {
            function: "cond".to_string(),
            args: smallvec::smallvec![flag.name.clone(), closure.name.clone()],
        },
        void_ty,
        None,
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn lower_conditional(
    branches: &[(NodeId, Vec<NodeId>)],
    else_branch: Option<&Vec<NodeId>>,
    ret_ty: &Type,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
    guard: &mut Option<RetGuard>,
    opts: &LowerOptions,
) -> Result<()> {
    let needs_guard =
        branches.iter().any(|(_, body)| body_has_exit(body, arena)) || else_branch.is_some_and(|b| body_has_exit(b, arena));

    if needs_guard {
        ensure_guard(guard, ret_ty, scope, buffer)?;
    }

    let bool_ty = scope
        .deep_get_type("bool")
        .ok_or_else(|| LowerError::lookup("builtin type `bool` is not installed"))?;

    // Tracks "none of the conditions seen so far matched", so an `else`
    // arm (or a later `elsif`-like branch) is gated correctly even when
    // there's more than one preceding condition.
    let mut none_matched: Option<Rc<Microstatement>> = None;

    for (cond, body) in branches {
        let cond_ms = crate::lowering::expr::lower_assignable(*cond, arena, scope, buffer, call_stack)?;
        lower_guarded_block(&cond_ms, body, ret_ty, arena, scope, buffer, call_stack, guard, opts, "branch")?;

        let not_cond = buffer.push(
            MicrostatementKind::Call {
                function: "__prim_not_bool".to_string(),
                args: smallvec::smallvec![cond_ms.name.clone()],
            },
            bool_ty.clone(),
            None,
        );
        none_matched = Some(match none_matched {
            Some(prev) => buffer.push(
                MicrostatementKind::Call {
                    function: "__prim_and_bool".to_string(),
                    args: smallvec::smallvec![prev.name.clone(), not_cond.name.clone()],
                },
                bool_ty.clone(),
                None,
            ),
            None => not_cond,
        });
    }

    if let Some(body) = else_branch {
        let flag = none_matched.expect("a conditional always has at least one branch");
        lower_guarded_block(&flag, body, ret_ty, arena, scope, buffer, call_stack, guard, opts, "else")?;
    }
    Ok(())
}

pub fn lower_emit(
    event: &str,
    value: Option<NodeId>,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    let decl = scope
        .deep_get_event(event)
        .ok_or_else(|| LowerError::lookup(format!("no such event `{event}`")))?;
    let arg = match value {
        Some(v) => Some(crate::lowering::expr::lower_assignable(v, arena, scope, buffer, call_stack)?),
        None => None,
    };
    if let Some(a) = &arg {
        let mut scratch = crate::types::InterfaceMap::new();
        if !decl.payload.type_applies(&a.ty, scope, &mut scratch) {
            return Err(LowerError::type_mismatch(format!(
                "event `{event}` expects `{}`, got `{}`",
                decl.payload.typename(),
                a.ty.typename()
            )));
        }
    }
    let void_ty = scope
        .deep_get_type("void")
        .ok_or_else(|| LowerError::lookup("builtin type `void` is not installed"))?;
    Ok(buffer.push(
        MicrostatementKind::EmitEvent {
            event: event.to_string(),
            arg: arg.map(|a| a.name.clone()),
        },
        void_ty,
        None,
    ))
}
