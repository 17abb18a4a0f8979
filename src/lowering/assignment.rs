//! Assignment lowering (`fromAssignmentsAst`, crate docs §4.4): rebinding
//! an existing mutable `let` variable, or setting one field of an
//! existing mutable binding.

use std::rc::Rc;

use crate::ast::{Arena, NodeId};
use crate::error::{LowerError, Result};
use crate::microstatement::{Microstatement, MicrostatementBuffer, MicrostatementKind};
use crate::scope::{Entity, Scope};

fn check_mutable(name: &str, scope: &Scope) -> Result<Rc<Microstatement>> {
    match scope.get(name).or_else(|| scope.deep_get(name)) {
        Some(Entity::Value(ms)) => match &ms.kind {
            MicrostatementKind::Alloc { mutable: false, .. } => {
                Err(LowerError::reassignment(format!("`{name}` is declared `const`")))
            }
            _ => Ok(ms),
        },
        Some(_) => Err(LowerError::type_mismatch(format!("`{name}` is not an assignable value"))),
        None => Err(LowerError::lookup(format!("no such name `{name}` in scope"))),
    }
}

pub fn lower_assignment(
    path: &[String],
    value: NodeId,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    let Some((target, rest)) = path.split_first() else {
        return Err(LowerError::syntax("empty assignment path"));
    };
    let target_ms = check_mutable(target, scope)?;
    let new_value = crate::lowering::expr::lower_assignable(value, arena, scope, buffer, call_stack)?;

    if rest.is_empty() {
        let bound = buffer.push_named(
            target.clone(),
            MicrostatementKind::Alloc {
                of: new_value.name.clone(),
                mutable: true,
            },
            new_value.ty.clone(),
            new_value.position,
        );
        scope.put(target.clone(), Entity::Value(bound.clone()));
        return Ok(bound);
    }

    if rest.len() > 1 {
        return Err(LowerError::syntax("only single-level field assignment is supported"));
    }
    let field = &rest[0];
    if target_ms.ty.property(field).is_none() {
        return Err(LowerError::lookup(format!(
            "`{}` has no field `{field}`",
            target_ms.ty.typename()
        )));
    }
    Ok(buffer.push(
        MicrostatementKind::Call {
            function: "setprop".to_string(),
            args: smallvec::smallvec![target_ms.name.clone(), field.clone(), new_value.name.clone()],
        },
        new_value.ty.clone(),
        new_value.position,
    ))
}
