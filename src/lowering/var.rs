//! Bare-name resolution (`fromVarName`, crate docs §4.4): a variable
//! reference may resolve to an already-lowered value, a not-yet-evaluated
//! lazy constant, or a single-overload function (wrapped as a closure
//! value for later inlining at its eventual call site).

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{LowerError, Result};
use crate::microstatement::{Microstatement, MicrostatementBuffer, MicrostatementKind};
use crate::scope::{Entity, Scope};
use crate::types::type_::Type;

pub fn lookup(name: &str, scope: &Scope, buffer: &mut MicrostatementBuffer) -> Result<Rc<Microstatement>> {
    match scope.deep_get(name) {
        Some(Entity::Value(ms)) => Ok(ms),
        Some(Entity::Constant(decl)) => {
            if let Some(resolved) = decl.resolved() {
                return Ok(resolved);
            }
            let arena = decl.arena.borrow();
            let value = crate::lowering::expr::lower_assignable(
                decl.value,
                &arena,
                scope,
                buffer,
                &mut Vec::new(),
            )?;
            decl.set_resolved(value.clone());
            Ok(value)
        }
        Some(Entity::Functions(overloads)) => {
            if overloads.len() != 1 {
                return Err(LowerError::dispatch(format!(
                    "`{name}` has {} overloads; a bare reference needs call-site argument \
                     types to pick one",
                    overloads.len()
                )));
            }
            let function_ty = Type::new_builtin("function", IndexMap::new());
            Ok(buffer.push(MicrostatementKind::Closure(overloads[0].clone()), function_ty, None))
        }
        Some(_) => Err(LowerError::type_mismatch(format!("`{name}` does not name a value"))),
        None => Err(LowerError::lookup(format!("no such name `{name}` in scope"))),
    }
}
