//! `let`/`const` declaration lowering (`fromLetdeclarationAst`,
//! `fromConstdeclarationAst`) and function-literal/function-definition
//! handling, crate docs §4.4.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{Arena, FunctionDefNode, Node, NodeId, SharedArena, TypeRef};
use crate::error::{LowerError, Result};
use crate::microstatement::{Microstatement, MicrostatementBuffer, MicrostatementKind};
use crate::scope::{Entity, Scope};
use crate::types::type_::Type;
use crate::userfunction::UserFunction;

/// Resolve a written type reference (`T`, `Array<int64>`, …) against
/// `scope`. A bare name with no existing binding is treated as an ad hoc
/// generic standin and registered on the spot — this core has no separate
/// "declare a generic parameter" grammar production, so the first
/// unresolved bare name in a signature silently becomes one.
pub fn resolve_type_ref(tr: &TypeRef, scope: &Scope) -> Result<Type> {
    if tr.generics.is_empty() {
        if let Some(t) = scope.deep_get_type(&tr.name) {
            return Ok(t);
        }
        let standin = Type::new_generic_standin(tr.name.clone());
        scope.put(tr.name.clone(), Entity::Type(standin.clone()));
        return Ok(standin);
    }
    let base = scope
        .deep_get_type(&tr.name)
        .ok_or_else(|| LowerError::lookup(format!("no such type `{}`", tr.name)))?;
    let mut arg_names = Vec::with_capacity(tr.generics.len());
    for g in &tr.generics {
        arg_names.push(resolve_type_ref(g, scope)?.typename().to_string());
    }
    base.solidify(&arg_names, scope)
}

pub fn lower_const_decl(
    name: &str,
    value: NodeId,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    lower_decl(name, value, false, arena, scope, buffer, call_stack)
}

pub fn lower_let_decl(
    name: &str,
    value: NodeId,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    lower_decl(name, value, true, arena, scope, buffer, call_stack)
}

fn lower_decl(
    name: &str,
    value: NodeId,
    mutable: bool,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
    call_stack: &mut Vec<String>,
) -> Result<Rc<Microstatement>> {
    let initializer = crate::lowering::expr::lower_assignable(value, arena, scope, buffer, call_stack)?;
    let bound = buffer.push_named(
        name.to_string(),
        MicrostatementKind::Alloc {
            of: initializer.name.clone(),
            mutable,
        },
        initializer.ty.clone(),
        initializer.position,
    );
    scope.put(name.to_string(), Entity::Value(bound.clone()));
    Ok(bound)
}

pub fn lower_function_literal(
    def_id: NodeId,
    arena: &Arena,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
) -> Result<Rc<Microstatement>> {
    let Node::FunctionDef(def) = arena.get(def_id) else {
        return Err(LowerError::syntax("expected a function definition"));
    };
    let func = build_user_function(def, arena, scope)?;
    let function_ty = Type::new_builtin("function", IndexMap::new());
    Ok(buffer.push(MicrostatementKind::Closure(Rc::new(func)), function_ty, None))
}

/// Build a [`UserFunction`] from a parsed definition and register it as an
/// overload of its name in `scope` (top-level function declarations;
/// anonymous literals skip this step and are only wrapped as a closure
/// value, see [`lower_function_literal`]).
pub fn register_function_def(def_id: NodeId, arena: &SharedArena, scope: &Scope) -> Result<Rc<UserFunction>> {
    let borrowed = arena.borrow();
    let Node::FunctionDef(def) = borrowed.get(def_id) else {
        return Err(LowerError::syntax("expected a function definition"));
    };
    let func = Rc::new(build_user_function(def, &borrowed, scope)?);
    drop(borrowed);
    let name = func.name().to_string();
    scope.put_function(&name, func.clone());
    Ok(func)
}

fn build_user_function(def: &FunctionDefNode, arena: &Arena, scope: &Scope) -> Result<UserFunction> {
    let mut args = Vec::with_capacity(def.args.len());
    for (name, type_ref) in &def.args {
        args.push((name.clone(), resolve_type_ref(type_ref, scope)?));
    }
    let ret = match &def.ret {
        Some(tr) => resolve_type_ref(tr, scope)?,
        None => scope
            .deep_get_type("void")
            .ok_or_else(|| LowerError::lookup("builtin type `void` is not installed"))?,
    };
    let shared_arena: SharedArena = Rc::new(RefCell::new(arena.clone()));
    Ok(UserFunction::new(
        def.name.clone().unwrap_or_else(|| "<closure>".to_string()),
        args,
        ret,
        def.body.clone(),
        shared_arena,
        scope.clone(),
    ))
}
