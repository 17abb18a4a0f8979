//! `mslower`: lowers a parsed function/module into the microstatement IR
//! (crate docs §1/§2) — generic type solidification and structural
//! interface typing, function overload dispatch with call-site inlining,
//! and statement/expression lowering, including the conditional/early
//! -return rewrite.
//!
//! The real scanner/parser/emitter are external collaborators; this crate
//! only covers the middle of that pipeline, from an in-memory parse tree
//! (see [`ast`]) to a rendered microstatement sequence (see
//! [`microstatement`]).

pub mod ast;
pub mod config;
pub mod constant;
pub mod error;
pub mod event;
pub mod lowering;
pub mod microstatement;
pub mod position;
pub mod primitives;
pub mod scope;
pub mod types;
pub mod userfunction;

use std::rc::Rc;

use ast::{NodeId, SharedArena};
use config::LowerOptions;
use error::Result;
use event::Event;
use microstatement::Microstatement;
use scope::{Entity, Scope};
use userfunction::UserFunction;

/// Build a fresh root scope with the built-in type catalog, primitive
/// operator/function table, and the three ambient events (`stdout`,
/// `stderr`, `exit`) installed (crate docs §6). Every lowering run starts
/// from (a child of) one of these.
#[must_use]
pub fn root_scope() -> Scope {
    let scope = Scope::new("root");
    types::builtins::install(&scope);
    primitives::install(&scope);

    let string_ty = scope.deep_get_type("string").expect("string installed above");
    let int64_ty = scope.deep_get_type("int64").expect("int64 installed above");
    scope.put("stdout", Entity::Event(Rc::new(Event::new("stdout", string_ty.clone()))));
    scope.put("stderr", Entity::Event(Rc::new(Event::new("stderr", string_ty))));
    scope.put("exit", Entity::Event(Rc::new(Event::new("exit", int64_ty))));

    scope
}

/// Lower one call to a top-level named function end to end: register the
/// function definition, lower each argument expression, dispatch the best
/// overload, and inline it. Returns the full microstatement sequence
/// produced (arguments first, then the inlined body) along with the
/// microstatement holding the call's result — the shape every integration
/// test in this crate drives.
pub fn lower_call(
    scope: &Scope,
    arena: &SharedArena,
    def_id: NodeId,
    call_arg_ids: &[NodeId],
    opts: &LowerOptions,
) -> Result<(Vec<Rc<Microstatement>>, Rc<Microstatement>)> {
    let func = lowering::decl::register_function_def(def_id, arena, scope)?;
    let name = func.name().to_string();

    let mut buffer = microstatement::MicrostatementBuffer::new();
    let mut call_stack = Vec::new();
    let borrowed = arena.borrow();
    let mut args = Vec::with_capacity(call_arg_ids.len());
    for id in call_arg_ids {
        args.push(lowering::expr::lower_assignable(*id, &borrowed, scope, &mut buffer, &mut call_stack)?);
    }
    drop(borrowed);

    let overloads = scope
        .deep_get_functions(&name)
        .ok_or_else(|| error::LowerError::lookup(format!("no such function `{name}`")))?;
    let arg_types: Vec<types::type_::Type> = args.iter().map(|a| a.ty.clone()).collect();
    let (resolved, map) = UserFunction::dispatch(&overloads, &arg_types, scope)?;

    if opts.trace_microstatements {
        tracing::trace!(function = %name, "dispatched overload");
    }

    let result = resolved.inline_call(&args, &map, scope, &mut buffer, &mut call_stack)?;
    Ok((buffer.finish(), result))
}

/// Install `tracing-subscriber`'s env-filter-driven formatter as the
/// global default, matching the teacher's logging setup
/// (`RUST_LOG=mslower=debug` and similar).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
