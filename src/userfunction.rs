//! User (and primitive) functions: overload dispatch and call-site inlining
//! (crate docs §4.3). There is no call instruction in the output IR other
//! than the handful of true primitive calls left after inlining — every
//! user-defined function call is replaced, at lowering time, by its body's
//! microstatements with arguments bound in place.

use std::rc::Rc;

use crate::ast::{FunctionBody, SharedArena};
use crate::error::{LowerError, Result};
use crate::microstatement::{Microstatement, MicrostatementBuffer, MicrostatementKind};
use crate::scope::{Entity, Scope};
use crate::types::interface::FunctionSig;
use crate::types::type_::Type;
use crate::types::InterfaceMap;

/// A function's formal argument: source name plus declared type (which may
/// be a generic standin or an interface, resolved further at dispatch
/// time).
pub type Argument = (String, Type);

#[derive(Clone, Debug)]
pub struct UserFunction {
    name: String,
    args: Vec<Argument>,
    ret: Type,
    body: FunctionBody,
    arena: SharedArena,
    /// The scope the function was *defined* in, reachable as a closure's
    /// secondary parent when its body scope doesn't resolve a name.
    defining_scope: Scope,
    is_primitive: bool,
    primitive_call: Option<String>,
}

impl UserFunction {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        args: Vec<Argument>,
        ret: Type,
        body: FunctionBody,
        arena: SharedArena,
        defining_scope: Scope,
    ) -> Self {
        Self {
            name: name.into(),
            args,
            ret,
            body,
            arena,
            defining_scope,
            is_primitive: false,
            primitive_call: None,
        }
    }

    /// Mark a function as an opaque primitive implemented directly by the
    /// lowering runtime rather than by lowering a source body: calling it
    /// emits a single `Call { function: native_name, .. }` microstatement
    /// instead of inlining (crate docs §4.5).
    #[must_use]
    pub fn as_primitive(mut self, native_name: impl Into<String>) -> Self {
        self.is_primitive = true;
        self.primitive_call = Some(native_name.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.args
    }

    #[must_use]
    pub fn ret(&self) -> &Type {
        &self.ret
    }

    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.is_primitive
    }

    #[must_use]
    pub fn signature(&self) -> FunctionSig {
        FunctionSig {
            name: self.name.clone(),
            args: self.args.iter().map(|(_, t)| t.clone()).collect(),
            ret: self.ret.clone(),
        }
    }

    /// Overload resolution (crate docs §4.3): the **last** overload whose
    /// formal argument types all `typeApplies` against `arg_types` wins,
    /// matching the source language's "later declarations shadow earlier
    /// ones, but only among applicable candidates" rule. Returns the
    /// winning function together with the generic/interface bindings its
    /// match discovered.
    pub fn dispatch(
        overloads: &[Rc<UserFunction>],
        arg_types: &[Type],
        scope: &Scope,
    ) -> Result<(Rc<UserFunction>, InterfaceMap)> {
        let mut best: Option<(Rc<UserFunction>, InterfaceMap)> = None;
        for candidate in overloads {
            if candidate.args.len() != arg_types.len() {
                continue;
            }
            let mut map = InterfaceMap::new();
            let matches = candidate
                .args
                .iter()
                .zip(arg_types.iter())
                .all(|((_, expected), actual)| expected.type_applies(actual, scope, &mut map));
            if matches {
                best = Some((candidate.clone(), map));
            }
        }
        best.ok_or_else(|| {
            let wanted = arg_types.iter().map(Type::typename).collect::<Vec<_>>().join(", ");
            let candidates = overloads
                .iter()
                .map(|f| {
                    format!(
                        "({})",
                        f.args.iter().map(|(_, t)| t.typename()).collect::<Vec<_>>().join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            LowerError::dispatch(format!(
                "no overload of `{}` applies to argument types ({wanted}); candidates: {candidates}",
                overloads.first().map_or("<unknown>", |f| f.name())
            ))
        })
    }

    /// Inline a call to this function at the current position in `buffer`
    /// (crate docs §4.3's `microstatementInlining`): bind `call_args` to
    /// the formal parameters in a fresh child scope, lower the body into
    /// `buffer`, realize the return type through `interface_map`, and
    /// return the microstatement holding the call's result.
    ///
    /// `call_stack` names every `UserFunction` currently being inlined on
    /// this path; re-entering one is a hard [`crate::error::LowerErrorKind::Recursion`]
    /// rather than infinite inlining. True self-recursion is only legal
    /// through the dedicated sequence primitives (`crate::primitives::sequence`),
    /// which drive iteration with a loop rather than by inlining.
    #[allow(clippy::too_many_arguments)]
    pub fn inline_call(
        self: &Rc<Self>,
        call_args: &[Rc<Microstatement>],
        interface_map: &InterfaceMap,
        scope: &Scope,
        buffer: &mut MicrostatementBuffer,
        call_stack: &mut Vec<String>,
    ) -> Result<Rc<Microstatement>> {
        if let Some(native) = &self.primitive_call {
            if let Some(kind) = higher_order_kind(native) {
                if let Some(result) = inline_higher_order(kind, native, call_args, interface_map, scope, buffer) {
                    return Ok(result);
                }
            }
            let realized_ret = self.ret.realize(interface_map, scope);
            return Ok(buffer.push(
                MicrostatementKind::Call {
                    function: native.clone(),
                    args: call_args.iter().map(|a| a.name.clone()).collect(),
                },
                realized_ret,
                None,
            ));
        }

        if call_stack.iter().any(|n| n == &self.name) {
            return Err(LowerError::recursion(format!(
                "`{}` calls itself (directly or indirectly); only the sequence \
                 primitives may self-recurse",
                self.name
            )));
        }

        let call_scope = self.defining_scope.child(format!("{}()", self.name));
        call_scope.set_secondary_parent(scope.clone());

        for ((param_name, param_ty), arg) in self.args.iter().zip(call_args.iter()) {
            let bound = bind_argument(param_name, param_ty, arg, buffer);
            call_scope.put(param_name.clone(), Entity::Value(bound));
        }

        call_stack.push(self.name.clone());
        let result = self.lower_body(&call_scope, buffer, call_stack);
        call_stack.pop();
        let result = result?;

        prune_rerefs(buffer, &self.args.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>());

        let realized_ret = self.ret.realize(interface_map, scope);
        if realized_ret.ptr_eq(&result.ty) || realized_ret.typename() == result.ty.typename() {
            return Ok(result);
        }
        Ok(buffer.push(
            MicrostatementKind::Reassign {
                of: result.name.clone(),
            },
            realized_ret,
            result.position,
        ))
    }

    fn lower_body(
        &self,
        call_scope: &Scope,
        buffer: &mut MicrostatementBuffer,
        call_stack: &mut Vec<String>,
    ) -> Result<Rc<Microstatement>> {
        let arena = self.arena.borrow();
        match &self.body {
            FunctionBody::Expression(expr) => {
                crate::lowering::expr::lower_assignable(*expr, &arena, call_scope, buffer, call_stack)
            }
            FunctionBody::Statements(stmts) => crate::lowering::statement::lower_function_body(
                stmts,
                &self.ret,
                &arena,
                call_scope,
                buffer,
                call_stack,
                &crate::config::LowerOptions::default(),
            ),
        }
    }

    #[must_use]
    pub fn body_node(&self) -> &FunctionBody {
        &self.body
    }

    #[must_use]
    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }
}

/// Bind one call argument to its formal parameter (REREF, crate docs
/// §4.3): a closure value passed where a function/interface type is
/// expected is wrapped with a `ref()` marker call rather than inlined in
/// place, so the callee can invoke it (or pass it along) without it having
/// been eagerly expanded.
fn bind_argument(
    _param_name: &str,
    param_ty: &Type,
    arg: &Rc<Microstatement>,
    buffer: &mut MicrostatementBuffer,
) -> Rc<Microstatement> {
    let needs_ref = matches!(arg.kind, MicrostatementKind::Closure(_))
        && (param_ty.is_interface() || param_ty.typename() == "function");
    if needs_ref {
        buffer.push(
            MicrostatementKind::Call {
                function: "ref".to_string(),
                args: smallvec::smallvec![arg.name.clone()],
            },
            param_ty.clone(),
            arg.position,
        )
    } else {
        buffer.push(
            MicrostatementKind::Reassign {
                of: arg.name.clone(),
            },
            arg.ty.clone(),
            arg.position,
        )
    }
}

/// Drop pass-through `Reassign` bindings introduced by [`bind_argument`]
/// that nothing downstream ever references by name (REREF pruning, crate
/// docs §4.3). A binding that is itself the function's final return value
/// is never pruned.
fn prune_rerefs(buffer: &mut MicrostatementBuffer, param_names: &[String]) {
    let stmts = buffer.as_slice();
    if stmts.is_empty() {
        return;
    }
    let last_name = stmts.last().map(|s| s.name.clone());

    let mut referenced = std::collections::HashSet::new();
    for stmt in stmts {
        match &stmt.kind {
            MicrostatementKind::Call { args, .. } => referenced.extend(args.iter().cloned()),
            MicrostatementKind::Reassign { of } => {
                referenced.insert(of.clone());
            }
            MicrostatementKind::EmitEvent { arg: Some(a), .. } => {
                referenced.insert(a.clone());
            }
            MicrostatementKind::Return { value: Some(v) } => {
                referenced.insert(v.clone());
            }
            _ => {}
        }
    }

    let keep: Vec<Rc<Microstatement>> = buffer
        .as_slice()
        .iter()
        .filter(|s| {
            let is_pure_param_alias = param_names.iter().any(|p| p == &s.name)
                && matches!(&s.kind, MicrostatementKind::Reassign { .. });
            let is_last = Some(&s.name) == last_name.as_ref();
            !(is_pure_param_alias && !referenced.contains(&s.name) && !is_last)
        })
        .cloned()
        .collect();
    buffer.replace(keep);
}

/// Which family of higher-order array/sequence primitive a native call
/// name belongs to, if any (crate docs §4.5): each family recomputes its
/// true output type from the closure argument's realized return type
/// rather than trusting the generically-declared return type alone —
/// `reduce`'s `U` in particular never appears in any parameter, so it can
/// never be bound through ordinary argument-type dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HigherOrderKind {
    Map,
    Each,
    Filter,
    Reduce,
}

fn higher_order_kind(native: &str) -> Option<HigherOrderKind> {
    match native {
        "arr_map" => Some(HigherOrderKind::Map),
        "arr_each" => Some(HigherOrderKind::Each),
        "arr_filter" => Some(HigherOrderKind::Filter),
        "seq_reduce" => Some(HigherOrderKind::Reduce),
        _ => None,
    }
}

/// Follow `Alloc`/`Reassign` aliasing back to the [`MicrostatementKind::Closure`]
/// a call argument ultimately names. `lowering::var::lookup` returns the
/// original bound microstatement for a `let`-bound closure (an `Alloc`),
/// not a fresh `Closure`-kind wrapper, so a bare
/// `matches!(arg.kind, Closure(_))` check would miss every closure passed
/// by name rather than written inline as a literal.
fn resolve_closure_arg(arg: &Rc<Microstatement>, buffer: &MicrostatementBuffer) -> Option<Rc<UserFunction>> {
    let mut current = arg.clone();
    loop {
        match &current.kind {
            MicrostatementKind::Closure(f) => return Some(f.clone()),
            MicrostatementKind::Alloc { of, .. } | MicrostatementKind::Reassign { of } => {
                current = buffer.find(of)?;
            }
            _ => return None,
        }
    }
}

/// Specialize a higher-order primitive call's output type from its
/// closure argument's realized return type (crate docs §4.5, scenario
/// S3). Returns `None` (falling back to the declared, unspecialized
/// return type) when the closure argument can't be traced back to an
/// actual `UserFunction` — e.g. a malformed call with no function value
/// in the closure position.
fn inline_higher_order(
    kind: HigherOrderKind,
    native: &str,
    call_args: &[Rc<Microstatement>],
    interface_map: &InterfaceMap,
    scope: &Scope,
    buffer: &mut MicrostatementBuffer,
) -> Option<Rc<Microstatement>> {
    let closure_arg = call_args.last()?;
    let closure_fn = resolve_closure_arg(closure_arg, buffer)?;
    let closure_ret = closure_fn.ret.realize(interface_map, scope);

    let ret_ty = match kind {
        HigherOrderKind::Map => {
            let array_template = scope.deep_get_type("Array")?;
            array_template.solidify(&[closure_ret.typename().to_string()], scope).ok()?
        }
        HigherOrderKind::Each => scope.deep_get_type("void")?,
        HigherOrderKind::Filter => call_args.first()?.ty.clone(),
        HigherOrderKind::Reduce => closure_ret,
    };

    Some(buffer.push(
        MicrostatementKind::Call {
            function: native.to_string(),
            args: call_args.iter().map(|a| a.name.clone()).collect(),
        },
        ret_ty,
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InterfaceMap;
    use indexmap::IndexMap;

    fn ty(name: &str) -> Type {
        Type::new_builtin(name, IndexMap::new())
    }

    fn primitive(name: &str, args: Vec<Argument>, ret: Type, native: &str, scope: &Scope) -> Rc<UserFunction> {
        Rc::new(
            UserFunction::new(name, args, ret, FunctionBody::Statements(Vec::new()), SharedArena::default(), scope.clone())
                .as_primitive(native),
        )
    }

    #[test]
    fn dispatch_picks_the_last_applicable_overload() {
        let scope = Scope::new("root");
        let int64 = ty("int64");
        let first = primitive("f", vec![("a".to_string(), int64.clone())], int64.clone(), "first_impl", &scope);
        let second = primitive("f", vec![("a".to_string(), int64.clone())], int64.clone(), "second_impl", &scope);
        let overloads = vec![first, second];
        let (winner, _) = UserFunction::dispatch(&overloads, &[int64], &scope).unwrap();
        assert_eq!(winner.primitive_call.as_deref(), Some("second_impl"));
    }

    #[test]
    fn dispatch_skips_overloads_with_wrong_arity() {
        let scope = Scope::new("root");
        let int64 = ty("int64");
        let one_arg = primitive("f", vec![("a".to_string(), int64.clone())], int64.clone(), "one", &scope);
        let two_arg = primitive(
            "f",
            vec![("a".to_string(), int64.clone()), ("b".to_string(), int64.clone())],
            int64.clone(),
            "two",
            &scope,
        );
        let overloads = vec![one_arg, two_arg];
        let (winner, _) = UserFunction::dispatch(&overloads, &[int64.clone(), int64], &scope).unwrap();
        assert_eq!(winner.primitive_call.as_deref(), Some("two"));
    }

    #[test]
    fn primitive_inline_call_emits_one_opaque_call() {
        let scope = Scope::new("root");
        let int64 = ty("int64");
        let func = primitive("neg", vec![("a".to_string(), int64.clone())], int64.clone(), "neg_i64", &scope);
        let mut buffer = MicrostatementBuffer::new();
        let arg = buffer.push(MicrostatementKind::Constant(crate::microstatement::ConstantValue::Int(5)), int64, None);
        let mut call_stack = Vec::new();
        let result = func.inline_call(&[arg], &InterfaceMap::new(), &scope, &mut buffer, &mut call_stack).unwrap();
        match &result.kind {
            MicrostatementKind::Call { function, args } => {
                assert_eq!(function, "neg_i64");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected a primitive call, got {other:?}"),
        }
    }

    #[test]
    fn direct_self_recursion_is_rejected() {
        let scope = Scope::new("root");
        let int64 = ty("int64");
        let func = Rc::new(UserFunction::new(
            "f",
            Vec::new(),
            int64,
            FunctionBody::Statements(Vec::new()),
            SharedArena::default(),
            scope.clone(),
        ));
        let mut buffer = MicrostatementBuffer::new();
        let mut call_stack = vec!["f".to_string()];
        let err = func
            .inline_call(&[], &InterfaceMap::new(), &scope, &mut buffer, &mut call_stack)
            .unwrap_err();
        assert_eq!(err.kind, crate::error::LowerErrorKind::Recursion);
    }
}
