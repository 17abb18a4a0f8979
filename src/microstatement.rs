//! The microstatement IR (crate docs §4.4/§6): the flat, SSA-ish sequence
//! of primitive operations every statement/expression lowers to, plus its
//! textual rendering used for tracing and golden-output tests.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::position::Position;
use crate::types::type_::Type;
use crate::userfunction::UserFunction;

#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Int(v) => write!(f, "{v}"),
            ConstantValue::Float(v) => write!(f, "{v}"),
            ConstantValue::Bool(v) => write!(f, "{v}"),
            ConstantValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// A call's argument-name list. Almost every call in this IR takes a
/// handful of arguments, so this stays on the stack instead of spilling to
/// the heap for the common case.
pub type CallArgs = SmallVec<[String; 4]>;

/// What a microstatement does. Every variant produces exactly one named
/// output (`Microstatement::name`), consumed by later microstatements by
/// name rather than by structural reference — matching the teacher's
/// flat-IR "every step is a named temporary" idiom.
#[derive(Clone, Debug)]
pub enum MicrostatementKind {
    /// A literal value, as lowered from a constant token.
    Constant(ConstantValue),
    /// The `index`-th argument of the enclosing function.
    Arg { index: usize },
    /// `let`/`const` binding of `of` under a (possibly different) name.
    Alloc { of: String, mutable: bool },
    /// Rebind of an existing `let` variable to a new value.
    Reassign { of: String },
    /// A function, primitive, or operator dispatch. `function` is resolved
    /// at lowering time (post-dispatch); `args` names prior microstatement
    /// outputs.
    Call { function: String, args: CallArgs },
    /// An object/array literal field or array-builder step
    /// (`newarr`/`pusharr` protocol, crate docs §4.4).
    EmitEvent { event: String, arg: Option<String> },
    /// A terminating `return`.
    Return { value: Option<String> },
    /// A function value, captured for later inlining at its call site
    /// rather than dispatched immediately.
    Closure(Rc<UserFunction>),
    /// An already-lowered statement sequence, gated by a `cond(flag,
    /// closure)` call rather than spliced unconditionally into the
    /// enclosing sequence (conditional branches and early-return guard
    /// tails, crate docs §4.3/§9).
    ClosureBody(Vec<Rc<Microstatement>>),
}

/// One step of lowered IR: a named output plus the operation that produces
/// it and the static type of that output.
#[derive(Clone, Debug)]
pub struct Microstatement {
    pub name: String,
    pub kind: MicrostatementKind,
    pub ty: Type,
    pub position: Option<Position>,
}

impl Microstatement {
    #[must_use]
    pub fn render(&self) -> String {
        let rhs = match &self.kind {
            MicrostatementKind::Constant(v) => v.to_string(),
            MicrostatementKind::Arg { index } => format!("arg({index})"),
            MicrostatementKind::Alloc { of, mutable } => {
                let kw = if *mutable { "let" } else { "const" };
                format!("{kw} {of}")
            }
            MicrostatementKind::Reassign { of } => of.clone(),
            MicrostatementKind::Call { function, args } => {
                format!("{function}({})", args.join(", "))
            }
            MicrostatementKind::EmitEvent { event, arg } => match arg {
                Some(a) => format!("emit({event}, {a})"),
                None => format!("emit({event})"),
            },
            MicrostatementKind::Return { value } => match value {
                Some(v) => format!("return {v}"),
                None => "return".to_string(),
            },
            MicrostatementKind::Closure(f) => format!("closure({})", f.name()),
            MicrostatementKind::ClosureBody(stmts) => format!("closure {{ {} stmt(s) }}", stmts.len()),
        };
        format!("{}: {} = {}", self.name, self.ty.typename(), rhs)
    }
}

/// An ordered accumulator of microstatements with an auto-incrementing
/// temporary-name counter (`_0`, `_1`, …), mirroring the teacher's
/// statement-buffer pattern for building a function body one lowered step
/// at a time.
#[derive(Default)]
pub struct MicrostatementBuffer {
    counter: u32,
    out: Vec<Rc<Microstatement>>,
}

impl MicrostatementBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fresh_name(&mut self) -> String {
        let name = format!("_{}", self.counter);
        self.counter += 1;
        name
    }

    pub fn push(&mut self, kind: MicrostatementKind, ty: Type, position: Option<Position>) -> Rc<Microstatement> {
        let name = self.fresh_name();
        let stmt = Rc::new(Microstatement {
            name,
            kind,
            ty,
            position,
        });
        self.out.push(stmt.clone());
        stmt
    }

    /// Push a microstatement under a caller-chosen name rather than an
    /// auto-generated one (used for named `let`/`const` bindings so later
    /// references can look them up by source name).
    pub fn push_named(
        &mut self,
        name: impl Into<String>,
        kind: MicrostatementKind,
        ty: Type,
        position: Option<Position>,
    ) -> Rc<Microstatement> {
        let stmt = Rc::new(Microstatement {
            name: name.into(),
            kind,
            ty,
            position,
        });
        self.out.push(stmt.clone());
        stmt
    }

    #[must_use]
    pub fn finish(self) -> Vec<Rc<Microstatement>> {
        self.out
    }

    /// Replace the accumulated sequence wholesale (used by REREF pruning).
    pub fn replace(&mut self, stmts: Vec<Rc<Microstatement>>) {
        self.out = stmts;
    }

    /// Carve every microstatement from `at` onward out of the sequence,
    /// keeping the fresh-name counter intact (used to lift a conditional
    /// branch's lowered body into its own [`MicrostatementKind::ClosureBody`]
    /// without renaming anything it contains).
    pub fn split_off(&mut self, at: usize) -> Vec<Rc<Microstatement>> {
        self.out.split_off(at)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Rc<Microstatement>] {
        &self.out
    }

    pub fn find(&self, name: &str) -> Option<Rc<Microstatement>> {
        self.out.iter().rev().find(|s| s.name == name).cloned()
    }
}

#[must_use]
pub fn render_all(stmts: &[Rc<Microstatement>]) -> String {
    stmts.iter().map(|s| s.render()).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::type_::Type;
    use indexmap::IndexMap;

    fn int64() -> Type {
        Type::new_builtin("int64", IndexMap::new())
    }

    #[test]
    fn fresh_names_are_sequential() {
        let mut buffer = MicrostatementBuffer::new();
        let a = buffer.push(MicrostatementKind::Constant(ConstantValue::Int(1)), int64(), None);
        let b = buffer.push(MicrostatementKind::Constant(ConstantValue::Int(2)), int64(), None);
        assert_eq!(a.name, "_0");
        assert_eq!(b.name, "_1");
    }

    #[test]
    fn find_returns_the_most_recent_binding_for_shadowing() {
        let mut buffer = MicrostatementBuffer::new();
        buffer.push_named("x".to_string(), MicrostatementKind::Constant(ConstantValue::Int(1)), int64(), None);
        buffer.push_named("x".to_string(), MicrostatementKind::Constant(ConstantValue::Int(2)), int64(), None);
        let found = buffer.find("x").unwrap();
        match found.kind {
            MicrostatementKind::Constant(ConstantValue::Int(v)) => assert_eq!(v, 2),
            _ => panic!("expected a constant"),
        }
    }

    #[test]
    fn render_formats_a_call_with_its_arguments() {
        let mut buffer = MicrostatementBuffer::new();
        let stmt = buffer.push(
            MicrostatementKind::Call {
                function: "add_i64".to_string(),
                args: smallvec::smallvec!["a".to_string(), "b".to_string()],
            },
            int64(),
            None,
        );
        assert_eq!(stmt.render(), "_0: int64 = add_i64(a, b)");
    }

    #[test]
    fn replace_swaps_the_accumulated_sequence() {
        let mut buffer = MicrostatementBuffer::new();
        buffer.push(MicrostatementKind::Constant(ConstantValue::Int(1)), int64(), None);
        assert_eq!(buffer.as_slice().len(), 1);
        buffer.replace(Vec::new());
        assert!(buffer.as_slice().is_empty());
    }
}
