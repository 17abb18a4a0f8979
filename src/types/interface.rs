//! Interfaces: structural contracts matched against candidate concrete
//! types (crate docs §3/§4.2).

use crate::scope::{Entity, Scope};
use crate::types::type_::Type;
use indexmap::IndexMap;

/// A named function signature required by an interface. An empty `name`
/// marks an anonymous slot (e.g. a closure argument) whose matching is
/// deferred to the call site.
#[derive(Clone, Debug)]
pub struct FunctionSig {
    pub name: String,
    pub args: Vec<Type>,
    pub ret: Type,
}

/// A required operator overload (`+`, prefix `-`, …).
#[derive(Clone, Debug)]
pub struct OperatorSig {
    pub symbol: String,
    pub prefix: bool,
    pub args: Vec<Type>,
    pub ret: Type,
}

/// The structural contract a `Type` satisfies when it is interface-typed.
#[derive(Clone, Debug)]
pub struct Interface {
    pub name: String,
    pub functions: Vec<FunctionSig>,
    pub operators: Vec<OperatorSig>,
    pub properties: IndexMap<String, Type>,
}

impl Interface {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            operators: Vec::new(),
            properties: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_function(mut self, sig: FunctionSig) -> Self {
        self.functions.push(sig);
        self
    }

    #[must_use]
    pub fn with_operator(mut self, sig: OperatorSig) -> Self {
        self.operators.push(sig);
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.properties.insert(name.into(), ty);
        self
    }

    /// Structural compatibility test (crate docs §4.2):
    /// (i) every required property is present on `candidate`;
    /// (ii) every named function signature has at least one matching
    ///      overload reachable from `scope`;
    /// (iii) every operator signature has at least one matching overload.
    /// Anonymous function slots (empty name) are always considered
    /// satisfied here; they are deferred to the call site.
    #[must_use]
    pub fn type_applies(&self, candidate: &Type, scope: &Scope) -> bool {
        for (prop_name, prop_ty) in &self.properties {
            match candidate.property(prop_name) {
                Some(candidate_prop) => {
                    let mut scratch = super::InterfaceMap::new();
                    if !prop_ty.type_applies(&candidate_prop, scope, &mut scratch) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        for sig in &self.functions {
            if sig.name.is_empty() {
                continue;
            }
            if !self.has_matching_overload(sig, candidate, scope) {
                return false;
            }
        }

        for sig in &self.operators {
            if !self.has_matching_operator_overload(sig, candidate, scope) {
                return false;
            }
        }

        true
    }

    fn has_matching_overload(&self, sig: &FunctionSig, candidate: &Type, scope: &Scope) -> bool {
        let Some(Entity::Functions(overloads)) = scope.deep_get(&sig.name) else {
            return false;
        };
        overloads.iter().any(|f| {
            let args = f.arguments();
            if args.len() != sig.args.len() {
                return false;
            }
            args.iter().zip(sig.args.iter()).all(|((_, actual), expected)| {
                Self::argument_satisfies(actual, expected, candidate, scope)
            })
        })
    }

    fn argument_satisfies(actual: &Type, expected: &Type, candidate: &Type, scope: &Scope) -> bool {
        if actual.ptr_eq(expected) {
            return true;
        }
        if actual.ptr_eq(candidate) {
            return true;
        }
        if let (Some(a_orig), Some(e_orig)) = (actual.original_type(), expected.original_type()) {
            if a_orig.typename() == e_orig.typename() {
                return actual
                    .properties()
                    .values()
                    .zip(expected.properties().values())
                    .all(|(a, e)| {
                        let mut scratch = super::InterfaceMap::new();
                        e.type_applies(a, scope, &mut scratch) || a.typename() == e.typename()
                    });
            }
        }
        if let Some(iface) = expected.interface() {
            return iface.type_applies(actual, scope);
        }
        actual.typename() == expected.typename()
    }

    fn has_matching_operator_overload(
        &self,
        sig: &OperatorSig,
        candidate: &Type,
        scope: &Scope,
    ) -> bool {
        let Some(Entity::Operators(overloads)) = scope.deep_get(&sig.symbol) else {
            return false;
        };
        overloads.iter().any(|op| {
            op.prefix == sig.prefix
                && op.args.len() == sig.args.len()
                && op
                    .args
                    .iter()
                    .zip(sig.args.iter())
                    .all(|(actual, expected)| {
                        Self::argument_satisfies(actual, expected, candidate, scope)
                    })
        })
    }
}

/// A user- or primitive-defined operator overload, registered in scope
/// under its symbol so interface operator checks and expression lowering
/// can both find it.
#[derive(Clone, Debug)]
pub struct OperatorDef {
    pub symbol: String,
    pub prefix: bool,
    pub args: Vec<Type>,
    pub ret: Type,
    pub precedence: u32,
    pub function_name: String,
}
