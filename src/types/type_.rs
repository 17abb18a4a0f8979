//! `Type`: an entity describing a named value shape (crate docs §3/§4.2).

use std::rc::Rc;

use indexmap::IndexMap;

use super::InterfaceMap;
use crate::error::{LowerError, Result};
use crate::scope::{Entity, Scope};
use crate::types::interface::Interface;

/// A property type that is itself an unsolidified application of a
/// generic template (e.g. a field `items: Array<T>` inside a template
/// `Pair<T>`). Recorded so `solidify` can recursively instantiate it once
/// the outer generic arguments are known.
#[derive(Clone, Debug)]
pub struct TemplateRef {
    pub base: String,
    pub args: Vec<String>,
}

#[derive(Debug)]
struct TypeData {
    typename: String,
    built_in: bool,
    is_generic_standin: bool,
    properties: IndexMap<String, Type>,
    generics: IndexMap<String, usize>,
    original_type: Option<Type>,
    iface: Option<Rc<Interface>>,
    alias: Option<Type>,
    template_ref: Option<TemplateRef>,
}

/// A named value shape. Cheap to clone (`Rc` underneath); two `Type`
/// values referring to the same record are `Rc::ptr_eq`.
#[derive(Clone, Debug)]
pub struct Type(Rc<TypeData>);

impl Type {
    #[must_use]
    pub fn new_builtin(name: impl Into<String>, properties: IndexMap<String, Type>) -> Self {
        Self(Rc::new(TypeData {
            typename: name.into(),
            built_in: true,
            is_generic_standin: false,
            properties,
            generics: IndexMap::new(),
            original_type: None,
            iface: None,
            alias: None,
            template_ref: None,
        }))
    }

    #[must_use]
    pub fn new_generic_standin(name: impl Into<String>) -> Self {
        Self(Rc::new(TypeData {
            typename: name.into(),
            built_in: false,
            is_generic_standin: true,
            properties: IndexMap::new(),
            generics: IndexMap::new(),
            original_type: None,
            iface: None,
            alias: None,
            template_ref: None,
        }))
    }

    /// A generic template: a type whose `properties` may reference its own
    /// `generics` standins (directly, or via a nested [`TemplateRef`]).
    #[must_use]
    pub fn new_template(
        name: impl Into<String>,
        generics: IndexMap<String, usize>,
        properties: IndexMap<String, Type>,
    ) -> Self {
        Self(Rc::new(TypeData {
            typename: name.into(),
            built_in: false,
            is_generic_standin: false,
            properties,
            generics,
            original_type: None,
            iface: None,
            alias: None,
            template_ref: None,
        }))
    }

    /// A property-type placeholder recording a nested generic application
    /// that should be resolved when the *enclosing* template is solidified.
    #[must_use]
    pub fn pending(base: impl Into<String>, args: Vec<String>) -> Self {
        Self(Rc::new(TypeData {
            typename: String::new(),
            built_in: false,
            is_generic_standin: false,
            properties: IndexMap::new(),
            generics: IndexMap::new(),
            original_type: None,
            iface: None,
            alias: None,
            template_ref: Some(TemplateRef {
                base: base.into(),
                args,
            }),
        }))
    }

    #[must_use]
    pub fn new_interface(name: impl Into<String>, iface: Interface) -> Self {
        Self(Rc::new(TypeData {
            typename: name.into(),
            built_in: false,
            is_generic_standin: false,
            properties: IndexMap::new(),
            generics: IndexMap::new(),
            original_type: None,
            iface: Some(Rc::new(iface)),
            alias: None,
            template_ref: None,
        }))
    }

    #[must_use]
    pub fn new_alias(name: impl Into<String>, original: Type) -> Self {
        Self(Rc::new(TypeData {
            typename: name.into(),
            built_in: original.0.built_in,
            is_generic_standin: original.0.is_generic_standin,
            properties: original.0.properties.clone(),
            generics: original.0.generics.clone(),
            original_type: original.0.original_type.clone(),
            iface: original.0.iface.clone(),
            alias: Some(original),
            template_ref: None,
        }))
    }

    #[must_use]
    pub fn typename(&self) -> &str {
        &self.0.typename
    }

    #[must_use]
    pub fn is_built_in(&self) -> bool {
        self.0.built_in
    }

    #[must_use]
    pub fn is_generic_standin(&self) -> bool {
        self.0.is_generic_standin
    }

    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.0.iface.is_some()
    }

    #[must_use]
    pub fn interface(&self) -> Option<&Interface> {
        self.0.iface.as_deref()
    }

    #[must_use]
    pub fn original_type(&self) -> Option<&Type> {
        self.0.original_type.as_ref()
    }

    #[must_use]
    pub fn alias_of(&self) -> Option<&Type> {
        self.0.alias.as_ref()
    }

    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Type> {
        &self.0.properties
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<Type> {
        self.0.properties.get(name).cloned()
    }

    #[must_use]
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.0.properties.get_index_of(name)
    }

    #[must_use]
    pub fn generics(&self) -> &IndexMap<String, usize> {
        &self.0.generics
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Type) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Resolve a (possibly composite, e.g. `"Array<int64>"`) type name in
    /// `scope`, solidifying generic templates along the way.
    pub fn resolve_name(name: &str, scope: &Scope) -> Result<Type> {
        let name = name.trim();
        if let Some(lt) = name.find('<') {
            if !name.ends_with('>') {
                return Err(LowerError::syntax(format!("malformed type name `{name}`")));
            }
            let base = &name[..lt];
            let inner = &name[lt + 1..name.len() - 1];
            let arg_names = split_top_level(inner);
            let base_ty = scope
                .deep_get_type(base)
                .ok_or_else(|| LowerError::lookup(format!("no such type `{base}`")))?;
            base_ty.solidify(&arg_names, scope)
        } else {
            scope
                .deep_get_type(name)
                .ok_or_else(|| LowerError::lookup(format!("no such type `{name}`")))
        }
    }

    /// Produce (and memoize into `scope`) a concrete instance of this
    /// generic template (crate docs §4.2). Idempotent per scope: a second
    /// call with the same argument names returns the same `Type` identity.
    pub fn solidify(&self, generic_arg_names: &[String], scope: &Scope) -> Result<Type> {
        if self.0.generics.is_empty() {
            return Err(LowerError::type_mismatch(format!(
                "`{}` is not a generic type",
                self.typename()
            )));
        }
        if generic_arg_names.len() != self.0.generics.len() {
            return Err(LowerError::type_mismatch(format!(
                "`{}` expects {} generic argument(s), got {}",
                self.typename(),
                self.0.generics.len(),
                generic_arg_names.len()
            )));
        }

        let resolved: Vec<Type> = generic_arg_names
            .iter()
            .map(|n| Type::resolve_name(n, scope))
            .collect::<Result<_>>()?;

        let synthetic_name = format!(
            "{}<{}>",
            self.typename(),
            resolved
                .iter()
                .map(Type::typename)
                .collect::<Vec<_>>()
                .join(", ")
        );

        if let Some(existing) = scope.deep_get_type(&synthetic_name) {
            return Ok(existing);
        }

        let mut subst: IndexMap<String, Type> = IndexMap::new();
        for (name, idx) in &self.0.generics {
            subst.insert(name.clone(), resolved[*idx].clone());
        }

        let mut new_properties = IndexMap::new();
        for (prop_name, prop_ty) in &self.0.properties {
            new_properties.insert(prop_name.clone(), substitute(prop_ty, &subst, scope)?);
        }

        let instance = Type(Rc::new(TypeData {
            typename: synthetic_name.clone(),
            built_in: self.0.built_in,
            is_generic_standin: false,
            properties: new_properties,
            generics: IndexMap::new(),
            original_type: Some(self.clone()),
            iface: None,
            alias: None,
            template_ref: None,
        }));

        scope.put(&synthetic_name, Entity::Type(instance.clone()));
        Ok(instance)
    }

    /// Propagate an interface/generic-standin → concrete binding through
    /// this type's structure (crate docs §4.2). Never mutates `self`;
    /// always returns a (possibly identical) new handle.
    #[must_use]
    pub fn realize(&self, map: &InterfaceMap, scope: &Scope) -> Type {
        if let Some(bound) = map.get(self) {
            return bound.clone();
        }
        if self.0.properties.is_empty() || self.0.original_type.is_none() {
            return self.clone();
        }
        let mut changed = false;
        let mut new_properties = IndexMap::new();
        for (name, ty) in &self.0.properties {
            let realized = ty.realize(map, scope);
            changed = changed || !realized.ptr_eq(ty);
            new_properties.insert(name.clone(), realized);
        }
        if !changed {
            return self.clone();
        }
        Type(Rc::new(TypeData {
            typename: self.0.typename.clone(),
            built_in: self.0.built_in,
            is_generic_standin: false,
            properties: new_properties,
            generics: IndexMap::new(),
            original_type: self.0.original_type.clone(),
            iface: None,
            alias: None,
            template_ref: None,
        }))
    }

    /// Structural compatibility test (crate docs §4.2). Records
    /// interface/generic-standin bindings into `interface_map` as they are
    /// discovered.
    pub fn type_applies(&self, other: &Type, scope: &Scope, interface_map: &mut InterfaceMap) -> bool {
        if self.typename() == other.typename() && !self.typename().is_empty() {
            return true;
        }
        if self.is_generic_standin() {
            interface_map.insert(self.clone(), other.clone());
            return true;
        }
        if let Some(iface) = self.interface() {
            let applies = iface.type_applies(other, scope);
            if applies {
                interface_map.insert(self.clone(), other.clone());
            }
            return applies;
        }
        if let (Some(a), Some(b)) = (self.original_type(), other.original_type()) {
            if a.typename() == b.typename() {
                if self.0.properties.len() != other.0.properties.len() {
                    return false;
                }
                return self
                    .0
                    .properties
                    .values()
                    .zip(other.0.properties.values())
                    .all(|(mine, theirs)| mine.type_applies(theirs, scope, interface_map));
            }
        }
        false
    }

    /// Numeric-only cast permission (int widths, float widths, int→float).
    /// Intentionally narrow: used only at the emit-to-event boundary
    /// (crate docs §9, open question: cast widening policy).
    #[must_use]
    pub fn castable(&self, other: &Type) -> bool {
        if self.typename() == other.typename() {
            return true;
        }
        numeric_rank(self.typename())
            .zip(numeric_rank(other.typename()))
            .is_some_and(|(from, to)| widening_allowed(from, to))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum NumKind {
    Int(u8),
    Float(u8),
}

fn numeric_rank(name: &str) -> Option<NumKind> {
    match name {
        "int8" => Some(NumKind::Int(8)),
        "int16" => Some(NumKind::Int(16)),
        "int32" => Some(NumKind::Int(32)),
        "int64" => Some(NumKind::Int(64)),
        "float32" => Some(NumKind::Float(32)),
        "float64" => Some(NumKind::Float(64)),
        _ => None,
    }
}

fn widening_allowed(from: NumKind, to: NumKind) -> bool {
    match (from, to) {
        (NumKind::Int(a), NumKind::Int(b)) => a <= b,
        (NumKind::Float(a), NumKind::Float(b)) => a <= b,
        (NumKind::Int(_), NumKind::Float(_)) => true,
        (NumKind::Float(_), NumKind::Int(_)) => false,
    }
}

/// Replace every generic standin in `ty` reachable via `subst`, recursing
/// through nested [`TemplateRef`] property placeholders.
fn substitute(ty: &Type, subst: &IndexMap<String, Type>, scope: &Scope) -> Result<Type> {
    if ty.is_generic_standin() {
        if let Some(bound) = subst.get(ty.typename()) {
            return Ok(bound.clone());
        }
        return Ok(ty.clone());
    }
    if let Some(template_ref) = &ty.0.template_ref {
        let base = scope
            .deep_get_type(&template_ref.base)
            .ok_or_else(|| LowerError::lookup(format!("no such type `{}`", template_ref.base)))?;
        let mapped_args: Vec<String> = template_ref
            .args
            .iter()
            .map(|a| {
                subst
                    .get(a.as_str())
                    .map(|t| t.typename().to_string())
                    .unwrap_or_else(|| a.clone())
            })
            .collect();
        return base.solidify(&mapped_args, scope);
    }
    Ok(ty.clone())
}

/// Split a comma-separated generic argument list on top-level commas only
/// (commas nested inside `<...>` do not split).
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        parts.push(tail.to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Entity;

    fn root() -> Scope {
        let scope = Scope::new("root");
        crate::types::builtins::install(&scope);
        scope
    }

    #[test]
    fn split_top_level_ignores_nested_commas() {
        assert_eq!(split_top_level("int64"), vec!["int64"]);
        assert_eq!(
            split_top_level("KeyVal<string, int64>, bool"),
            vec!["KeyVal<string, int64>", "bool"]
        );
    }

    #[test]
    fn resolve_name_solidifies_composite_names() {
        let scope = root();
        let ty = Type::resolve_name("Array<int64>", &scope).unwrap();
        assert_eq!(ty.typename(), "Array<int64>");
        assert_eq!(ty.property("element").unwrap().typename(), "int64");
    }

    #[test]
    fn solidify_is_idempotent_per_scope() {
        let scope = root();
        let array = scope.deep_get_type("Array").unwrap();
        let first = array.solidify(&["int64".to_string()], &scope).unwrap();
        let second = array.solidify(&["int64".to_string()], &scope).unwrap();
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn type_applies_is_reflexive() {
        let scope = root();
        let int64 = scope.deep_get_type("int64").unwrap();
        let mut map = InterfaceMap::new();
        assert!(int64.type_applies(&int64, &scope, &mut map));
    }

    #[test]
    fn generic_standin_binds_into_interface_map() {
        let scope = root();
        let t = Type::new_generic_standin("T");
        let int64 = scope.deep_get_type("int64").unwrap();
        let mut map = InterfaceMap::new();
        assert!(t.type_applies(&int64, &scope, &mut map));
        assert!(map.get(&t).unwrap().ptr_eq(&int64));
    }

    #[test]
    fn castable_allows_widening_not_narrowing() {
        let scope = root();
        let int32 = scope.deep_get_type("int32").unwrap();
        let int64 = scope.deep_get_type("int64").unwrap();
        let float64 = scope.deep_get_type("float64").unwrap();
        assert!(int32.castable(&int64));
        assert!(!int64.castable(&int32));
        assert!(int32.castable(&float64));
        assert!(!float64.castable(&int32));
    }

    #[test]
    fn realize_rebuilds_only_when_a_binding_changed() {
        let scope = root();
        let array_template = scope.deep_get_type("Array").unwrap();
        let t = Type::new_generic_standin("T");
        let generics_scope = scope.child("generics");
        generics_scope.put("T", Entity::Type(t.clone()));
        let array_of_t = array_template.solidify(&["T".to_string()], &generics_scope).unwrap();

        let int64 = scope.deep_get_type("int64").unwrap();
        let mut map = InterfaceMap::new();
        map.insert(t, int64.clone());
        let realized = array_of_t.realize(&map, &scope);
        assert_eq!(realized.property("element").unwrap().typename(), "int64");

        let unrelated = Type::new_builtin("Unrelated", IndexMap::new());
        assert!(unrelated.realize(&map, &scope).ptr_eq(&unrelated));
    }
}
