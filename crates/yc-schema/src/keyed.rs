//! # Keyed and Derived Elements
//!
//! A [`KeyedElem`] is a mapping with a fixed, ordered set of fields. Its
//! declaration order is the order of the validated mapping and of dumped
//! output.
//!
//! ## Validation order
//!
//! 1. Keys are case-folded and checked: malformed keys, keys that collide
//!    after folding, and undeclared keys are rejected.
//! 2. Every non-derived field validates its raw value (missing fields see
//!    null and fall back to their default).
//! 3. Derived fields are resolved in declaration order. Each resolver sees
//!    every field validated so far, including earlier derived fields.
//! 4. Every field's post-validator runs against the complete mapping.
//!
//! Values given in the input for derived fields are ignored, so a validated
//! mapping validates to itself.
//!
//! ## Hooks
//!
//! Post-validators and resolvers may sit on the field itself or be
//! registered on the owning keyed element by field name with
//! [`KeyedElem::post_validator_for`] and [`KeyedElem::resolver`]. The
//! field's own hook wins. A derived field with no resolver anywhere fails
//! the build.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;
use yc_core::{ConfigDict, ConfigError, ConfigResult, KeyCase, Value};

use crate::element::{
    expect_dict, normalize_keys, post_validate, ConfigElement, ElemBase, Element, PostValidator,
    Siblings,
};
use crate::emit::DumpOptions;
use crate::events::{Event, ScalarEvent};

/// Computes a derived field from its validated siblings.
pub trait Resolve: Send + Sync {
    /// Compute the field's value from the validated `siblings`.
    fn resolve(&self, siblings: &ConfigDict) -> ConfigResult<Value>;
}

impl<F> Resolve for F
where
    F: Fn(&ConfigDict) -> ConfigResult<Value> + Send + Sync,
{
    fn resolve(&self, siblings: &ConfigDict) -> ConfigResult<Value> {
        self(siblings)
    }
}

/// Shared handle to a resolver.
pub type Resolver = Arc<dyn Resolve>;

// ---------------------------------------------------------------------------
// DerivedElem
// ---------------------------------------------------------------------------

/// A field computed from its siblings instead of read from input.
///
/// Only meaningful inside a keyed element. Never dumped, and never takes a
/// default.
#[derive(Clone)]
pub struct DerivedElem {
    base: ElemBase,
    pub(crate) resolver: Option<Resolver>,
}

impl DerivedElem {
    /// A derived field called `name`. Attach a resolver before building.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ElemBase::named(name),
            resolver: None,
        }
    }

    /// Resolve with a closure.
    pub fn resolver<F>(self, resolve: F) -> Self
    where
        F: Fn(&ConfigDict) -> ConfigResult<Value> + Send + Sync + 'static,
    {
        self.resolve_with(resolve)
    }

    /// Resolve with any [`Resolve`] implementation.
    pub fn resolve_with(mut self, resolver: impl Resolve + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Whether a resolver is attached.
    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    pub(crate) fn resolve(&self, siblings: &ConfigDict) -> ConfigResult<Value> {
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            ConfigError::InvalidSchema(format!(
                "no resolver for derived element '{}'",
                self.base.label
            ))
        })?;
        resolver
            .resolve(siblings)
            .map_err(|source| ConfigError::PostValidation {
                elem: self.kind_name(),
                name: self.base.label.clone(),
                value: siblings.to_string(),
                source: Box::new(source),
            })
    }

    pub(crate) fn finalize(&mut self) -> ConfigResult<()> {
        if !self.base.default.is_null() {
            return Err(ConfigError::InvalidSchema(format!(
                "derived element '{}' cannot have a default",
                self.base.label
            )));
        }
        Ok(())
    }
}

impl ConfigElement for DerivedElem {
    fn base(&self) -> &ElemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        &mut self.base
    }

    fn kind_name(&self) -> &'static str {
        "DerivedElem"
    }

    fn type_name(&self) -> &'static str {
        "derived"
    }

    /// Derived fields have no raw input; their owner resolves them.
    fn validate(&self, _value: &Value, _partial: bool) -> ConfigResult<Value> {
        Ok(Value::Null)
    }

    fn yaml_events(&self, _value: Option<&Value>, _opts: &DumpOptions) -> Vec<Event> {
        Vec::new()
    }
}

impl fmt::Debug for DerivedElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedElem")
            .field("base", &self.base)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl From<DerivedElem> for Element {
    fn from(elem: DerivedElem) -> Self {
        Element::Derived(elem)
    }
}

// ---------------------------------------------------------------------------
// KeyedElem
// ---------------------------------------------------------------------------

/// A mapping with a fixed set of named fields.
#[derive(Clone)]
pub struct KeyedElem {
    base: ElemBase,
    elements: Vec<Element>,
    pub(crate) key_case: KeyCase,
    resolvers: IndexMap<String, Resolver>,
    post_validators: IndexMap<String, PostValidator>,
}

impl KeyedElem {
    /// A named mapping with the given fields, in output order.
    pub fn new(name: impl Into<String>, elements: impl IntoIterator<Item = Element>) -> Self {
        Self::with_base(ElemBase::named(name), elements)
    }

    /// An unnamed mapping, for use as a list or category item.
    pub fn anon(elements: impl IntoIterator<Item = Element>) -> Self {
        Self::with_base(ElemBase::anon(), elements)
    }

    /// The top-level mapping of a document.
    pub(crate) fn root(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut root = Self::anon(elements);
        root.base.label = "<root>".to_string();
        root
    }

    fn with_base(base: ElemBase, elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            base,
            elements: elements.into_iter().collect(),
            key_case: KeyCase::Lower,
            resolvers: IndexMap::new(),
            post_validators: IndexMap::new(),
        }
    }

    /// How keys given in documents are case-folded before matching.
    pub fn key_case(mut self, case: KeyCase) -> Self {
        self.key_case = case;
        self
    }

    /// Register the resolver of the derived field `name`.
    pub fn resolver<F>(self, name: impl Into<String>, resolve: F) -> Self
    where
        F: Fn(&ConfigDict) -> ConfigResult<Value> + Send + Sync + 'static,
    {
        self.resolve_with(name, resolve)
    }

    /// Register a [`Resolve`] implementation for the derived field `name`.
    pub fn resolve_with(mut self, name: impl Into<String>, resolver: impl Resolve + 'static) -> Self {
        self.resolvers.insert(name.into(), Arc::new(resolver));
        self
    }

    /// Register a post-validator for the field `name`. A post-validator set
    /// on the field itself takes precedence.
    pub fn post_validator_for<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&Siblings<'_>, Value) -> ConfigResult<Value> + Send + Sync + 'static,
    {
        self.post_validators.insert(name.into(), Arc::new(hook));
        self
    }

    /// Declared fields in order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// The declared field called `name`.
    pub fn field(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name() == Some(name))
    }

    /// Mutable access to the declared field called `name`.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.name() == Some(name))
    }

    fn field_for_key(&self, folded: &str) -> Option<&Element> {
        self.elements
            .iter()
            .find(|e| e.name().map(|n| self.key_case.normalize(n)).as_deref() == Some(folded))
    }

    pub(crate) fn finalize(&mut self) -> ConfigResult<()> {
        let label = self.base.label.clone();
        let mut seen: Vec<String> = Vec::with_capacity(self.elements.len());
        for (i, elem) in self.elements.iter_mut().enumerate() {
            let name = elem.name().map(str::to_string).ok_or_else(|| {
                ConfigError::InvalidSchema(format!(
                    "field {i} of KeyedElem '{label}' has no name"
                ))
            })?;
            if seen.contains(&name) {
                return Err(ConfigError::InvalidSchema(format!(
                    "KeyedElem '{label}' declares '{name}' more than once"
                )));
            }

            if !elem.base().has_post_validator() {
                if let Some(hook) = self.post_validators.get(&name) {
                    elem.base_mut().post_validator = Some(Arc::clone(hook));
                }
            }
            if let Element::Derived(derived) = elem {
                if !derived.has_resolver() {
                    let resolver = self.resolvers.get(&name).ok_or_else(|| {
                        ConfigError::InvalidSchema(format!(
                            "could not find a resolver for derived element '{name}' in KeyedElem '{label}'"
                        ))
                    })?;
                    derived.resolver = Some(Arc::clone(resolver));
                }
            }

            elem.finalize(Some(label.as_str()))?;
            seen.push(name);
        }

        let registered = self.resolvers.keys().chain(self.post_validators.keys());
        for name in registered {
            if !seen.contains(name) {
                return Err(ConfigError::InvalidSchema(format!(
                    "hook registered for '{name}', which is not a field of KeyedElem '{label}'"
                )));
            }
        }
        Ok(())
    }

    /// Validate into a mapping. See the module docs for the order of steps.
    pub(crate) fn validate_mapping(&self, value: &Value, partial: bool) -> ConfigResult<ConfigDict> {
        let kind = self.kind_name();
        let label = &self.base.label;
        let empty = ConfigDict::new();
        let given = match value {
            Value::Null => {
                if let Some(default) = self.base.default.as_dict() {
                    return Ok(default.clone());
                }
                if self.base.required && !partial {
                    return Err(ConfigError::RequiredMissing {
                        elem: kind,
                        name: label.clone(),
                    });
                }
                &empty
            }
            other => expect_dict(other, kind, label)?,
        };

        let mut inputs: IndexMap<&str, &Value> = IndexMap::with_capacity(given.len());
        for (key, raw) in normalize_keys(given, self.key_case, None, kind, label)? {
            let elem = self.field_for_key(&key).ok_or_else(|| ConfigError::UnknownKey {
                elem: kind,
                name: label.clone(),
                key: key.clone(),
            })?;
            if let Some(name) = elem.name() {
                inputs.insert(name, raw);
            }
        }

        let null = Value::Null;
        let mut validated = ConfigDict::with_capacity(self.elements.len());
        for elem in self.elements.iter().filter(|e| !e.is_derived()) {
            let name = elem.name().unwrap_or_default();
            let raw = inputs.get(name).copied().unwrap_or(&null);
            validated.insert(name, elem.validate(raw, partial)?);
        }

        for elem in &self.elements {
            if let Element::Derived(derived) = elem {
                let name = elem.name().unwrap_or_default();
                let value = derived.resolve(&validated)?;
                debug!(field = %name, value = %value, "resolved derived field");
                validated.insert(name, value);
            }
        }

        let mut out = ConfigDict::with_capacity(self.elements.len());
        for elem in &self.elements {
            let name = elem.name().unwrap_or_default();
            out.insert(name, validated.remove(name).unwrap_or_default());
        }

        for elem in &self.elements {
            let name = elem.name().unwrap_or_default();
            let current = out[name].clone();
            let checked = post_validate(elem, &Siblings::Dict(&out), current)?;
            out.insert(name, checked);
        }

        Ok(out)
    }

    /// Field-wise merge. A null (unsupplied) new field keeps the old value.
    pub(crate) fn merge_mappings(&self, old: &ConfigDict, new: &ConfigDict) -> ConfigDict {
        let mut merged = old.clone();
        for (key, value) in new.iter() {
            let combined = match (old.get(key), self.field(key)) {
                (None, _) => value.clone(),
                (Some(prev), _) if value.is_null() => prev.clone(),
                (Some(prev), Some(elem)) => elem.merge(prev, value),
                (Some(_), None) => value.clone(),
            };
            merged.insert(key, combined);
        }
        merged
    }

    pub(crate) fn mapping_events(&self, values: Option<&ConfigDict>, opts: &DumpOptions) -> Vec<Event> {
        let mut events = vec![Event::MappingStart];
        for elem in &self.elements {
            if elem.is_derived() || elem.base().is_hidden() {
                continue;
            }
            let name = elem.name().unwrap_or_default();
            if opts.show_comments {
                events.push(Event::Comment(elem.make_comment(opts.show_choices, true)));
            }
            events.push(Event::Scalar(ScalarEvent::string(name)));
            events.extend(elem.yaml_events(values.and_then(|d| d.get(name)), opts));
        }
        events.push(Event::MappingEnd);
        events
    }
}

impl ConfigElement for KeyedElem {
    fn base(&self) -> &ElemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        &mut self.base
    }

    fn kind_name(&self) -> &'static str {
        "KeyedElem"
    }

    fn type_name(&self) -> &'static str {
        "dict"
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        self.validate_mapping(value, partial).map(Value::Dict)
    }

    fn merge(&self, old: &Value, new: &Value) -> Value {
        match (old.as_dict(), new.as_dict()) {
            (Some(old), Some(new)) => Value::Dict(self.merge_mappings(old, new)),
            _ if new.is_null() => old.clone(),
            _ => new.clone(),
        }
    }

    fn yaml_events(&self, value: Option<&Value>, opts: &DumpOptions) -> Vec<Event> {
        let values = value
            .and_then(Value::as_dict)
            .or_else(|| self.base.default.as_dict());
        self.mapping_events(values, opts)
    }
}

impl fmt::Debug for KeyedElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedElem")
            .field("base", &self.base)
            .field("elements", &self.elements)
            .field("key_case", &self.key_case)
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("post_validators", &self.post_validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl From<KeyedElem> for Element {
    fn from(elem: KeyedElem) -> Self {
        Element::Keyed(elem)
    }
}
