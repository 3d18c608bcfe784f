//! # Element Model
//!
//! Every node of a schema tree is an [`Element`]: a closed set of variants
//! behind one capability trait, [`ConfigElement`]. Validation, merging,
//! comment generation and event generation all recurse through that trait.
//!
//! ## Building
//!
//! Elements are declared with chainable setters from [`ElemOptions`] and
//! turned into a usable schema node by [`ElemOptions::build`]. Building is
//! where authoring mistakes surface, as `InvalidSchema`:
//!
//! - names that are not lowercase identifiers,
//! - hidden + required fields without a default,
//! - defaults that do not validate (defaults are stored normalized, so
//!   `RegexElem` with default `5` stores `"5"`),
//! - derived fields without a resolver, or used as list/category items.
//!
//! Containers build their children, so only the outermost element needs an
//! explicit `build()`. Anonymous sub-elements of lists and categories are
//! labelled `parent.*` in diagnostics, matching the dotted-path syntax.
//!
//! ## Dotted paths
//!
//! [`Element::find`] resolves paths such as `cars.*.color`. Keyed elements
//! are addressed by field name, the single sub-element of a list or
//! category by `*`, and the empty path resolves to the element itself.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;
use yc_core::{is_valid_key, validate_name, ConfigDict, ConfigError, ConfigResult, KeyCase, Value};

use crate::category::{CategoryElem, DefaultedCategoryElem};
use crate::emit::DumpOptions;
use crate::events::Event;
use crate::keyed::{DerivedElem, KeyedElem};
use crate::list::{CodeElem, ListElem};
use crate::scalar::{RangeElem, RegexElem, ScalarElem};

/// Cross-field validation hook. Receives the already validated siblings
/// and the field's value, and returns the (possibly adjusted) value.
pub type PostValidator = Arc<dyn Fn(&Siblings<'_>, Value) -> ConfigResult<Value> + Send + Sync>;

/// Context handed to a [`PostValidator`].
#[derive(Debug, Clone, Copy)]
pub enum Siblings<'a> {
    /// The validated mapping the field belongs to.
    Dict(&'a ConfigDict),
    /// The validated list the item belongs to.
    List(&'a [Value]),
}

impl<'a> Siblings<'a> {
    /// Look up a sibling field. Always `None` for list context.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        match *self {
            Siblings::Dict(d) => d.get(key),
            Siblings::List(_) => None,
        }
    }

    /// The sibling mapping, in keyed context.
    pub fn as_dict(&self) -> Option<&'a ConfigDict> {
        match *self {
            Siblings::Dict(d) => Some(d),
            Siblings::List(_) => None,
        }
    }

    /// The sibling items, in list context.
    pub fn as_list(&self) -> Option<&'a [Value]> {
        match *self {
            Siblings::List(l) => Some(l),
            Siblings::Dict(_) => None,
        }
    }
}

/// Options shared by every element kind.
#[derive(Clone, Default)]
pub struct ElemBase {
    pub(crate) name: Option<String>,
    pub(crate) label: String,
    pub(crate) required: bool,
    pub(crate) hidden: bool,
    pub(crate) default: Value,
    pub(crate) help: String,
    pub(crate) post_validator: Option<PostValidator>,
}

impl ElemBase {
    pub(crate) fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name: Some(name),
            ..Self::default()
        }
    }

    pub(crate) fn anon() -> Self {
        Self::default()
    }

    /// Declared name; `None` for list and category items.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used in diagnostics (`parent.*` for anonymous items).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether a value must be supplied.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the element is left out of dumps.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// The normalized default, or `Value::Null` when there is none.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Help text shown in generated comments.
    pub fn help_text(&self) -> &str {
        &self.help
    }

    /// Whether a post-validator is attached.
    pub fn has_post_validator(&self) -> bool {
        self.post_validator.is_some()
    }

    /// Outcome for an absent value: the default, a `RequiredMissing`
    /// failure, or null.
    pub(crate) fn missing(&self, elem: &'static str, partial: bool) -> ConfigResult<Value> {
        if !self.default.is_null() {
            return Ok(self.default.clone());
        }
        if self.required && !partial {
            return Err(ConfigError::RequiredMissing {
                elem,
                name: self.label.clone(),
            });
        }
        Ok(Value::Null)
    }
}

impl fmt::Debug for ElemBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElemBase")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("required", &self.required)
            .field("hidden", &self.hidden)
            .field("default", &self.default)
            .field("help", &self.help)
            .field("post_validator", &self.post_validator.is_some())
            .finish()
    }
}

/// The capability every schema node implements.
pub trait ConfigElement {
    /// Options shared by every element kind.
    fn base(&self) -> &ElemBase;

    /// Mutable access to the shared options.
    fn base_mut(&mut self) -> &mut ElemBase;

    /// Element kind used in diagnostics, e.g. `StrElem`.
    fn kind_name(&self) -> &'static str;

    /// Type name used in generated comments, e.g. `int` or `list`.
    fn type_name(&self) -> &'static str;

    /// Convert and constrain-check a raw value. `partial` suppresses
    /// missing-required failures.
    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value>;

    /// Combine an old validated value with a new one. New replaces old
    /// unless the element says otherwise.
    fn merge(&self, old: &Value, new: &Value) -> Value {
        let _ = old;
        new.clone()
    }

    /// Second comment line describing choices, range or length.
    fn choices_doc(&self) -> Option<String> {
        None
    }

    /// Serialization events for `value`. `None` produces the template form.
    fn yaml_events(&self, value: Option<&Value>, opts: &DumpOptions) -> Vec<Event>;
}

/// Chainable options shared by every element kind.
pub trait ElemOptions: ConfigElement + Into<Element> + Sized {
    /// Mark the element as required.
    fn required(mut self) -> Self {
        self.base_mut().required = true;
        self
    }

    /// Exclude the element from dumped output. It is still accepted on input.
    fn hidden(mut self) -> Self {
        self.base_mut().hidden = true;
        self
    }

    /// Default used when no value is supplied. Validated when built.
    fn default(mut self, value: impl Into<Value>) -> Self {
        self.base_mut().default = value.into();
        self
    }

    /// Help text shown in generated comments.
    fn help(mut self, text: impl Into<String>) -> Self {
        self.base_mut().help = text.into();
        self
    }

    /// Attach a post-validator to this element.
    fn post_validator<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Siblings<'_>, Value) -> ConfigResult<Value> + Send + Sync + 'static,
    {
        self.base_mut().post_validator = Some(Arc::new(hook));
        self
    }

    /// Run the construction-time checks and return the finished element.
    fn build(self) -> ConfigResult<Element> {
        let mut elem: Element = self.into();
        elem.finalize(None)?;
        Ok(elem)
    }
}

impl<T: ConfigElement + Into<Element>> ElemOptions for T {}

/// A schema node.
#[derive(Debug, Clone)]
pub enum Element {
    /// A typed scalar.
    Scalar(ScalarElem),
    /// A bounded number.
    Range(RangeElem),
    /// A pattern-checked string.
    Regex(RegexElem),
    /// A homogeneous list.
    List(ListElem),
    /// A multi-line code block.
    Code(CodeElem),
    /// A mapping with declared fields.
    Keyed(KeyedElem),
    /// A mapping with open keys.
    Category(CategoryElem),
    /// A category of records sharing a baseline.
    DefaultedCategory(DefaultedCategoryElem),
    /// A field computed from its siblings.
    Derived(DerivedElem),
}

impl Element {
    fn as_dyn(&self) -> &dyn ConfigElement {
        match self {
            Element::Scalar(e) => e,
            Element::Range(e) => e,
            Element::Regex(e) => e,
            Element::List(e) => e,
            Element::Code(e) => e,
            Element::Keyed(e) => e,
            Element::Category(e) => e,
            Element::DefaultedCategory(e) => e,
            Element::Derived(e) => e,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn ConfigElement {
        match self {
            Element::Scalar(e) => e,
            Element::Range(e) => e,
            Element::Regex(e) => e,
            Element::List(e) => e,
            Element::Code(e) => e,
            Element::Keyed(e) => e,
            Element::Category(e) => e,
            Element::DefaultedCategory(e) => e,
            Element::Derived(e) => e,
        }
    }

    /// Declared name; `None` for anonymous items.
    pub fn name(&self) -> Option<&str> {
        self.base().name()
    }

    /// Name used in diagnostics.
    pub fn label(&self) -> &str {
        self.base().label()
    }

    /// Whether this is a derived field.
    pub fn is_derived(&self) -> bool {
        matches!(self, Element::Derived(_))
    }

    /// Documentation comment: `NAME(required TYPE): help`, plus a second
    /// line with choices, range or length when `show_choices` is set.
    pub fn make_comment(&self, show_choices: bool, show_name: bool) -> String {
        let base = self.base();
        let name = if show_name {
            base.name().unwrap_or_default().to_uppercase()
        } else {
            String::new()
        };
        let required = if base.required { "required " } else { "" };
        let colon = if base.help.is_empty() { "" } else { ":" };
        let mut comment = format!(
            "{name}({required}{}){colon} {}",
            self.type_name(),
            base.help
        )
        .trim_end()
        .to_string();
        if show_choices {
            if let Some(doc) = self.choices_doc() {
                comment.push('\n');
                comment.push_str(&doc);
            }
        }
        comment
    }

    /// Resolve a dotted path to a schema node.
    pub fn find(&self, path: &str) -> ConfigResult<&Element> {
        let mut current = self;
        if path.is_empty() {
            return Ok(current);
        }
        for segment in path.split('.') {
            current = current.child(segment).map_err(|reason| ConfigError::NotFound {
                path: path.to_string(),
                reason,
            })?;
        }
        Ok(current)
    }

    /// Mutable counterpart of [`find`](Self::find).
    pub fn find_mut(&mut self, path: &str) -> ConfigResult<&mut Element> {
        let mut current = self;
        if path.is_empty() {
            return Ok(current);
        }
        for segment in path.split('.') {
            current = current.child_mut(segment).map_err(|reason| ConfigError::NotFound {
                path: path.to_string(),
                reason,
            })?;
        }
        Ok(current)
    }

    /// Replace the default of the node at `path`. The new default is
    /// validated in partial mode and stored normalized; `Value::Null`
    /// clears it.
    pub fn set_default(&mut self, path: &str, value: impl Into<Value>) -> ConfigResult<()> {
        self.find_mut(path)?.replace_default(value.into())
    }

    fn replace_default(&mut self, value: Value) -> ConfigResult<()> {
        if let Element::Derived(d) = self {
            return Err(ConfigError::DerivedDefault {
                name: d.base().label.clone(),
            });
        }
        let normalized = if value.is_null() {
            Value::Null
        } else {
            self.validate(&value, true)?
        };
        debug!(element = %self.label(), default = %normalized, "default overridden");
        self.base_mut().default = normalized;
        Ok(())
    }

    fn sub_elem(&self) -> Option<&Element> {
        match self {
            Element::List(e) => Some(&*e.sub),
            Element::Code(e) => Some(&*e.sub),
            Element::Category(e) => Some(&*e.sub),
            Element::DefaultedCategory(e) => Some(&*e.category.sub),
            _ => None,
        }
    }

    fn sub_elem_mut(&mut self) -> Option<&mut Element> {
        match self {
            Element::List(e) => Some(&mut *e.sub),
            Element::Code(e) => Some(&mut *e.sub),
            Element::Category(e) => Some(&mut *e.sub),
            Element::DefaultedCategory(e) => Some(&mut *e.category.sub),
            _ => None,
        }
    }

    fn child(&self, segment: &str) -> Result<&Element, String> {
        if let Element::Keyed(k) = self {
            return k.field(segment).ok_or_else(|| {
                format!(
                    "{} called '{}' has no field '{segment}'",
                    k.kind_name(),
                    k.base().label
                )
            });
        }
        match self.sub_elem() {
            Some(sub) if segment == "*" => Ok(sub),
            Some(_) => Err(format!(
                "the sub-element of {} called '{}' must be given as '*', got '{segment}'",
                self.kind_name(),
                self.label()
            )),
            None => Err(format!(
                "{} called '{}' has no sub-elements",
                self.kind_name(),
                self.label()
            )),
        }
    }

    fn child_mut(&mut self, segment: &str) -> Result<&mut Element, String> {
        let kind = self.kind_name();
        let label = self.label().to_string();
        if let Element::Keyed(k) = self {
            return k
                .field_mut(segment)
                .ok_or_else(|| format!("{kind} called '{label}' has no field '{segment}'"));
        }
        match self.sub_elem_mut() {
            Some(sub) if segment == "*" => Ok(sub),
            Some(_) => Err(format!(
                "the sub-element of {kind} called '{label}' must be given as '*', got '{segment}'"
            )),
            None => Err(format!("{kind} called '{label}' has no sub-elements")),
        }
    }

    /// Construction-time checks, recursing into children. `parent` is the
    /// label of the owning list or category, used to name anonymous items.
    pub(crate) fn finalize(&mut self, parent: Option<&str>) -> ConfigResult<()> {
        {
            let base = self.base_mut();
            match (&base.name, parent) {
                (Some(name), _) => {
                    validate_name(name)?;
                    base.label = name.clone();
                }
                (None, Some(parent)) => base.label = format!("{parent}.*"),
                (None, None) => {}
            }
        }

        let label = self.label().to_string();
        match self {
            Element::Scalar(e) => e.finalize()?,
            Element::Range(e) => e.finalize()?,
            Element::Regex(e) => e.finalize()?,
            Element::List(e) => e.finalize(&label)?,
            Element::Code(e) => e.finalize(&label)?,
            Element::Keyed(e) => e.finalize()?,
            Element::Category(e) => e.finalize(&label)?,
            Element::DefaultedCategory(e) => e.finalize(&label)?,
            Element::Derived(e) => e.finalize()?,
        }

        let base = self.base();
        if base.hidden && base.required && is_empty_default(&base.default) {
            return Err(ConfigError::InvalidSchema(format!(
                "{} called '{label}' is hidden and required, so it needs a default",
                self.kind_name()
            )));
        }
        if !base.default.is_null() {
            let raw = base.default.clone();
            let normalized = self.validate(&raw, true).map_err(|err| {
                ConfigError::InvalidSchema(format!("invalid default for '{label}': {err}"))
            })?;
            self.base_mut().default = normalized;
        }
        Ok(())
    }
}

impl ConfigElement for Element {
    fn base(&self) -> &ElemBase {
        self.as_dyn().base()
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        self.as_dyn_mut().base_mut()
    }

    fn kind_name(&self) -> &'static str {
        self.as_dyn().kind_name()
    }

    fn type_name(&self) -> &'static str {
        self.as_dyn().type_name()
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        self.as_dyn().validate(value, partial)
    }

    fn merge(&self, old: &Value, new: &Value) -> Value {
        self.as_dyn().merge(old, new)
    }

    fn choices_doc(&self) -> Option<String> {
        self.as_dyn().choices_doc()
    }

    fn yaml_events(&self, value: Option<&Value>, opts: &DumpOptions) -> Vec<Event> {
        self.as_dyn().yaml_events(value, opts)
    }
}

fn is_empty_default(default: &Value) -> bool {
    match default {
        Value::Null => true,
        Value::List(l) => l.is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the element kinds
// ---------------------------------------------------------------------------

/// Run the post-validator of `elem` over `value`. Optional fields that
/// validated to null are skipped. Failures are wrapped with the element
/// kind, label and value.
pub(crate) fn post_validate(
    elem: &Element,
    siblings: &Siblings<'_>,
    value: Value,
) -> ConfigResult<Value> {
    let base = elem.base();
    if !base.required && value.is_null() {
        return Ok(value);
    }
    match &base.post_validator {
        Some(hook) => hook(siblings, value.clone()).map_err(|source| {
            ConfigError::PostValidation {
                elem: elem.kind_name(),
                name: base.label.clone(),
                value: value.to_string(),
                source: Box::new(source),
            }
        }),
        None => Ok(value),
    }
}

/// The mapping inside `value`, or a `TypeConversion` failure.
pub(crate) fn expect_dict<'v>(
    value: &'v Value,
    elem: &'static str,
    name: &str,
) -> ConfigResult<&'v ConfigDict> {
    value.as_dict().ok_or_else(|| ConfigError::TypeConversion {
        elem,
        name: name.to_string(),
        expected: "dict".to_string(),
        value: value.to_string(),
    })
}

/// Case-fold the keys of `dict`, rejecting keys that do not match the name
/// pattern and keys that collide after folding. `reserved` is skipped.
pub(crate) fn normalize_keys<'v>(
    dict: &'v ConfigDict,
    case: KeyCase,
    reserved: Option<&str>,
    elem: &'static str,
    name: &str,
) -> ConfigResult<Vec<(String, &'v Value)>> {
    let mut given: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut out = Vec::with_capacity(dict.len());
    for (key, value) in dict.iter() {
        if reserved == Some(key) {
            continue;
        }
        if !is_valid_key(key) {
            return Err(ConfigError::InvalidKey {
                elem,
                name: name.to_string(),
                key: key.to_string(),
                pattern: yc_core::NAME_PATTERN.to_string(),
            });
        }
        let folded = case.normalize(key);
        given.entry(folded.clone()).or_default().push(key.to_string());
        out.push((folded, value));
    }
    if let Some(keys) = given.values().find(|keys| keys.len() > 1) {
        return Err(ConfigError::DuplicateKey {
            elem,
            name: name.to_string(),
            keys: keys.clone(),
            case: case.as_str().to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use yc_core::ErrorKind;

    fn cars() -> ConfigResult<Element> {
        ListElem::new(
            "cars",
            KeyedElem::anon([
                ScalarElem::str("color").into(),
                ScalarElem::str("make").into(),
                ScalarElem::int("year").into(),
            ]),
        )
        .build()
    }

    #[test]
    fn test_find_by_dotted_path() {
        let elem = cars().unwrap();
        assert_eq!(elem.find("").unwrap().label(), "cars");
        assert_eq!(elem.find("*").unwrap().label(), "cars.*");
        assert_eq!(elem.find("*.color").unwrap().label(), "color");
    }

    #[test]
    fn test_find_rejects_bad_segments() {
        let elem = cars().unwrap();
        let err = elem.find("color").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownKey);
        let err = elem.find("*.wheels").unwrap_err();
        assert!(err.to_string().contains("wheels"));
        assert!(elem.find("*.color.hue").is_err());
    }

    #[test]
    fn test_make_comment() {
        let elem = ScalarElem::str("pet")
            .required()
            .help("The kind of pet.")
            .choices(["squirrel", "cat", "dog"])
            .build()
            .unwrap();
        assert_eq!(
            elem.make_comment(true, true),
            "PET(required str): The kind of pet.\nChoices: squirrel, cat, dog"
        );
        assert_eq!(elem.make_comment(false, false), "(required str): The kind of pet.");

        let bare = ScalarElem::int("legs").build().unwrap();
        assert_eq!(bare.make_comment(true, true), "LEGS(int)");
    }

    #[test]
    fn test_bad_names_fail_fast() {
        let err = ScalarElem::str("Pet").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
        let err = KeyedElem::new("outer", [ScalarElem::int("9lives").into()])
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
    }

    #[test]
    fn test_hidden_required_needs_default() {
        let err = ScalarElem::str("secret").hidden().required().build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
        assert!(ScalarElem::str("secret")
            .hidden()
            .required()
            .default("x")
            .build()
            .is_ok());
    }

    #[test]
    fn test_set_default_validates_and_normalizes() {
        let mut elem = cars().unwrap();
        elem.set_default("*.year", "1999").unwrap();
        assert_eq!(elem.find("*.year").unwrap().base().default_value(), &Value::Int(1999));

        let err = elem.set_default("*.year", "old").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConversion);

        elem.set_default("*.year", Value::Null).unwrap();
        assert!(elem.find("*.year").unwrap().base().default_value().is_null());
    }

    #[test]
    fn test_normalize_keys_detects_collisions() {
        let dict: ConfigDict = [("Color", 1), ("color", 2)].into_iter().collect();
        let err = normalize_keys(&dict, KeyCase::Lower, None, "KeyedElem", "car").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert!(normalize_keys(&dict, KeyCase::Mixed, None, "KeyedElem", "car").is_ok());

        let dict: ConfigDict = [("bad-key", 1)].into_iter().collect();
        let err = normalize_keys(&dict, KeyCase::Lower, None, "KeyedElem", "car").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_post_validation_failures_carry_context() {
        let elem = ScalarElem::int("legs")
            .post_validator(|_, v| match v.as_i64() {
                Some(n) if n % 2 == 1 => Err(ConfigError::rejected("odd number of legs")),
                _ => Ok(v),
            })
            .build()
            .unwrap();
        let dict = ConfigDict::new();
        let siblings = Siblings::Dict(&dict);
        assert_eq!(post_validate(&elem, &siblings, Value::Int(4)).unwrap(), Value::Int(4));
        let err = post_validate(&elem, &siblings, Value::Int(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert!(err.to_string().contains("legs"));
        // Optional fields without a value are not post-validated.
        assert!(post_validate(&elem, &siblings, Value::Null).unwrap().is_null());
    }
}
