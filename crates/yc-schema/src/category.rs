//! # Category Elements
//!
//! A category is a mapping whose keys are not declared up front. Every value
//! shares one sub-element. Keys may be restricted to a fixed set of choices.
//!
//! ## Defaults
//!
//! A category's default is a mapping of entries. Validation starts from the
//! default entries and layers every given entry on top with the
//! sub-element's merge, so composite entries combine field by field instead
//! of being replaced.
//!
//! [`DefaultedCategoryElem`] adds a reserved key (`_` unless configured)
//! whose record is laid underneath every other entry before that entry is
//! validated. The reserved record is checked in partial mode, so its fields
//! are optional, and it never appears in validated or dumped output.

use tracing::trace;
use yc_core::{ConfigDict, ConfigError, ConfigResult, KeyCase, Value};

use crate::element::{
    expect_dict, normalize_keys, post_validate, ConfigElement, ElemBase, Element, Siblings,
};
use crate::emit::DumpOptions;
use crate::events::{Event, ScalarEvent};
use crate::keyed::KeyedElem;

// ---------------------------------------------------------------------------
// CategoryElem
// ---------------------------------------------------------------------------

/// An open-keyed mapping with a shared value schema.
#[derive(Debug, Clone)]
pub struct CategoryElem {
    base: ElemBase,
    pub(crate) sub: Box<Element>,
    choices: Option<Vec<String>>,
    key_case: KeyCase,
}

impl CategoryElem {
    /// A named category whose entries all validate against `sub`.
    pub fn new(name: impl Into<String>, sub: impl Into<Element>) -> Self {
        Self::with_base(ElemBase::named(name), sub.into())
    }

    /// An unnamed category, for use as an item of another container.
    pub fn anon(sub: impl Into<Element>) -> Self {
        Self::with_base(ElemBase::anon(), sub.into())
    }

    fn with_base(base: ElemBase, sub: Element) -> Self {
        Self {
            base,
            sub: Box::new(sub),
            choices: None,
            key_case: KeyCase::Lower,
        }
    }

    /// Restrict the keys this category accepts.
    pub fn choices<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Key-case policy for entry keys.
    pub fn key_case(mut self, case: KeyCase) -> Self {
        self.key_case = case;
        self
    }

    /// Schema every entry validates against.
    pub fn sub_elem(&self) -> &Element {
        &self.sub
    }

    pub(crate) fn finalize(&mut self, label: &str) -> ConfigResult<()> {
        if self.sub.is_derived() {
            return Err(ConfigError::InvalidSchema(format!(
                "a derived element cannot be the sub-element of category '{label}'"
            )));
        }
        self.sub.finalize(Some(label))
    }

    /// The given mapping, or `None` when the category was left out.
    fn given<'v>(
        &self,
        value: &'v Value,
        partial: bool,
        kind: &'static str,
    ) -> ConfigResult<Option<&'v ConfigDict>> {
        match value {
            Value::Null if self.base.required && !partial => Err(ConfigError::RequiredMissing {
                elem: kind,
                name: self.base.label.clone(),
            }),
            Value::Null => Ok(None),
            other => expect_dict(other, kind, &self.base.label).map(Some),
        }
    }

    fn check_choice(&self, key: &str, kind: &'static str) -> ConfigResult<()> {
        match &self.choices {
            Some(choices) if !choices.iter().any(|c| c == key) => Err(ConfigError::OutOfRange {
                elem: kind,
                name: self.base.label.clone(),
                reason: format!("'{key}' not in given choices"),
            }),
            _ => Ok(()),
        }
    }

    fn seed(&self) -> ConfigDict {
        self.base.default.as_dict().cloned().unwrap_or_default()
    }

    /// Add a validated entry, merging it over a default entry of the same key.
    fn layer(&self, out: &mut ConfigDict, key: String, validated: Value) {
        let value = match out.get(&key) {
            Some(existing) => {
                trace!(category = %self.base.label, key = %key, "layering entry over default");
                self.sub.merge(existing, &validated)
            }
            None => validated,
        };
        out.insert(key, value);
    }

    fn finish(&self, mut out: ConfigDict) -> ConfigResult<Value> {
        let keys: Vec<String> = out.keys().map(str::to_string).collect();
        for key in keys {
            let current = out[key.as_str()].clone();
            let checked = post_validate(&self.sub, &Siblings::Dict(&out), current)?;
            out.insert(key, checked);
        }
        Ok(Value::Dict(out))
    }
}

impl ConfigElement for CategoryElem {
    fn base(&self) -> &ElemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        &mut self.base
    }

    fn kind_name(&self) -> &'static str {
        "CategoryElem"
    }

    fn type_name(&self) -> &'static str {
        "dict"
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        let kind = self.kind_name();
        let mut out = self.seed();
        if let Some(given) = self.given(value, partial, kind)? {
            for (key, raw) in normalize_keys(given, self.key_case, None, kind, &self.base.label)? {
                self.check_choice(&key, kind)?;
                let validated = self.sub.validate(raw, partial)?;
                self.layer(&mut out, key, validated);
            }
        }
        self.finish(out)
    }

    fn merge(&self, old: &Value, new: &Value) -> Value {
        let (Some(old_dict), Some(new_dict)) = (old.as_dict(), new.as_dict()) else {
            return if new.is_null() { old.clone() } else { new.clone() };
        };
        let mut merged = old_dict.clone();
        for (key, value) in new_dict.iter() {
            let combined = match old_dict.get(key) {
                Some(prev) => self.sub.merge(prev, value),
                None => value.clone(),
            };
            merged.insert(key, combined);
        }
        Value::Dict(merged)
    }

    fn choices_doc(&self) -> Option<String> {
        let choices = self.choices.as_ref().filter(|c| !c.is_empty())?;
        Some(format!("Choices: {}", choices.join(", ")))
    }

    fn yaml_events(&self, value: Option<&Value>, opts: &DumpOptions) -> Vec<Event> {
        let entries = value
            .and_then(Value::as_dict)
            .or_else(|| self.base.default.as_dict());
        let mut events = vec![Event::MappingStart];
        if opts.show_comments {
            events.push(Event::Comment(self.sub.make_comment(opts.show_choices, false)));
        }
        for (key, entry) in entries.into_iter().flat_map(|d| d.iter()) {
            events.push(Event::Scalar(ScalarEvent::string(key)));
            events.extend(self.sub.yaml_events(Some(entry), opts));
        }
        events.push(Event::MappingEnd);
        events
    }
}

impl From<CategoryElem> for Element {
    fn from(elem: CategoryElem) -> Self {
        Element::Category(elem)
    }
}

// ---------------------------------------------------------------------------
// DefaultedCategoryElem
// ---------------------------------------------------------------------------

/// A category of keyed records sharing a baseline record under a reserved
/// key.
///
/// ```yaml
/// cars:
///   _:
///     wheels: 4
///   jeep:
///     drivetrain: 4WD
///   reliant_robin:
///     wheels: 3
/// ```
#[derive(Debug, Clone)]
pub struct DefaultedCategoryElem {
    pub(crate) category: CategoryElem,
    default_key: String,
}

impl DefaultedCategoryElem {
    /// A named defaulted category of records with the given fields.
    pub fn new(name: impl Into<String>, elements: impl IntoIterator<Item = Element>) -> Self {
        Self::from_category(CategoryElem::new(name, KeyedElem::anon(elements)))
    }

    /// An unnamed defaulted category.
    pub fn anon(elements: impl IntoIterator<Item = Element>) -> Self {
        Self::from_category(CategoryElem::anon(KeyedElem::anon(elements)))
    }

    fn from_category(category: CategoryElem) -> Self {
        Self {
            category,
            default_key: "_".to_string(),
        }
    }

    /// The reserved key holding the shared baseline record.
    pub fn default_key(mut self, key: impl Into<String>) -> Self {
        self.default_key = key.into();
        self
    }

    /// Restrict entry keys to `keys`. The reserved default key is always accepted.
    pub fn choices<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category = self.category.choices(keys);
        self
    }

    /// Key-case policy for entry keys.
    pub fn key_case(mut self, case: KeyCase) -> Self {
        self.category.key_case = case;
        self
    }

    /// Record schema shared by every entry.
    pub fn sub_elem(&self) -> &Element {
        &self.category.sub
    }

    pub(crate) fn finalize(&mut self, label: &str) -> ConfigResult<()> {
        self.category.finalize(label)
    }

    fn record_case(&self) -> KeyCase {
        match &*self.category.sub {
            Element::Keyed(keyed) => keyed.key_case,
            _ => self.category.key_case,
        }
    }

    /// Case-folded fields of one raw record.
    fn record_fields<'v>(
        &self,
        raw: &'v Value,
        key: &str,
    ) -> ConfigResult<Vec<(String, &'v Value)>> {
        let sub = &self.category.sub;
        match raw {
            Value::Null => Ok(Vec::new()),
            other => {
                let label = format!("{}.{key}", self.category.base.label);
                let dict = expect_dict(other, sub.kind_name(), &label)?;
                normalize_keys(dict, self.record_case(), None, sub.kind_name(), &label)
            }
        }
    }
}

impl ConfigElement for DefaultedCategoryElem {
    fn base(&self) -> &ElemBase {
        self.category.base()
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        self.category.base_mut()
    }

    fn kind_name(&self) -> &'static str {
        "DefaultedCategoryElem"
    }

    fn type_name(&self) -> &'static str {
        "dict"
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        let kind = self.kind_name();
        let category = &self.category;
        let mut out = category.seed();
        let Some(given) = category.given(value, partial, kind)? else {
            return category.finish(out);
        };

        let null = Value::Null;
        let baseline_raw = given.get(&self.default_key).unwrap_or(&null);
        let baseline = self.record_fields(baseline_raw, &self.default_key)?;
        let baseline_record: ConfigDict =
            baseline.iter().map(|(k, v)| (k.as_str(), (*v).clone())).collect();
        category
            .sub
            .validate(&Value::Dict(baseline_record.clone()), true)?;

        let entries = normalize_keys(
            given,
            category.key_case,
            Some(self.default_key.as_str()),
            kind,
            &category.base.label,
        )?;
        for (key, raw) in entries {
            category.check_choice(&key, kind)?;
            let mut record = baseline_record.clone();
            for (field, field_value) in self.record_fields(raw, &key)? {
                record.insert(field, field_value.clone());
            }
            let validated = category.sub.validate(&Value::Dict(record), partial)?;
            category.layer(&mut out, key, validated);
        }
        category.finish(out)
    }

    fn merge(&self, old: &Value, new: &Value) -> Value {
        self.category.merge(old, new)
    }

    fn choices_doc(&self) -> Option<String> {
        self.category.choices_doc()
    }

    fn yaml_events(&self, value: Option<&Value>, opts: &DumpOptions) -> Vec<Event> {
        self.category.yaml_events(value, opts)
    }
}

impl From<DefaultedCategoryElem> for Element {
    fn from(elem: DefaultedCategoryElem) -> Self {
        Element::DefaultedCategory(elem)
    }
}
