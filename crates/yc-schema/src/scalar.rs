//! Scalar elements: plain typed scalars, numeric ranges, and
//! regex-constrained strings.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use yc_core::{ConfigError, ConfigResult, ScalarType, Value};

use crate::element::{ConfigElement, ElemBase, Element};
use crate::emit::DumpOptions;
use crate::events::{Event, ScalarEvent};

/// Replacement for the built-in conversion rules of a [`ScalarElem`].
/// Returns `None` when the value cannot be converted.
pub type Converter = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

fn scalar_events(base: &ElemBase, value: Option<&Value>) -> Vec<Event> {
    let value = value.filter(|v| !v.is_null()).unwrap_or(&base.default);
    vec![Event::Scalar(ScalarEvent::from_value(value))]
}

// ---------------------------------------------------------------------------
// ScalarElem
// ---------------------------------------------------------------------------

/// A single typed value: `int`, `float`, `bool`, `str` or `Path`.
#[derive(Clone)]
pub struct ScalarElem {
    base: ElemBase,
    ty: ScalarType,
    choices: Option<Vec<Value>>,
    converter: Option<Converter>,
}

impl ScalarElem {
    /// A named scalar of type `ty`.
    pub fn new(name: impl Into<String>, ty: ScalarType) -> Self {
        Self::with_base(ElemBase::named(name), ty)
    }

    /// An unnamed scalar, for use as a list or category item.
    pub fn anon(ty: ScalarType) -> Self {
        Self::with_base(ElemBase::anon(), ty)
    }

    fn with_base(base: ElemBase, ty: ScalarType) -> Self {
        Self {
            base,
            ty,
            choices: None,
            converter: None,
        }
    }

    /// A named `int` scalar.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Int)
    }

    /// A named `float` scalar.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Float)
    }

    /// A named `bool` scalar.
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Bool)
    }

    /// A named `str` scalar.
    pub fn str(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Str)
    }

    /// A named `Path` scalar.
    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name, ScalarType::Path)
    }

    /// Declared target type.
    pub fn scalar_type(&self) -> ScalarType {
        self.ty
    }

    /// Restrict the value to a fixed set. Choices are converted to the
    /// element's type when built.
    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Use `convert` instead of the built-in conversion rules.
    pub fn converter<F>(mut self, convert: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(convert));
        self
    }

    fn convert(&self, value: &Value) -> ConfigResult<Value> {
        if self.ty.matches(value) {
            return Ok(value.clone());
        }
        match &self.converter {
            Some(convert) => convert(value).ok_or_else(|| ConfigError::TypeConversion {
                elem: self.kind_name(),
                name: self.base.label.clone(),
                expected: self.ty.as_str().to_string(),
                value: value.to_string(),
            }),
            None => self.ty.coerce(value, self.kind_name(), &self.base.label),
        }
    }

    pub(crate) fn finalize(&mut self) -> ConfigResult<()> {
        if let Some(choices) = self.choices.take() {
            let converted = choices
                .iter()
                .map(|c| self.convert(c))
                .collect::<ConfigResult<Vec<_>>>()
                .map_err(|err| {
                    ConfigError::InvalidSchema(format!(
                        "invalid choices for '{}': {err}",
                        self.base.label
                    ))
                })?;
            self.choices = Some(converted);
        }
        Ok(())
    }
}

impl ConfigElement for ScalarElem {
    fn base(&self) -> &ElemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        &mut self.base
    }

    fn kind_name(&self) -> &'static str {
        match self.ty {
            ScalarType::Int => "IntElem",
            ScalarType::Float => "FloatElem",
            ScalarType::Bool => "BoolElem",
            ScalarType::Str => "StrElem",
            ScalarType::Path => "PathElem",
        }
    }

    fn type_name(&self) -> &'static str {
        self.ty.as_str()
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        if value.is_null() {
            return self.base.missing(self.kind_name(), partial);
        }
        let value = self.convert(value)?;
        if let Some(choices) = &self.choices {
            if !choices.contains(&value) {
                return Err(ConfigError::OutOfRange {
                    elem: self.kind_name(),
                    name: self.base.label.clone(),
                    reason: format!("'{value}' is not one of the given choices"),
                });
            }
        }
        Ok(value)
    }

    fn choices_doc(&self) -> Option<String> {
        let choices = self.choices.as_ref().filter(|c| !c.is_empty())?;
        let listed: Vec<String> = choices.iter().map(ToString::to_string).collect();
        Some(format!("Choices: {}", listed.join(", ")))
    }

    fn yaml_events(&self, value: Option<&Value>, _opts: &DumpOptions) -> Vec<Event> {
        scalar_events(&self.base, value)
    }
}

impl fmt::Debug for ScalarElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarElem")
            .field("base", &self.base)
            .field("ty", &self.ty)
            .field("choices", &self.choices)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

impl From<ScalarElem> for Element {
    fn from(elem: ScalarElem) -> Self {
        Element::Scalar(elem)
    }
}

// ---------------------------------------------------------------------------
// RangeElem
// ---------------------------------------------------------------------------

/// A numeric value strictly between optional bounds.
///
/// Bounds are exclusive: with `min(0)` and `max(10)`, both 0 and 10 are
/// rejected.
#[derive(Debug, Clone)]
pub struct RangeElem {
    base: ElemBase,
    ty: ScalarType,
    vmin: Option<Value>,
    vmax: Option<Value>,
}

impl RangeElem {
    /// A named integer range.
    pub fn int(name: impl Into<String>) -> Self {
        Self::with_base(ElemBase::named(name), ScalarType::Int)
    }

    /// A named float range.
    pub fn float(name: impl Into<String>) -> Self {
        Self::with_base(ElemBase::named(name), ScalarType::Float)
    }

    /// An unnamed range, for use as a list or category item. Only `Int` and
    /// `Float` make sense here; anything else fails when built.
    pub fn anon(ty: ScalarType) -> Self {
        Self::with_base(ElemBase::anon(), ty)
    }

    fn with_base(base: ElemBase, ty: ScalarType) -> Self {
        Self {
            base,
            ty,
            vmin: None,
            vmax: None,
        }
    }

    /// Exclusive lower bound.
    pub fn min(mut self, vmin: impl Into<Value>) -> Self {
        self.vmin = Some(vmin.into());
        self
    }

    /// Exclusive upper bound.
    pub fn max(mut self, vmax: impl Into<Value>) -> Self {
        self.vmax = Some(vmax.into());
        self
    }

    pub(crate) fn finalize(&mut self) -> ConfigResult<()> {
        if !matches!(self.ty, ScalarType::Int | ScalarType::Float) {
            return Err(ConfigError::InvalidSchema(format!(
                "range element '{}' must be int or float, not {}",
                self.base.label, self.ty
            )));
        }
        for bound in [&mut self.vmin, &mut self.vmax] {
            if let Some(value) = bound.take() {
                let converted = self.ty.convert(&value).ok_or_else(|| {
                    ConfigError::InvalidSchema(format!(
                        "range bound {value} of '{}' is not a valid {}",
                        self.base.label, self.ty
                    ))
                })?;
                *bound = Some(converted);
            }
        }
        Ok(())
    }

    fn bound(value: &Option<Value>) -> Option<f64> {
        value.as_ref().and_then(Value::as_f64)
    }
}

impl ConfigElement for RangeElem {
    fn base(&self) -> &ElemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        &mut self.base
    }

    fn kind_name(&self) -> &'static str {
        match self.ty {
            ScalarType::Float => "FloatRangeElem",
            _ => "IntRangeElem",
        }
    }

    fn type_name(&self) -> &'static str {
        self.ty.as_str()
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        if value.is_null() {
            return self.base.missing(self.kind_name(), partial);
        }
        let value = self.ty.coerce(value, self.kind_name(), &self.base.label)?;
        let n = value.as_f64().unwrap_or(f64::NAN);
        let above = Self::bound(&self.vmin).map_or(true, |lo| lo < n);
        let below = Self::bound(&self.vmax).map_or(true, |hi| n < hi);
        if !(above && below) {
            return Err(ConfigError::OutOfRange {
                elem: self.kind_name(),
                name: self.base.label.clone(),
                reason: format!(
                    "{value} is outside the range ({})",
                    self.choices_doc().unwrap_or_default()
                ),
            });
        }
        Ok(value)
    }

    fn choices_doc(&self) -> Option<String> {
        match (&self.vmin, &self.vmax) {
            (None, None) => None,
            (Some(lo), None) => Some(format!("Valid Range: > {lo}")),
            (None, Some(hi)) => Some(format!("Valid Range: < {hi}")),
            (Some(lo), Some(hi)) => Some(format!("Valid Range: {lo} - {hi}")),
        }
    }

    fn yaml_events(&self, value: Option<&Value>, _opts: &DumpOptions) -> Vec<Event> {
        scalar_events(&self.base, value)
    }
}

impl From<RangeElem> for Element {
    fn from(elem: RangeElem) -> Self {
        Element::Range(elem)
    }
}

// ---------------------------------------------------------------------------
// RegexElem
// ---------------------------------------------------------------------------

/// A string that must match a pattern at its start.
#[derive(Debug, Clone)]
pub struct RegexElem {
    base: ElemBase,
    pattern: String,
    regex: Result<Regex, regex::Error>,
}

impl RegexElem {
    /// The pattern is compiled once, here; a bad pattern fails when the
    /// element is built.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::with_base(ElemBase::named(name), pattern.into())
    }

    /// An unnamed regex element, for use as a list or category item.
    pub fn anon(pattern: impl Into<String>) -> Self {
        Self::with_base(ElemBase::anon(), pattern.into())
    }

    fn with_base(base: ElemBase, pattern: String) -> Self {
        let regex = Regex::new(&format!("^(?:{pattern})"));
        Self {
            base,
            pattern,
            regex,
        }
    }

    /// The pattern as declared, without the added anchor.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn compiled(&self) -> ConfigResult<&Regex> {
        self.regex.as_ref().map_err(|err| {
            ConfigError::InvalidSchema(format!(
                "invalid regex for '{}': {err}",
                self.base.label
            ))
        })
    }

    pub(crate) fn finalize(&mut self) -> ConfigResult<()> {
        self.compiled().map(|_| ())
    }
}

impl ConfigElement for RegexElem {
    fn base(&self) -> &ElemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        &mut self.base
    }

    fn kind_name(&self) -> &'static str {
        "RegexElem"
    }

    fn type_name(&self) -> &'static str {
        "str"
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        if value.is_null() {
            return self.base.missing(self.kind_name(), partial);
        }
        let value = ScalarType::Str.coerce(value, self.kind_name(), &self.base.label)?;
        let text = value.as_str().unwrap_or_default();
        if !self.compiled()?.is_match(text) {
            return Err(ConfigError::OutOfRange {
                elem: self.kind_name(),
                name: self.base.label.clone(),
                reason: format!("'{text}' does not match r'{}'", self.pattern),
            });
        }
        Ok(value)
    }

    fn choices_doc(&self) -> Option<String> {
        Some(format!("Values must match: r'{}'", self.pattern))
    }

    fn yaml_events(&self, value: Option<&Value>, _opts: &DumpOptions) -> Vec<Event> {
        scalar_events(&self.base, value)
    }
}

impl From<RegexElem> for Element {
    fn from(elem: RegexElem) -> Self {
        Element::Regex(elem)
    }
}
