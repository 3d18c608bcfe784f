//! Sequence elements: homogeneous lists and code blocks.
//!
//! ## List shortcuts
//!
//! A list accepts three input shapes:
//!
//! ```yaml
//! colors: red                   # a bare item is a one-item list
//! colors: [red, yellow, green]
//! colors:
//!   - red
//!   - blue
//! ```
//!
//! An absent list becomes a copy of the declared defaults, marked implicit
//! so that merging does not let it overwrite an explicitly given list.

use std::fmt;
use std::sync::Arc;

use yc_core::{ConfigError, ConfigResult, ScalarType, Value, ValueList};

use crate::element::{post_validate, ConfigElement, ElemBase, Element, Siblings};
use crate::emit::DumpOptions;
use crate::events::Event;
use crate::scalar::ScalarElem;

/// Keep `old` when `new` was never supplied, otherwise take `new`.
fn merge_sequence(old: &Value, new: &Value) -> Value {
    let unsupplied = match new {
        Value::Null => true,
        Value::List(list) => list.is_implicit(),
        _ => false,
    };
    if !unsupplied {
        return new.clone();
    }
    if old.is_null() {
        Value::List(ValueList::default())
    } else {
        old.clone()
    }
}

// ---------------------------------------------------------------------------
// ListElem
// ---------------------------------------------------------------------------

/// An ordered list whose items all validate against one sub-element.
#[derive(Debug, Clone)]
pub struct ListElem {
    base: ElemBase,
    pub(crate) sub: Box<Element>,
    min_length: usize,
    max_length: Option<usize>,
}

impl ListElem {
    /// A named list whose items validate against `sub`.
    pub fn new(name: impl Into<String>, sub: impl Into<Element>) -> Self {
        Self::with_base(ElemBase::named(name), sub.into())
    }

    /// An unnamed list, for use as an item of another list or category.
    pub fn anon(sub: impl Into<Element>) -> Self {
        Self::with_base(ElemBase::anon(), sub.into())
    }

    fn with_base(base: ElemBase, sub: Element) -> Self {
        Self {
            base,
            sub: Box::new(sub),
            min_length: 0,
            max_length: None,
        }
    }

    /// Minimum number of items, inclusive.
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = min;
        self
    }

    /// Maximum number of items, inclusive.
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Schema every item validates against.
    pub fn sub_elem(&self) -> &Element {
        &self.sub
    }

    /// Deep copy of the declared default items.
    pub fn defaults(&self) -> Vec<Value> {
        match &self.base.default {
            Value::Null => Vec::new(),
            Value::List(items) => items.to_vec(),
            other => vec![other.clone()],
        }
    }

    fn length_ok(&self, len: usize) -> bool {
        len >= self.min_length && self.max_length.map_or(true, |max| len <= max)
    }

    fn max_doc(&self) -> String {
        self.max_length
            .map_or_else(|| "inf".to_string(), |max| max.to_string())
    }

    pub(crate) fn finalize(&mut self, label: &str) -> ConfigResult<()> {
        if self.sub.is_derived() {
            return Err(ConfigError::InvalidSchema(format!(
                "list '{label}' cannot hold derived elements"
            )));
        }
        if let Some(max) = self.max_length {
            if max < self.min_length {
                return Err(ConfigError::InvalidSchema(format!(
                    "list '{label}' has max_length {max} below min_length {}",
                    self.min_length
                )));
            }
        }
        self.sub.finalize(Some(label))
    }
}

impl ConfigElement for ListElem {
    fn base(&self) -> &ElemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        &mut self.base
    }

    fn kind_name(&self) -> &'static str {
        "ListElem"
    }

    fn type_name(&self) -> &'static str {
        "list"
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        let raw: Vec<&Value> = match value {
            Value::Null => {
                let defaults = self.defaults();
                if self.base.required && !partial && defaults.is_empty() {
                    return Err(ConfigError::RequiredMissing {
                        elem: self.kind_name(),
                        name: self.base.label.clone(),
                    });
                }
                return Ok(Value::List(ValueList::implicit(defaults)));
            }
            Value::List(items) => items.iter().collect(),
            single => vec![single],
        };

        let mut values = raw
            .into_iter()
            .map(|item| self.sub.validate(item, partial))
            .collect::<ConfigResult<Vec<_>>>()?;

        if !self.length_ok(values.len()) {
            return Err(ConfigError::OutOfRange {
                elem: self.kind_name(),
                name: self.base.label.clone(),
                reason: format!(
                    "expected [{}-{}] list items, got {}",
                    self.min_length,
                    self.max_doc(),
                    values.len()
                ),
            });
        }

        for i in 0..values.len() {
            let item = values[i].clone();
            values[i] = post_validate(&self.sub, &Siblings::List(&values), item)?;
        }

        if self.base.required && !partial && values.is_empty() {
            return Err(ConfigError::RequiredMissing {
                elem: self.kind_name(),
                name: self.base.label.clone(),
            });
        }
        Ok(Value::List(ValueList::new(values)))
    }

    fn merge(&self, old: &Value, new: &Value) -> Value {
        merge_sequence(old, new)
    }

    fn choices_doc(&self) -> Option<String> {
        if self.min_length == 0 && self.max_length.is_none() {
            return None;
        }
        Some(format!(
            "May contain {} - {} items.",
            self.min_length,
            self.max_doc()
        ))
    }

    fn yaml_events(&self, value: Option<&Value>, opts: &DumpOptions) -> Vec<Event> {
        let mut events = vec![Event::SequenceStart];
        if opts.show_comments {
            events.push(Event::Comment(self.sub.make_comment(opts.show_choices, false)));
        }
        match value.and_then(Value::as_list) {
            Some(items) => {
                for item in items {
                    events.extend(self.sub.yaml_events(Some(item), opts));
                }
            }
            None => {
                let defaults = self.defaults();
                if defaults.is_empty() {
                    events.extend(self.sub.yaml_events(None, opts));
                }
                for item in &defaults {
                    events.extend(self.sub.yaml_events(Some(item), opts));
                }
            }
        }
        events.push(Event::SequenceEnd);
        events
    }
}

impl From<ListElem> for Element {
    fn from(elem: ListElem) -> Self {
        Element::List(elem)
    }
}

// ---------------------------------------------------------------------------
// CodeElem
// ---------------------------------------------------------------------------

/// Static analysis hook for a [`CodeElem`]. An `Err` rejects the block.
pub type Analyzer = Arc<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// A list of lines that validates to a single string.
///
/// Lines are joined with `\n`, surrounding whitespace is stripped, and
/// exactly one trailing newline is appended. Dumping splits the string back
/// into one list item per line.
#[derive(Clone)]
pub struct CodeElem {
    base: ElemBase,
    pub(crate) sub: Box<Element>,
    analyzer: Option<Analyzer>,
}

impl CodeElem {
    /// A named code block.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_base(ElemBase::named(name))
    }

    /// An unnamed code block, for use as a list or category item.
    pub fn anon() -> Self {
        Self::with_base(ElemBase::anon())
    }

    fn with_base(base: ElemBase) -> Self {
        Self {
            base,
            sub: Box::new(ScalarElem::anon(ScalarType::Str).into()),
            analyzer: None,
        }
    }

    /// Check each assembled block with `analyze`.
    pub fn analyzer<F>(mut self, analyze: F) -> Self
    where
        F: Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    {
        self.analyzer = Some(Arc::new(analyze));
        self
    }

    pub(crate) fn finalize(&mut self, label: &str) -> ConfigResult<()> {
        self.sub.finalize(Some(label))
    }

    fn lines(text: &str) -> Vec<Value> {
        text.trim_end_matches('\n').split('\n').map(Value::from).collect()
    }
}

impl ConfigElement for CodeElem {
    fn base(&self) -> &ElemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElemBase {
        &mut self.base
    }

    fn kind_name(&self) -> &'static str {
        "CodeElem"
    }

    fn type_name(&self) -> &'static str {
        "code block"
    }

    fn validate(&self, value: &Value, partial: bool) -> ConfigResult<Value> {
        let raw: Vec<&Value> = match value {
            Value::Null => return self.base.missing(self.kind_name(), partial),
            Value::List(items) => items.iter().filter(|line| !line.is_null()).collect(),
            single => vec![single],
        };

        let mut lines = Vec::with_capacity(raw.len());
        for line in raw {
            let line = self.sub.validate(line, partial)?;
            lines.push(line.as_str().unwrap_or_default().to_string());
        }

        let mut block = lines.join("\n").trim().to_string();
        block.push('\n');

        if let Some(analyze) = &self.analyzer {
            analyze(&block).map_err(|reason| ConfigError::OutOfRange {
                elem: self.kind_name(),
                name: self.base.label.clone(),
                reason,
            })?;
        }
        Ok(Value::Str(block))
    }

    fn merge(&self, old: &Value, new: &Value) -> Value {
        if new.is_null() {
            old.clone()
        } else {
            new.clone()
        }
    }

    fn yaml_events(&self, value: Option<&Value>, opts: &DumpOptions) -> Vec<Event> {
        let mut events = vec![Event::SequenceStart];
        if opts.show_comments {
            events.push(Event::Comment(self.sub.make_comment(opts.show_choices, false)));
        }
        let text = value
            .and_then(Value::as_str)
            .or_else(|| self.base.default.as_str());
        match text {
            Some(text) => {
                for line in Self::lines(text) {
                    events.extend(self.sub.yaml_events(Some(&line), opts));
                }
            }
            None => events.extend(self.sub.yaml_events(None, opts)),
        }
        events.push(Event::SequenceEnd);
        events
    }
}

impl fmt::Debug for CodeElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeElem")
            .field("base", &self.base)
            .field("analyzer", &self.analyzer.is_some())
            .finish_non_exhaustive()
    }
}

impl From<CodeElem> for Element {
    fn from(elem: CodeElem) -> Self {
        Element::Code(elem)
    }
}
