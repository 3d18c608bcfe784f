//! # Serialization Events
//!
//! Elements describe their output as a flat sequence of [`Event`]s, in the
//! style of a streaming YAML emitter: stream and document brackets, mapping
//! and sequence brackets, scalars, and comments. The block emitter in
//! [`crate::emit`] turns the sequence into text.
//!
//! Scalars carry their final text and a quoting style. A string is emitted
//! plain only when the YAML parser would read the plain text back as that
//! same string; anything else (`"5"`, `"true"`, `""`, `"a: b"`, text with
//! surrounding whitespace or newlines) is double-quoted.

use yc_core::{format_float, Value};

/// How a scalar is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalarStyle {
    /// Written as is.
    #[default]
    Plain,
    /// Written in double quotes with escapes.
    DoubleQuoted,
}

/// A scalar node. `value: None` is the null scalar, written as nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarEvent {
    /// Scalar text; `None` is null.
    pub value: Option<String>,
    /// Output style.
    pub style: ScalarStyle,
}

impl ScalarEvent {
    /// The null scalar.
    pub fn null() -> Self {
        Self {
            value: None,
            style: ScalarStyle::Plain,
        }
    }

    /// A scalar written without quotes.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            value: Some(text.into()),
            style: ScalarStyle::Plain,
        }
    }

    /// A string scalar, quoted only when the plain form would not read back
    /// as the same string.
    pub fn string(text: impl Into<String>) -> Self {
        let text = text.into();
        let style = if reads_back_plain(&text) {
            ScalarStyle::Plain
        } else {
            ScalarStyle::DoubleQuoted
        };
        Self {
            value: Some(text),
            style,
        }
    }

    /// Scalar event for a validated value. Collections are not scalars;
    /// they are rendered as quoted text if they end up here.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::null(),
            Value::Bool(b) => Self::plain(b.to_string()),
            Value::Int(i) => Self::plain(i.to_string()),
            Value::Float(f) => Self::plain(format_float(*f)),
            Value::Str(s) => Self::string(s.as_str()),
            Value::Path(p) => Self::string(p.to_string_lossy()),
            Value::List(_) | Value::Dict(_) => Self::string(value.to_string()),
        }
    }
}

fn reads_back_plain(text: &str) -> bool {
    if text.is_empty() || text.trim() != text || text.contains('\n') {
        return false;
    }
    matches!(
        serde_yaml::from_str::<serde_yaml::Value>(text),
        Ok(serde_yaml::Value::String(ref parsed)) if parsed == text
    )
}

/// One serialization event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start of the output stream.
    StreamStart,
    /// End of the output stream.
    StreamEnd,
    /// Start of a document.
    DocumentStart,
    /// End of a document.
    DocumentEnd,
    /// Start of a mapping; keys and values alternate until the end event.
    MappingStart,
    /// End of a mapping.
    MappingEnd,
    /// Start of a sequence.
    SequenceStart,
    /// End of a sequence.
    SequenceEnd,
    /// A scalar node.
    Scalar(ScalarEvent),
    /// A comment; may span several lines.
    Comment(String),
}
