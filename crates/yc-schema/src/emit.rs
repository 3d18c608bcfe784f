//! # Block Emitter
//!
//! Renders an [`Event`] sequence as block-style YAML. Comment events are
//! the reason this exists: generated configuration files document every
//! field inline, and no emitter in the serde ecosystem accepts comments.
//!
//! ## Layout
//!
//! - Nested collections start on the line after their key or `-`, indented
//!   by [`DumpOptions::indent`] spaces.
//! - Comments are written as `# text`, one line per comment line, at the
//!   indentation of the entries they precede.
//! - Null scalars are written as nothing (`key:` or `-`).
//! - Empty collections are written in flow style, `{}` or `[]`.
//!
//! Double-quoted scalars are escaped with `serde_json`. Code points JSON
//! passes through but YAML cannot carry raw (DEL, the C1 controls, the
//! Unicode line separators, BOM and the U+FFFE/U+FFFF noncharacters) are
//! then rewritten as `\xNN` or `\uNNNN` escapes.

use std::io::Write;

use serde::{Deserialize, Serialize};
use yc_core::{ConfigError, ConfigResult};

use crate::events::{Event, ScalarEvent, ScalarStyle};

/// Output options for dumping a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpOptions {
    /// Precede every field with its documentation comment.
    pub show_comments: bool,
    /// Include choices, ranges and lengths in the comments.
    pub show_choices: bool,
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            show_comments: true,
            show_choices: true,
            indent: 2,
        }
    }
}

impl DumpOptions {
    /// Data only: no comments.
    pub fn bare() -> Self {
        Self {
            show_comments: false,
            ..Self::default()
        }
    }
}

/// Write `events` to `writer` as block YAML.
pub fn emit<W: Write + ?Sized>(events: &[Event], writer: &mut W, indent: usize) -> ConfigResult<()> {
    let text = emit_to_string(events, indent)?;
    writer.write_all(text.as_bytes())?;
    Ok(())
}

/// Render `events` as block YAML.
pub fn emit_to_string(events: &[Event], indent: usize) -> ConfigResult<String> {
    let documents = Parser {
        events: events.iter(),
    }
    .stream()?;
    let mut renderer = Renderer {
        step: indent.max(1),
        out: String::new(),
    };
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            renderer.out.push_str("---\n");
        }
        renderer.document(doc)?;
    }
    Ok(renderer.out)
}

fn malformed(msg: impl Into<String>) -> ConfigError {
    ConfigError::Emit(msg.into())
}

fn unexpected(event: &Event, wanted: &str) -> ConfigError {
    malformed(format!("expected {wanted}, got {event:?}"))
}

// ---------------------------------------------------------------------------
// Event stream -> node tree
// ---------------------------------------------------------------------------

enum Node {
    Scalar(ScalarEvent),
    Mapping(Vec<Item>),
    Sequence(Vec<Item>),
}

enum Item {
    Comment(String),
    /// Mapping entries carry a key; sequence entries do not.
    Entry(Option<ScalarEvent>, Node),
}

struct Document {
    leading: Vec<String>,
    root: Option<Node>,
    trailing: Vec<String>,
}

struct Parser<'e> {
    events: std::slice::Iter<'e, Event>,
}

impl<'e> Parser<'e> {
    fn next(&mut self) -> ConfigResult<&'e Event> {
        self.events
            .next()
            .ok_or_else(|| malformed("unexpected end of event stream"))
    }

    fn stream(&mut self) -> ConfigResult<Vec<Document>> {
        match self.next()? {
            Event::StreamStart => {}
            other => return Err(unexpected(other, "stream start")),
        }
        let mut documents = Vec::new();
        loop {
            match self.next()? {
                Event::DocumentStart => documents.push(self.document()?),
                Event::StreamEnd => break,
                other => return Err(unexpected(other, "document start or stream end")),
            }
        }
        if let Some(extra) = self.events.next() {
            return Err(unexpected(extra, "nothing after stream end"));
        }
        Ok(documents)
    }

    fn document(&mut self) -> ConfigResult<Document> {
        let mut doc = Document {
            leading: Vec::new(),
            root: None,
            trailing: Vec::new(),
        };
        loop {
            match self.next()? {
                Event::DocumentEnd => return Ok(doc),
                Event::Comment(text) if doc.root.is_none() => doc.leading.push(text.clone()),
                Event::Comment(text) => doc.trailing.push(text.clone()),
                event if doc.root.is_none() => doc.root = Some(self.node(event)?),
                other => return Err(unexpected(other, "document end")),
            }
        }
    }

    fn node(&mut self, first: &'e Event) -> ConfigResult<Node> {
        match first {
            Event::Scalar(scalar) => Ok(Node::Scalar(scalar.clone())),
            Event::MappingStart => self.mapping(),
            Event::SequenceStart => self.sequence(),
            other => Err(unexpected(other, "a scalar, mapping or sequence")),
        }
    }

    fn mapping(&mut self) -> ConfigResult<Node> {
        let mut items = Vec::new();
        loop {
            match self.next()? {
                Event::MappingEnd => return Ok(Node::Mapping(items)),
                Event::Comment(text) => items.push(Item::Comment(text.clone())),
                Event::Scalar(key) => {
                    let first = self.next()?;
                    let value = self.node(first)?;
                    items.push(Item::Entry(Some(key.clone()), value));
                }
                other => return Err(unexpected(other, "a scalar mapping key")),
            }
        }
    }

    fn sequence(&mut self) -> ConfigResult<Node> {
        let mut items = Vec::new();
        loop {
            match self.next()? {
                Event::SequenceEnd => return Ok(Node::Sequence(items)),
                Event::Comment(text) => items.push(Item::Comment(text.clone())),
                event => {
                    let value = self.node(event)?;
                    items.push(Item::Entry(None, value));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Node tree -> text
// ---------------------------------------------------------------------------

struct Renderer {
    step: usize,
    out: String,
}

impl Renderer {
    fn pad(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat(' ').take(indent));
    }

    fn comment(&mut self, text: &str, indent: usize) {
        for line in text.lines() {
            self.pad(indent);
            let line = line.trim_end();
            if line.is_empty() {
                self.out.push('#');
            } else {
                self.out.push_str("# ");
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
    }

    fn scalar_text(scalar: &ScalarEvent) -> ConfigResult<Option<String>> {
        match (&scalar.value, scalar.style) {
            (None, _) => Ok(None),
            (Some(text), ScalarStyle::Plain) => Ok(Some(text.clone())),
            (Some(text), ScalarStyle::DoubleQuoted) => serde_json::to_string(text)
                .map(|quoted| Some(escape_non_printable(quoted)))
                .map_err(|e| malformed(format!("cannot quote scalar: {e}"))),
        }
    }

    fn document(&mut self, doc: &Document) -> ConfigResult<()> {
        for text in &doc.leading {
            self.comment(text, 0);
        }
        match &doc.root {
            None => {}
            Some(Node::Scalar(scalar)) => {
                if let Some(text) = Self::scalar_text(scalar)? {
                    self.out.push_str(&text);
                    self.out.push('\n');
                }
            }
            Some(node @ (Node::Mapping(items) | Node::Sequence(items))) => {
                if has_entries(items) {
                    self.block(node, 0)?;
                } else {
                    for item in items {
                        if let Item::Comment(text) = item {
                            self.comment(text, 0);
                        }
                    }
                    self.out.push_str(empty_flow(node));
                    self.out.push('\n');
                }
            }
        }
        for text in &doc.trailing {
            self.comment(text, 0);
        }
        Ok(())
    }

    /// Write the entries of a collection, each line indented by `indent`.
    fn block(&mut self, node: &Node, indent: usize) -> ConfigResult<()> {
        let items = match node {
            Node::Mapping(items) | Node::Sequence(items) => items,
            Node::Scalar(_) => return Err(malformed("scalar given where a collection was expected")),
        };
        for item in items {
            match item {
                Item::Comment(text) => self.comment(text, indent),
                Item::Entry(Some(key), value) => {
                    let key = Self::scalar_text(key)?
                        .ok_or_else(|| malformed("null mapping key"))?;
                    self.pad(indent);
                    self.out.push_str(&key);
                    self.out.push(':');
                    self.value(value, indent)?;
                }
                Item::Entry(None, value) => {
                    self.pad(indent);
                    self.out.push('-');
                    self.value(value, indent)?;
                }
            }
        }
        Ok(())
    }

    /// Write what follows a `key:` or `-` indicator on a line indented by
    /// `indent`, including the line break.
    fn value(&mut self, node: &Node, indent: usize) -> ConfigResult<()> {
        match node {
            Node::Scalar(scalar) => {
                if let Some(text) = Self::scalar_text(scalar)? {
                    self.out.push(' ');
                    self.out.push_str(&text);
                }
                self.out.push('\n');
            }
            Node::Mapping(items) | Node::Sequence(items) => {
                let child = indent + self.step;
                if has_entries(items) {
                    self.out.push('\n');
                    self.block(node, child)?;
                } else if items.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(empty_flow(node));
                    self.out.push('\n');
                } else {
                    self.out.push('\n');
                    for item in items {
                        if let Item::Comment(text) = item {
                            self.comment(text, child);
                        }
                    }
                    self.pad(child);
                    self.out.push_str(empty_flow(node));
                    self.out.push('\n');
                }
            }
        }
        Ok(())
    }
}

/// Characters that JSON leaves raw but a YAML parser rejects or reads as a
/// line break inside a double-quoted scalar.
fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '\u{7f}'..='\u{9f}' | '\u{2028}' | '\u{2029}' | '\u{feff}' | '\u{fffe}' | '\u{ffff}'
    )
}

fn escape_non_printable(quoted: String) -> String {
    if !quoted.chars().any(needs_escape) {
        return quoted;
    }
    let mut out = String::with_capacity(quoted.len() + 8);
    for c in quoted.chars() {
        let code = u32::from(c);
        if !needs_escape(c) {
            out.push(c);
        } else if code <= 0xff {
            out.push_str(&format!("\\x{code:02x}"));
        } else {
            out.push_str(&format!("\\u{code:04x}"));
        }
    }
    out
}

fn has_entries(items: &[Item]) -> bool {
    items.iter().any(|item| matches!(item, Item::Entry(..)))
}

fn empty_flow(node: &Node) -> &'static str {
    match node {
        Node::Sequence(_) => "[]",
        _ => "{}",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> Event {
        Event::Scalar(ScalarEvent::string(k))
    }

    fn wrap(body: Vec<Event>) -> Vec<Event> {
        let mut events = vec![Event::StreamStart, Event::DocumentStart];
        events.extend(body);
        events.extend([Event::DocumentEnd, Event::StreamEnd]);
        events
    }

    #[test]
    fn test_nested_block_layout() {
        let events = wrap(vec![
            Event::MappingStart,
            Event::Comment("PET(required str): The kind of pet.\nChoices: cat, dog".into()),
            key("pet"),
            Event::Scalar(ScalarEvent::string("cat")),
            key("names"),
            Event::SequenceStart,
            Event::Comment("(str)".into()),
            Event::Scalar(ScalarEvent::string("Tom")),
            Event::Scalar(ScalarEvent::string("5")),
            Event::SequenceEnd,
            key("properties"),
            Event::MappingStart,
            key("legs"),
            Event::Scalar(ScalarEvent::plain("4")),
            key("description"),
            Event::Scalar(ScalarEvent::null()),
            Event::MappingEnd,
            Event::MappingEnd,
        ]);
        let text = emit_to_string(&events, 2).unwrap();
        assert_eq!(
            text,
            "# PET(required str): The kind of pet.\n\
             # Choices: cat, dog\n\
             pet: cat\n\
             names:\n  \
               # (str)\n  \
               - Tom\n  \
               - \"5\"\n\
             properties:\n  \
               legs: 4\n  \
               description:\n"
        );
    }

    #[test]
    fn test_empty_collections() {
        let events = wrap(vec![
            Event::MappingStart,
            key("tags"),
            Event::SequenceStart,
            Event::SequenceEnd,
            key("extra"),
            Event::MappingStart,
            Event::Comment("(int)".into()),
            Event::MappingEnd,
            Event::MappingEnd,
        ]);
        let text = emit_to_string(&events, 2).unwrap();
        assert_eq!(text, "tags: []\nextra:\n  # (int)\n  {}\n");
        let parsed: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert!(parsed["tags"].as_sequence().unwrap().is_empty());
        assert!(parsed["extra"].as_mapping().unwrap().is_empty());
    }

    #[test]
    fn test_sequence_of_mappings_parses_back() {
        let events = wrap(vec![
            Event::SequenceStart,
            Event::MappingStart,
            key("color"),
            Event::Scalar(ScalarEvent::string("red: ish")),
            Event::MappingEnd,
            Event::SequenceStart,
            Event::Scalar(ScalarEvent::plain("1")),
            Event::SequenceEnd,
            Event::SequenceEnd,
        ]);
        let text = emit_to_string(&events, 4).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed[0]["color"].as_str(), Some("red: ish"));
        assert_eq!(parsed[1][0].as_i64(), Some(1));
    }

    #[test]
    fn test_control_characters_are_escaped() {
        for text in ["del\u{7f}x", "c1\u{90}x", "nel\u{85}x", "ls\u{2028}x", "tab\tx", "end\u{ffff}"] {
            let events = wrap(vec![
                Event::MappingStart,
                key("note"),
                Event::Scalar(ScalarEvent::string(text)),
                Event::MappingEnd,
            ]);
            let dumped = emit_to_string(&events, 2).unwrap();
            let parsed: serde_yaml::Value = serde_yaml::from_str(&dumped).unwrap();
            assert_eq!(parsed["note"].as_str(), Some(text), "{dumped}");
        }
        assert_eq!(escape_non_printable("\"a\u{7f}\u{9f}\"".into()), "\"a\\x7f\\x9f\"");
        assert_eq!(escape_non_printable("\"\u{fffe}\"".into()), "\"\\ufffe\"");
    }

    #[test]
    fn test_malformed_streams() {
        let unterminated = vec![Event::StreamStart, Event::DocumentStart, Event::MappingStart];
        assert!(matches!(
            emit_to_string(&unterminated, 2),
            Err(ConfigError::Emit(_))
        ));

        let bad_key = wrap(vec![
            Event::MappingStart,
            Event::SequenceStart,
            Event::SequenceEnd,
            Event::MappingEnd,
        ]);
        assert!(matches!(emit_to_string(&bad_key, 2), Err(ConfigError::Emit(_))));

        assert!(matches!(
            emit_to_string(&[Event::DocumentStart], 2),
            Err(ConfigError::Emit(_))
        ));
    }

    #[test]
    fn test_dump_options_serde_defaults() {
        let opts: DumpOptions = serde_json::from_str(r#"{"show_choices": false}"#).unwrap();
        assert!(opts.show_comments);
        assert!(!opts.show_choices);
        assert_eq!(opts.indent, 2);
    }
}
