//! # Root Schema
//!
//! [`YamlConfig`] is the top-level mapping of a configuration document. It
//! ties the element tree to the loading boundary and the emitter:
//!
//! - `load*` parses YAML text and validates it as a keyed mapping.
//! - `dump*` turns a validated mapping, or no mapping at all, into block
//!   YAML. Without values the output is a commented template showing every
//!   field's name, type, choices and default.
//!
//! A schema is built once and then shared by any number of `load`/`dump`
//! calls. Every call returns freshly owned values.
//!
//! ## Example
//!
//! ```
//! use yc_schema::prelude::*;
//!
//! let config = YamlConfig::new([
//!     ScalarElem::str("pet").default("squirrel").choices(["squirrel", "cat"]).into(),
//!     ScalarElem::int("quantity").required().into(),
//! ])
//! .unwrap();
//!
//! let values = config.load_str("quantity: 3\n").unwrap();
//! assert_eq!(values["pet"], Value::from("squirrel"));
//! assert_eq!(values["quantity"], Value::Int(3));
//! ```

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;
use yc_core::{ConfigDict, ConfigError, ConfigResult, KeyCase, Value};

use crate::element::{ElemOptions, Element, Siblings};
use crate::emit::{emit, emit_to_string, DumpOptions};
use crate::events::Event;
use crate::keyed::{KeyedElem, Resolve};
use crate::load::{parse_document, read_document};

/// A complete configuration document schema.
#[derive(Debug, Clone)]
pub struct YamlConfig {
    root: KeyedElem,
}

/// Collects root-level options before the schema is checked.
#[derive(Debug)]
pub struct YamlConfigBuilder {
    root: KeyedElem,
}

impl YamlConfigBuilder {
    /// Key-case policy for top-level keys.
    pub fn key_case(mut self, case: KeyCase) -> Self {
        self.root = self.root.key_case(case);
        self
    }

    /// Register the resolver of a top-level derived field.
    pub fn resolver<F>(mut self, name: impl Into<String>, resolve: F) -> Self
    where
        F: Fn(&ConfigDict) -> ConfigResult<Value> + Send + Sync + 'static,
    {
        self.root = self.root.resolver(name, resolve);
        self
    }

    /// Register a [`Resolve`] implementation for the derived field `name`.
    pub fn resolve_with(mut self, name: impl Into<String>, resolver: impl Resolve + 'static) -> Self {
        self.root = self.root.resolve_with(name, resolver);
        self
    }

    /// Register a post-validator for a top-level field.
    pub fn post_validator_for<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&Siblings<'_>, Value) -> ConfigResult<Value> + Send + Sync + 'static,
    {
        self.root = self.root.post_validator_for(name, hook);
        self
    }

    /// Help text for the root mapping.
    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.root = self.root.help(text);
        self
    }

    /// Check the whole element tree and produce the schema.
    pub fn build(self) -> ConfigResult<YamlConfig> {
        let mut root = self.root;
        root.finalize()?;
        debug!(fields = root.elements().count(), "built configuration schema");
        Ok(YamlConfig { root })
    }
}

impl YamlConfig {
    /// Start a schema with root-level options.
    pub fn builder(elements: impl IntoIterator<Item = Element>) -> YamlConfigBuilder {
        YamlConfigBuilder {
            root: KeyedElem::root(elements),
        }
    }

    /// Build a schema with default root options.
    pub fn new(elements: impl IntoIterator<Item = Element>) -> ConfigResult<Self> {
        Self::builder(elements).build()
    }

    /// The root mapping.
    pub fn root(&self) -> &KeyedElem {
        &self.root
    }

    /// The top-level fields in declaration order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.root.elements()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validate an already parsed document.
    pub fn validate(&self, value: &Value) -> ConfigResult<ConfigDict> {
        self.root.validate_mapping(value, false)
    }

    /// Validate without failing on missing required fields, for documents
    /// that will be merged with others before use.
    pub fn validate_partial(&self, value: &Value) -> ConfigResult<ConfigDict> {
        self.root.validate_mapping(value, true)
    }

    /// Layer `new` over `old` field by field.
    pub fn merge(&self, old: &ConfigDict, new: &ConfigDict) -> ConfigDict {
        self.root.merge_mappings(old, new)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Read, parse and validate a whole document from `reader`.
    pub fn load<R: Read>(&self, reader: R) -> ConfigResult<ConfigDict> {
        debug!("loading configuration from reader");
        let raw = read_document(reader)?;
        self.validate(&raw)
    }

    /// Parse and validate a document held in memory.
    pub fn load_str(&self, text: &str) -> ConfigResult<ConfigDict> {
        debug!(bytes = text.len(), "loading configuration");
        let raw = parse_document(text)?;
        self.validate(&raw)
    }

    /// Parse and validate the document stored at `path`.
    pub fn load_file(&self, path: impl AsRef<Path>) -> ConfigResult<ConfigDict> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading configuration file");
        let text = std::fs::read_to_string(path)?;
        self.load_str(&text)
    }

    // -----------------------------------------------------------------------
    // Dumping
    // -----------------------------------------------------------------------

    /// The complete event stream for one document. `None` gives the
    /// template form.
    pub fn yaml_events(&self, values: Option<&ConfigDict>, opts: &DumpOptions) -> Vec<Event> {
        let body = self.root.mapping_events(values, opts);
        let mut events = Vec::with_capacity(body.len() + 4);
        events.push(Event::StreamStart);
        events.push(Event::DocumentStart);
        events.extend(body);
        events.push(Event::DocumentEnd);
        events.push(Event::StreamEnd);
        events
    }

    /// Write `values`, or the template when `None`, to `out`.
    pub fn dump<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        values: Option<&ConfigDict>,
        opts: &DumpOptions,
    ) -> ConfigResult<()> {
        let events = self.yaml_events(values, opts);
        debug!(
            events = events.len(),
            template = values.is_none(),
            "dumping configuration"
        );
        emit(&events, writer, opts.indent)
    }

    /// Render `values`, or the template when `None`, as a string.
    pub fn dump_to_string(&self, values: Option<&ConfigDict>, opts: &DumpOptions) -> ConfigResult<String> {
        let events = self.yaml_events(values, opts);
        debug!(
            events = events.len(),
            template = values.is_none(),
            "dumping configuration"
        );
        emit_to_string(&events, opts.indent)
    }

    /// Write `values`, or the template when `None`, to the file at `path`.
    pub fn dump_file(
        &self,
        path: impl AsRef<Path>,
        values: Option<&ConfigDict>,
        opts: &DumpOptions,
    ) -> ConfigResult<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), "writing configuration file");
        let mut out = BufWriter::new(File::create(path)?);
        self.dump(&mut out, values, opts)?;
        out.flush()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Schema lookup
    // -----------------------------------------------------------------------

    /// Resolve a dotted path such as `cars.*.color` to a schema node.
    ///
    /// The root mapping is not an [`Element`], so an empty path fails with
    /// `NotFound`; use [`YamlConfig::root`] for the root itself. Below the
    /// root, an empty remainder resolves to the node reached so far.
    pub fn find(&self, path: &str) -> ConfigResult<&Element> {
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));
        let field = self.root.field(head).ok_or_else(|| not_found(path, head))?;
        field.find(rest)
    }

    /// Mutable form of [`YamlConfig::find`].
    pub fn find_mut(&mut self, path: &str) -> ConfigResult<&mut Element> {
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));
        let field = self
            .root
            .field_mut(head)
            .ok_or_else(|| not_found(path, head))?;
        field.find_mut(rest)
    }

    /// Override the default of the node at `path`.
    pub fn set_default(&mut self, path: &str, value: impl Into<Value>) -> ConfigResult<()> {
        self.find_mut(path)?.set_default("", value)
    }

    /// The documentation comment of the node at `path`.
    pub fn make_comment(&self, path: &str, show_choices: bool) -> ConfigResult<String> {
        Ok(self.find(path)?.make_comment(show_choices, true))
    }
}

fn not_found(path: &str, head: &str) -> ConfigError {
    ConfigError::NotFound {
        path: path.to_string(),
        reason: format!("the configuration has no field '{head}'"),
    }
}
