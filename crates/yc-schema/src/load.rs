//! # Loading Boundary
//!
//! Parses YAML text into the generic [`Value`] tree that elements validate.
//! `serde_yaml` does the parsing; this module only maps its tree onto ours.
//!
//! - Integers that fit `i64` become `Int`; every other number is a `Float`.
//! - Mapping keys must be strings, numbers or booleans and are stringified.
//! - Tagged values are rejected: documents are plain scalars, sequences and
//!   mappings only.
//! - Duplicate mapping keys are rejected by the parser.
//! - A document with no content is `Value::Null`.

use std::io::Read;

use yc_core::{ConfigDict, ConfigError, ConfigResult, Value, ValueList};

/// Parse a YAML document into a [`Value`].
pub fn parse_document(text: &str) -> ConfigResult<Value> {
    if is_blank(text) {
        return Ok(Value::Null);
    }
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    yaml_to_value(&yaml)
}

/// Read a whole stream and parse it with [`parse_document`].
pub fn read_document<R: Read>(mut reader: R) -> ConfigResult<Value> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_document(&text)
}

fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

fn yaml_to_value(yaml: &serde_yaml::Value) -> ConfigResult<Value> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(ConfigError::Parse(format!("unsupported YAML number: {n}")))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::Str(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: ConfigResult<Vec<Value>> = seq.iter().map(yaml_to_value).collect();
            Ok(Value::List(ValueList::new(items?)))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut dict = ConfigDict::with_capacity(map.len());
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(ConfigError::Parse(format!(
                            "unsupported YAML map key type: {other:?}"
                        )))
                    }
                };
                dict.insert(key, yaml_to_value(v)?);
            }
            Ok(Value::Dict(dict))
        }
        serde_yaml::Value::Tagged(tagged) => Err(ConfigError::Parse(format!(
            "tagged values are not supported (found tag {})",
            tagged.tag
        ))),
    }
}
