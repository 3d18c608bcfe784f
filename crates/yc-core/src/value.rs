//! # Validated Value Tree
//!
//! [`Value`] is both the input to validation (after the YAML parser hands
//! over a generic tree) and its output. A validated tree is owned by the
//! caller; schema elements never keep references into it.
//!
//! ## Field access
//!
//! Configuration field names are restricted to identifier-like strings, so
//! [`ConfigDict`] exposes them directly: `dict["pet"]`, `dict.get("pet")`,
//! or `dict.lookup("properties.legs")` for nested values. Missing keys index
//! to [`Value::Null`] instead of panicking.
//!
//! ## Implicit lists
//!
//! [`ValueList`] carries a marker that records whether the list was
//! explicitly supplied or substituted from schema defaults. Merging keeps an
//! existing list when the incoming one is implicit. Equality ignores the
//! marker.

use std::fmt;
use std::ops::{Deref, Index};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

static NULL: Value = Value::Null;

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent or explicitly null.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    Str(String),
    /// A filesystem path.
    Path(PathBuf),
    /// A list of values.
    List(ValueList),
    /// An ordered mapping.
    Dict(ConfigDict),
}

impl Value {
    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the runtime type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Path(_) => "Path",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    /// True for values that are neither lists nor mappings.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Dict(_))
    }

    /// The boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The path, if this is a `Path` or a `Str`.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            Value::Str(s) => Some(Path::new(s)),
            _ => None,
        }
    }

    /// The list, if this is a `List`.
    pub fn as_list(&self) -> Option<&ValueList> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// The mapping, if this is a `Dict`.
    pub fn as_dict(&self) -> Option<&ConfigDict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Mutable mapping, if this is a `Dict`.
    pub fn as_dict_mut(&mut self) -> Option<&mut ConfigDict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Look up a key when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Resolve a dotted path (`properties.legs`, `cars.0.color`) against
    /// this value. List positions are given as decimal indices.
    pub fn lookup(&self, dotted: &str) -> Option<&Value> {
        if dotted.is_empty() {
            return Some(self);
        }
        let mut current = self;
        for part in dotted.split('.') {
            current = match current {
                Value::Dict(d) => d.get(part)?,
                Value::List(l) => l.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Render a float so that it reads back as a float: shortest round-trip
/// digits, a trailing `.0` for integral values, and the YAML spellings for
/// non-finite values.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { ".inf" } else { "-.inf" }.to_string()
    } else {
        format!("{f:?}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, item) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Dict(d) => write!(f, "{d}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Path(p) => serializer.serialize_str(&p.to_string_lossy()),
            Value::List(l) => l.serialize(serializer),
            Value::Dict(d) => d.serialize(serializer),
        }
    }
}

impl Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        self.as_list().and_then(|l| l.get(idx)).unwrap_or(&NULL)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Value::Path(value)
    }
}

impl<'a> From<&'a Path> for Value {
    fn from(value: &'a Path) -> Self {
        Value::Path(value.to_path_buf())
    }
}

impl From<ValueList> for Value {
    fn from(value: ValueList) -> Self {
        Value::List(value)
    }
}

impl From<ConfigDict> for Value {
    fn from(value: ConfigDict) -> Self {
        Value::Dict(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Dict(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// ValueList
// ---------------------------------------------------------------------------

/// An ordered list of values, tagged with whether it was explicitly given.
#[derive(Debug, Clone, Default)]
pub struct ValueList {
    items: Vec<Value>,
    implicit: bool,
}

impl ValueList {
    /// An explicitly supplied list.
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items,
            implicit: false,
        }
    }

    /// A list substituted because no value was supplied.
    pub fn implicit(items: Vec<Value>) -> Self {
        Self {
            items,
            implicit: true,
        }
    }

    /// Whether this list came from defaults rather than input.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// Append an item.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    /// The items as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// Consume the list into its items.
    pub fn into_vec(self) -> Vec<Value> {
        self.items
    }
}

impl PartialEq for ValueList {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Deref for ValueList {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.items
    }
}

impl FromIterator<Value> for ValueList {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for ValueList {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValueList {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for ValueList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// ConfigDict
// ---------------------------------------------------------------------------

/// Insertion-ordered mapping from field name to value.
///
/// Order is the schema's declaration order for keyed elements and input
/// order for categories; it drives serialization order. Equality is
/// order-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDict(IndexMap<String, Value>);

impl ConfigDict {
    /// An empty dict.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// An empty dict with room for `n` entries.
    pub fn with_capacity(n: usize) -> Self {
        Self(IndexMap::with_capacity(n))
    }

    /// Entry for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Mutable entry for `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Insert or replace a field, keeping the original position of an
    /// existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a field, preserving the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve a dotted path relative to this mapping.
    pub fn lookup(&self, dotted: &str) -> Option<&Value> {
        let (head, rest) = match dotted.split_once('.') {
            Some((head, rest)) => (head, rest),
            None => (dotted, ""),
        };
        self.get(head)?.lookup(rest)
    }
}

impl Index<&str> for ConfigDict {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConfigDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for ConfigDict {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ConfigDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

impl Serialize for ConfigDict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigDict {
        let props: ConfigDict = [("legs", Value::Int(4))].into_iter().collect();
        [
            ("pet", Value::from("cat")),
            ("names", Value::from(vec!["Tom", "Felix"])),
            ("properties", Value::Dict(props)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_index_missing_key_is_null() {
        let d = sample();
        assert_eq!(d["pet"], Value::from("cat"));
        assert!(d["nope"].is_null());
        assert!(d["pet"]["deeper"].is_null());
    }

    #[test]
    fn test_dotted_lookup() {
        let d = sample();
        assert_eq!(d.lookup("properties.legs"), Some(&Value::Int(4)));
        assert_eq!(d.lookup("names.1"), Some(&Value::from("Felix")));
        assert_eq!(d.lookup("names.7"), None);
        assert_eq!(d.lookup("pet.color"), None);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut d = ConfigDict::new();
        d.insert("zeta", 1);
        d.insert("alpha", 2);
        d.insert("zeta", 3);
        let keys: Vec<&str> = d.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(d["zeta"], Value::Int(3));
    }

    #[test]
    fn test_implicit_marker_ignored_by_eq() {
        let a = ValueList::implicit(vec![Value::Int(1)]);
        let b = ValueList::new(vec![Value::Int(1)]);
        assert!(a.is_implicit());
        assert!(!b.is_implicit());
        assert_eq!(a, b);
    }

    #[test]
    fn test_format_float_keeps_float_shape() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(f64::INFINITY), ".inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-.inf");
        assert_eq!(format_float(f64::NAN), ".nan");
    }

    #[test]
    fn test_display() {
        let d = sample();
        assert_eq!(
            Value::Dict(d).to_string(),
            "{pet: cat, names: [Tom, Felix], properties: {legs: 4}}"
        );
    }

    #[test]
    fn test_serialize_to_json() {
        let mut d = sample();
        d.insert("home", PathBuf::from("/tmp/cat"));
        d.insert("owner", Value::Null);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["pet"], "cat");
        assert_eq!(json["names"][1], "Felix");
        assert_eq!(json["properties"]["legs"], 4);
        assert_eq!(json["home"], "/tmp/cat");
        assert!(json["owner"].is_null());
    }
}
