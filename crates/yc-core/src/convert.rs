//! # Scalar Type Conversion
//!
//! Maps a raw parsed scalar onto one of the primitive target types an
//! element can declare. Conversion is only attempted when the raw value's
//! runtime type differs from the target; a matching value passes through
//! untouched.
//!
//! Lists and mappings never convert to a scalar type. In particular they
//! are not stringified: a mapping given where a string is expected is a
//! `TypeConversion` error, not the mapping's text form.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::value::{format_float, Value};

/// Primitive target type of a scalar element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Str,
    /// Filesystem path.
    Path,
}

impl ScalarType {
    /// Name used in generated comments.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Path => "Path",
        }
    }

    /// True when `value` is already of this type.
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Int, Value::Int(_))
                | (Self::Float, Value::Float(_))
                | (Self::Bool, Value::Bool(_))
                | (Self::Str, Value::Str(_))
                | (Self::Path, Value::Path(_))
        )
    }

    /// Convert `value` to this type, or `None` when no rule applies.
    pub fn convert(self, value: &Value) -> Option<Value> {
        if self.matches(value) {
            return Some(value.clone());
        }
        match (self, value) {
            (Self::Int, Value::Float(f)) => float_to_int(*f).map(Value::Int),
            (Self::Int, Value::Str(s)) => s.trim().parse::<i64>().ok().map(Value::Int),

            (Self::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
            (Self::Float, Value::Str(s)) => parse_float(s.trim()).map(Value::Float),

            (Self::Bool, Value::Str(s)) => parse_bool(s.trim()).map(Value::Bool),
            (Self::Bool, Value::Int(0)) => Some(Value::Bool(false)),
            (Self::Bool, Value::Int(1)) => Some(Value::Bool(true)),

            (Self::Str, Value::Bool(b)) => Some(Value::Str(b.to_string())),
            (Self::Str, Value::Int(i)) => Some(Value::Str(i.to_string())),
            (Self::Str, Value::Float(f)) => Some(Value::Str(format_float(*f))),
            (Self::Str, Value::Path(p)) => Some(Value::Str(p.to_string_lossy().into_owned())),

            (Self::Path, Value::Str(s)) => Some(Value::Path(PathBuf::from(s))),

            _ => None,
        }
    }

    /// Like [`convert`](Self::convert), but reports failure as a
    /// `TypeConversion` error attributed to the named element.
    pub fn coerce(self, value: &Value, elem: &'static str, name: &str) -> ConfigResult<Value> {
        self.convert(value).ok_or_else(|| ConfigError::TypeConversion {
            elem,
            name: name.to_string(),
            expected: self.as_str().to_string(),
            value: value.to_string(),
        })
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range.
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_float(s: &str) -> Option<f64> {
    match s.to_ascii_lowercase().as_str() {
        ".inf" | "+.inf" => Some(f64::INFINITY),
        "-.inf" => Some(f64::NEG_INFINITY),
        ".nan" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::ConfigDict;
    use proptest::prelude::*;

    #[test]
    fn test_matching_type_passes_through() {
        let v = Value::from("cat");
        assert_eq!(ScalarType::Str.convert(&v), Some(v.clone()));
        assert_eq!(ScalarType::Int.convert(&Value::Int(3)), Some(Value::Int(3)));
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(ScalarType::Int.convert(&Value::from(" 42 ")), Some(Value::Int(42)));
        assert_eq!(ScalarType::Int.convert(&Value::Float(4.0)), Some(Value::Int(4)));
        assert_eq!(ScalarType::Int.convert(&Value::Float(4.5)), None);
        assert_eq!(ScalarType::Int.convert(&Value::from("four")), None);
        assert_eq!(ScalarType::Int.convert(&Value::Bool(true)), None);
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(ScalarType::Float.convert(&Value::Int(2)), Some(Value::Float(2.0)));
        assert_eq!(ScalarType::Float.convert(&Value::from("0.25")), Some(Value::Float(0.25)));
        assert_eq!(
            ScalarType::Float.convert(&Value::from("-.inf")),
            Some(Value::Float(f64::NEG_INFINITY))
        );
        assert!(matches!(
            ScalarType::Float.convert(&Value::from(".nan")),
            Some(Value::Float(f)) if f.is_nan()
        ));
        assert_eq!(ScalarType::Float.convert(&Value::from("half")), None);
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(ScalarType::Bool.convert(&Value::from("Yes")), Some(Value::Bool(true)));
        assert_eq!(ScalarType::Bool.convert(&Value::from("off")), Some(Value::Bool(false)));
        assert_eq!(ScalarType::Bool.convert(&Value::Int(1)), Some(Value::Bool(true)));
        assert_eq!(ScalarType::Bool.convert(&Value::Int(2)), None);
        assert_eq!(ScalarType::Bool.convert(&Value::from("maybe")), None);
    }

    #[test]
    fn test_only_scalars_become_strings() {
        assert_eq!(ScalarType::Str.convert(&Value::Int(5)), Some(Value::from("5")));
        assert_eq!(ScalarType::Str.convert(&Value::Float(1.0)), Some(Value::from("1.0")));
        assert_eq!(ScalarType::Str.convert(&Value::Bool(false)), Some(Value::from("false")));

        let dict: ConfigDict = [("a", 1)].into_iter().collect();
        assert_eq!(ScalarType::Str.convert(&Value::Dict(dict)), None);
        assert_eq!(ScalarType::Str.convert(&Value::from(vec!["a"])), None);
    }

    #[test]
    fn test_path_from_str() {
        assert_eq!(
            ScalarType::Path.convert(&Value::from("/etc/passwd")),
            Some(Value::Path(PathBuf::from("/etc/passwd")))
        );
        assert_eq!(ScalarType::Path.convert(&Value::Int(1)), None);
    }

    #[test]
    fn test_coerce_reports_type_conversion() {
        let err = ScalarType::Int
            .coerce(&Value::from("lots"), "IntElem", "quantity")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConversion);
        assert!(err.to_string().contains("quantity"));
        assert!(err.to_string().contains("int"));
    }

    proptest! {
        #[test]
        fn prop_int_string_round_trip(n in any::<i64>()) {
            let s = ScalarType::Str.convert(&Value::Int(n)).unwrap();
            prop_assert_eq!(ScalarType::Int.convert(&s), Some(Value::Int(n)));
        }

        #[test]
        fn prop_finite_float_string_round_trip(f in -1.0e12f64..1.0e12) {
            let s = ScalarType::Str.convert(&Value::Float(f)).unwrap();
            prop_assert_eq!(ScalarType::Float.convert(&s), Some(Value::Float(f)));
        }
    }
}
