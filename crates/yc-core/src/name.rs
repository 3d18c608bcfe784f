//! # Element Names and Key Case
//!
//! Element names double as mapping keys in the YAML document, so they are
//! restricted to identifier-like strings: a leading ASCII letter followed by
//! any number of letters, digits or underscores. Declared names must also be
//! lowercase; keys found in input documents are normalized according to the
//! owning container's [`KeyCase`] before they are compared.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Pattern every element name and mapping key must match.
pub const NAME_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9_]*$";

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NAME_PATTERN).expect("NAME_PATTERN is a valid regex"))
}

/// True when `key` matches [`NAME_PATTERN`].
pub fn is_valid_key(key: &str) -> bool {
    name_regex().is_match(key)
}

/// Check a declared element name.
pub fn validate_name(name: &str) -> ConfigResult<()> {
    if !is_valid_key(name) {
        return Err(ConfigError::InvalidSchema(format!(
            "invalid element name '{name}': names must match '{NAME_PATTERN}'"
        )));
    }
    if name.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ConfigError::InvalidSchema(format!(
            "invalid element name '{name}': names must be lowercase"
        )));
    }
    Ok(())
}

/// How a container folds the case of keys given in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCase {
    /// Fold keys to lowercase.
    #[default]
    Lower,
    /// Fold keys to uppercase.
    Upper,
    /// Match keys exactly as given.
    Mixed,
}

impl KeyCase {
    /// Apply this policy to `key`.
    pub fn normalize(self, key: &str) -> String {
        match self {
            Self::Lower => key.to_lowercase(),
            Self::Upper => key.to_uppercase(),
            Self::Mixed => key.to_string(),
        }
    }

    /// Policy name as written in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Mixed => "mixed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_valid_names() {
        for name in ["pet", "quantity", "behavior_code", "a1", "x_", "a"] {
            assert!(validate_name(name).is_ok(), "{name} should be accepted");
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "1abc", "_hidden", "has-dash", "has space", "Pet"] {
            let err = validate_name(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidSchema, "{name}");
        }
    }

    #[test]
    fn test_keys_may_be_mixed_case() {
        assert!(is_valid_key("Pet"));
        assert!(!is_valid_key("_"));
    }

    #[test]
    fn test_single_letter_keys() {
        assert!(is_valid_key("a"));
        assert!(is_valid_key("B"));
        assert!(!is_valid_key("9"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(KeyCase::Lower.normalize("MixedKey"), "mixedkey");
        assert_eq!(KeyCase::Upper.normalize("MixedKey"), "MIXEDKEY");
        assert_eq!(KeyCase::Mixed.normalize("MixedKey"), "MixedKey");
    }

    #[test]
    fn test_key_case_serde() {
        let parsed: KeyCase = serde_json::from_str("\"upper\"").unwrap();
        assert_eq!(parsed, KeyCase::Upper);
        assert_eq!(serde_json::to_string(&KeyCase::Mixed).unwrap(), "\"mixed\"");
    }
}
