//! # Error Types — Structured Error Hierarchy
//!
//! Defines the single error type used by every schema element. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Schema authoring mistakes (`InvalidSchema`) are raised while the schema
//!   is being built, never while data is validated.
//! - Data validation errors carry the element kind and name so a failure
//!   deep in a nested document still says where it happened.
//! - Errors propagate unchanged up the recursive validation chain. The only
//!   wrapping is `PostValidation`, which adds the offending element and
//!   value around a hook failure.

use thiserror::Error;

/// Result type for configuration schema operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Classification of a [`ConfigError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The schema itself is malformed.
    InvalidSchema,
    /// A required value is missing and has no default.
    RequiredMissing,
    /// A raw value cannot be converted to the declared type.
    TypeConversion,
    /// A value fails a choice, range, regex, or length constraint.
    OutOfRange,
    /// A mapping key (or dotted path segment) is not declared.
    UnknownKey,
    /// Two mapping keys collapse to the same key under case folding.
    DuplicateKey,
    /// A mapping key does not match the name pattern.
    InvalidKey,
    /// An operation is not supported by the target element.
    Unsupported,
    /// The YAML document is malformed.
    Parse,
    /// The serialization event stream is malformed.
    Emit,
    /// Reading or writing a stream failed.
    Io,
}

/// Top-level error type for configuration loading, validation and dumping.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Schema authoring mistake: bad name, missing resolver, hidden and
    /// required without a default, or an unusable sub-element.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A required value is missing and there is no default.
    #[error("config missing required value for {elem} named '{name}'")]
    RequiredMissing {
        /// Element kind (e.g. `StrElem`).
        elem: &'static str,
        /// Element name.
        name: String,
    },

    /// The raw value cannot be converted to the element's type.
    #[error("incorrect type for {elem} field '{name}': cannot convert {value} to {expected}")]
    TypeConversion {
        /// Element kind.
        elem: &'static str,
        /// Element name.
        name: String,
        /// Target type name.
        expected: String,
        /// Rendering of the offending value.
        value: String,
    },

    /// The value is outside the allowed choices, range, pattern or length.
    #[error("invalid value for {elem} called '{name}': {reason}")]
    OutOfRange {
        /// Element kind.
        elem: &'static str,
        /// Element name.
        name: String,
        /// Which constraint was violated.
        reason: String,
    },

    /// A mapping contains a key that is not part of the schema.
    #[error("invalid config key '{key}' given under {elem} called '{name}'")]
    UnknownKey {
        /// Element kind.
        elem: &'static str,
        /// Element name.
        name: String,
        /// The undeclared key.
        key: String,
    },

    /// Several keys collapse to the same key under the key-case policy.
    #[error("duplicate keys {keys:?} in {elem} called '{name}' (keys are converted to {case} case)")]
    DuplicateKey {
        /// Element kind.
        elem: &'static str,
        /// Element name.
        name: String,
        /// The colliding keys as given.
        keys: Vec<String>,
        /// The key-case policy in effect.
        case: String,
    },

    /// A mapping key does not match the name pattern.
    #[error("invalid key '{key}' in {elem} called '{name}': keys must match '{pattern}'")]
    InvalidKey {
        /// Element kind.
        elem: &'static str,
        /// Element name.
        name: String,
        /// The offending key.
        key: String,
        /// The pattern keys must match.
        pattern: String,
    },

    /// A dotted path does not resolve to an element.
    #[error("invalid dotted key '{path}': {reason}")]
    NotFound {
        /// The full dotted path that was looked up.
        path: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// Derived elements are computed and never take a default.
    #[error("cannot set a default on derived element '{name}'")]
    DerivedDefault {
        /// Name of the derived element.
        name: String,
    },

    /// A post-validator or resolver failed.
    #[error("error in post-validation of {elem} called '{name}' with value '{value}': {source}")]
    PostValidation {
        /// Element kind.
        elem: &'static str,
        /// Element name.
        name: String,
        /// Rendering of the value being post-validated.
        value: String,
        /// The underlying failure.
        #[source]
        source: Box<ConfigError>,
    },

    /// Free-form rejection raised by user hooks (post-validators,
    /// resolvers, converters, analyzers).
    #[error("{0}")]
    Rejected(String),

    /// The YAML document could not be parsed.
    #[error("YAML parse error: {0}")]
    Parse(String),

    /// The serialization event stream is malformed.
    #[error("YAML emit error: {0}")]
    Emit(String),

    /// IO error while reading or writing a document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Shorthand for a hook rejection.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Classify this error. Post-validation wrappers report the kind of
    /// the failure they wrap.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSchema(_) => ErrorKind::InvalidSchema,
            Self::RequiredMissing { .. } => ErrorKind::RequiredMissing,
            Self::TypeConversion { .. } => ErrorKind::TypeConversion,
            Self::OutOfRange { .. } | Self::Rejected(_) => ErrorKind::OutOfRange,
            Self::UnknownKey { .. } | Self::NotFound { .. } => ErrorKind::UnknownKey,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
            Self::DerivedDefault { .. } => ErrorKind::Unsupported,
            Self::PostValidation { source, .. } => source.kind(),
            Self::Parse(_) => ErrorKind::Parse,
            Self::Emit(_) => ErrorKind::Emit,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}
