#![deny(missing_docs)]
//! # yc-core — Foundational Types for Schema-Driven YAML Configuration
//!
//! This crate holds everything the schema layer needs that has nothing to
//! do with YAML itself: the error hierarchy, the validated value tree, the
//! scalar type converter, and the rules for element names and key case.
//! `yc-schema` builds the element tree, the emitter and the loading boundary
//! on top of it.
//!
//! ## Key Design Principles
//!
//! 1. **One error type.** Every failure is a [`ConfigError`], classified by
//!    [`ErrorKind`] so callers can branch on what went wrong without parsing
//!    messages.
//!
//! 2. **Owned value trees.** Validation returns a fresh [`Value`] tree the
//!    caller owns. Nothing in the schema holds references into it.
//!
//! 3. **Strict scalar conversion.** [`ScalarType::convert`] converts between
//!    primitive types only. Lists and mappings never become scalars.
//!
//! ## Crate Policy
//!
//! - No dependency on other `yc-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests. The only `expect` compiles
//!   the literal name pattern.

pub mod convert;
pub mod error;
pub mod name;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use convert::ScalarType;
pub use error::{ConfigError, ConfigResult, ErrorKind};
pub use name::{is_valid_key, validate_name, KeyCase, NAME_PATTERN};
pub use value::{format_float, ConfigDict, Value, ValueList};
