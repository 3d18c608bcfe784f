#![deny(missing_docs)]
//! # yc-schema — Schema Elements, Loading and Dumping
//!
//! Declares configuration documents as a tree of elements and uses that tree
//! to validate YAML input and to write documented YAML output.
//!
//! ## Elements
//!
//! | Kind | Validates |
//! |---|---|
//! | [`ScalarElem`] | `int`, `float`, `bool`, `str` or `Path`, optionally from a set of choices |
//! | [`RangeElem`] | a number strictly between two bounds |
//! | [`RegexElem`] | a string matching an anchored pattern |
//! | [`ListElem`] | a homogeneous list with optional length bounds |
//! | [`CodeElem`] | a multi-line string written as a list of lines |
//! | [`KeyedElem`] | a mapping with declared fields |
//! | [`CategoryElem`] | a mapping with open keys and one value schema |
//! | [`DefaultedCategoryElem`] | a category of records sharing a baseline record |
//! | [`DerivedElem`] | a field computed from its validated siblings |
//!
//! [`YamlConfig`] is the root mapping that loads and dumps whole documents.
//!
//! ## Modules
//!
//! - [`element`]: the [`Element`] enum, the [`ConfigElement`] capability
//!   and the [`ElemOptions`] builder methods shared by every kind.
//! - [`events`] / [`emit`]: the serialization event model and the block
//!   emitter that renders it with comments.
//! - [`load`]: the `serde_yaml` boundary producing [`Value`] trees.
//!
//! ## Crate Policy
//!
//! - Depends only on `yc-core` internally.
//! - Schemas are checked once by `build()`. A built schema never fails for
//!   structural reasons while validating documents.
//! - No global state. Logging goes through `tracing`; installing a
//!   subscriber is left to the host program.

pub mod category;
pub mod config;
pub mod element;
pub mod emit;
pub mod events;
pub mod keyed;
pub mod list;
pub mod load;
pub mod scalar;

pub use category::{CategoryElem, DefaultedCategoryElem};
pub use config::{YamlConfig, YamlConfigBuilder};
pub use element::{ConfigElement, ElemBase, ElemOptions, Element, PostValidator, Siblings};
pub use emit::{emit, emit_to_string, DumpOptions};
pub use events::{Event, ScalarEvent, ScalarStyle};
pub use keyed::{DerivedElem, KeyedElem, Resolve, Resolver};
pub use list::{Analyzer, CodeElem, ListElem};
pub use load::{parse_document, read_document};
pub use scalar::{Converter, RangeElem, RegexElem, ScalarElem};

pub use yc_core::{ConfigDict, ConfigError, ConfigResult, ErrorKind, KeyCase, ScalarType, Value};

/// Everything needed to declare and use a schema.
pub mod prelude {
    pub use crate::category::{CategoryElem, DefaultedCategoryElem};
    pub use crate::config::YamlConfig;
    pub use crate::element::{ConfigElement, ElemOptions, Element, Siblings};
    pub use crate::emit::DumpOptions;
    pub use crate::keyed::{DerivedElem, KeyedElem, Resolve};
    pub use crate::list::{CodeElem, ListElem};
    pub use crate::scalar::{RangeElem, RegexElem, ScalarElem};
    pub use yc_core::{ConfigDict, ConfigError, ConfigResult, KeyCase, ScalarType, Value};
}
