//! Field definition model and external field injection.
//!
//! This crate holds the pure part of dependency resolution for package
//! field files:
//!
//! - [`FieldDefinition`]: a field as published by an external schema.
//! - [`FieldNode`]: a field as written in a package, possibly marked
//!   `external: <schema>`.
//! - [`DependencyManager`]: the schemas a package depends on, keyed by
//!   name.
//!
//! Lookup ([`find_element_definition`]) walks a dotted path through a
//! schema. Injection ([`inject_fields`]) replaces external markers with the
//! imported definitions, merges local overrides and drops empty groups
//! ([`skip_field`]).
//!
//! Loading schemas from disk or the network lives in `field-deps-resolver`.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use field_deps_core::*;
//!
//! let mut schema = HashMap::new();
//! schema.insert(
//!     "ecs".to_string(),
//!     vec![FieldDefinition::new("event", "group")
//!         .with_field(FieldDefinition::new("outcome", "keyword"))],
//! );
//! let dm = DependencyManager::new(schema);
//!
//! let local = vec![FieldNode::new("event")
//!     .with_type("group")
//!     .with_external("ecs")
//!     .with_fields(vec![FieldNode::new("outcome")])];
//!
//! let (merged, changed) = dm.inject_fields(local).unwrap();
//! assert!(changed);
//! assert_eq!(
//!     merged[0].fields.as_ref().unwrap()[0],
//!     FieldNode::new("outcome").with_type("keyword"),
//! );
//! ```

mod dependency;
mod error;
mod index;
mod merge;
mod prune;
mod types;

pub use dependency::DependencyManager;
pub use error::{FieldError, Result};
pub use index::find_element_definition;
pub use merge::{import_field, inject_fields, transform_imported_field};
pub use prune::skip_field;
pub use types::*;
