//! Schema dependency resolution for package field files.
//!
//! This crate connects a package's build manifest to the injection engine
//! in `field-deps-core`:
//!
//! - [`BuildManifest`] reads `_dev/build/build.yml`.
//! - [`SchemaLoader`] fetches a referenced schema once and caches it on disk.
//! - [`create_field_dependency_manager`] builds the
//!   [`DependencyManager`](field_deps_core::DependencyManager) from a
//!   manifest.
//! - [`resolve_external_fields`] rewrites every field file of a package
//!   with its external references resolved.
//!
//! # Quick start
//!
//! ```no_run
//! use field_deps_resolver::{HttpFetcher, ResolverConfig, SchemaLoader, resolve_external_fields};
//!
//! let loader = SchemaLoader::new(ResolverConfig::default(), HttpFetcher::new());
//! let report = resolve_external_fields("packages/nginx", "build/nginx", &loader).unwrap();
//! for path in &report.injected {
//!     println!("injected {}", path.display());
//! }
//! ```

mod build;
mod config;
mod error;
mod loader;
mod manifest;

pub use build::{
    ResolveReport, collect_field_files, inject_fields_document, load_dependency_manager,
    resolve_external_fields,
};
pub use config::{
    DEFAULT_ECS_SCHEMA_URL, ECS_SCHEMA_FILE, ECS_SCHEMA_NAME, ResolverConfig, default_cache_dir,
};
pub use error::{ResolverError, Result};
pub use loader::{
    FetchOutcome, GIT_REFERENCE_PREFIX, HttpFetcher, SchemaFetcher, SchemaLoader,
    as_git_reference, create_field_dependency_manager, parse_schema,
};
pub use manifest::{BUILD_MANIFEST_PATH, BuildManifest, Dependencies, EcsDependency};
