//! Error types for dependency resolution.
//!
//! Covers every failure mode between a build manifest and an injected field
//! file: malformed references, remote fetches, the on-disk cache, schema
//! parsing and field import.

use std::path::PathBuf;

use field_deps_core::FieldError;
use thiserror::Error;

/// Errors that can occur while resolving schema dependencies.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The dependency reference lacks the `git@` prefix.
    #[error("invalid Git reference (\"git@\" prefix expected): {0}")]
    InvalidReference(String),

    /// The declared reference does not exist upstream. Not retried.
    #[error(
        "unsatisfied {schema} dependency, reference defined in build manifest doesn't exist (HTTP StatusNotFound, URL: {url})"
    )]
    UnsatisfiedDependency { schema: String, url: String },

    /// Transport-level failure while downloading a schema.
    #[error("can't download the online schema (URL: {url}): {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The schema host answered with a non-success status other than 404.
    #[error("unexpected HTTP status code: {status} (URL: {url})")]
    UnexpectedStatus { status: u16, url: String },

    /// The cache directory could not be created.
    #[error("can't create cache directories for schema (path: {}): {source}", .path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cached schema exists but could not be read.
    #[error("can't read cached schema (path: {}): {source}", .path.display())]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The downloaded schema could not be written to the cache.
    #[error("can't write cached schema (path: {}): {source}", .path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema document is not a list of field definitions.
    #[error("unmarshalling field body failed: {0}")]
    SchemaParse(#[source] serde_yaml::Error),

    /// The build manifest exists but could not be read.
    #[error("can't read build manifest (path: {}): {source}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The build manifest is not valid YAML.
    #[error("can't parse build manifest (path: {}): {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The resolver configuration file is not valid YAML.
    #[error("invalid resolver configuration (path: {}): {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A package field file could not be read.
    #[error("can't read field file (path: {}): {source}", .path.display())]
    FieldsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A package field file could not be rewritten.
    #[error("can't write field file (path: {}): {source}", .path.display())]
    FieldsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A package field document could not be parsed or serialized.
    #[error("{context}: {source}")]
    FieldsDocument {
        context: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    /// Import or injection failure from the merge engine.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Context wrapper naming the step that failed.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ResolverError>,
    },

    /// File I/O failure outside of the schema cache.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ResolverError {
    /// Wraps `self` with a description of the step that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &ResolverError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience alias for results with [`ResolverError`].
pub type Result<T> = std::result::Result<T, ResolverError>;
