//! Error types for field import and injection.

use thiserror::Error;

/// Errors raised while resolving external fields.
#[derive(Debug, Error)]
pub enum FieldError {
    /// A field is marked external but the package declares no dependencies.
    #[error(
        "importing external field \"{0}\": external fields not allowed because dependencies file \"_dev/build/build.yml\" is missing"
    )]
    ExternalFieldsNotAllowed(String),

    /// The referenced schema was not registered from the build manifest.
    #[error("schema \"{0}\" is not defined as package dependency")]
    SchemaNotDefined(String),

    /// The dotted path does not exist in the referenced schema.
    #[error("field definition not found in schema (name: {0})")]
    FieldNotFound(String),

    /// Import failure surfaced from tree injection.
    #[error("can't import field: {0}")]
    ImportFailed(#[source] Box<FieldError>),
}

/// Convenience alias for results with [`FieldError`].
pub type Result<T> = std::result::Result<T, FieldError>;
