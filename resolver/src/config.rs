//! Resolver configuration.
//!
//! Controls where downloaded schemas are cached and where they are
//! downloaded from.
//!
//! # Example YAML
//!
//! ```yaml
//! cache_dir: /home/me/.cache/field-deps/fields
//! ecs_schema_url: https://raw.githubusercontent.com/elastic/ecs/{reference}/generated/ecs/{file}
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name under which the ECS schema is registered.
pub const ECS_SCHEMA_NAME: &str = "ecs";

/// File name of the ECS schema, both upstream and in the cache.
pub const ECS_SCHEMA_FILE: &str = "ecs_nested.yml";

/// Default location of the ECS schema. `{reference}` and `{file}` are
/// substituted at fetch time.
pub const DEFAULT_ECS_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/elastic/ecs/{reference}/generated/ecs/{file}";

/// Settings for schema loading.
///
/// # Examples
///
/// ```
/// use field_deps_resolver::ResolverConfig;
///
/// let config = ResolverConfig::with_cache_dir("/tmp/fields-cache");
/// assert_eq!(
///     config.schema_url("v8.0.0", "ecs_nested.yml"),
///     "https://raw.githubusercontent.com/elastic/ecs/v8.0.0/generated/ecs/ecs_nested.yml",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Root of the on-disk schema cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// URL template for the ECS schema.
    #[serde(default = "default_ecs_schema_url")]
    pub ecs_schema_url: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            ecs_schema_url: default_ecs_schema_url(),
        }
    }
}

impl ResolverConfig {
    /// Default settings with a custom cache root.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from a YAML file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ResolverError::IoError) if the file cannot
    /// be read, or [`Config`](crate::ResolverError::Config) if
    /// parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).map_err(|source| crate::ResolverError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self).map_err(|source| {
            crate::ResolverError::Config {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Expands the ECS URL template for a stripped reference.
    pub fn schema_url(&self, reference: &str, file: &str) -> String {
        self.ecs_schema_url
            .replace("{reference}", reference)
            .replace("{file}", file)
    }

    /// Returns the cache path for one schema version. Performs no I/O.
    pub fn cached_schema_path(&self, schema: &str, reference: &str, file: &str) -> PathBuf {
        self.cache_dir.join(schema).join(reference).join(file)
    }
}

fn default_ecs_schema_url() -> String {
    DEFAULT_ECS_SCHEMA_URL.to_string()
}

/// Default cache root (`$XDG_CACHE_HOME/field-deps/fields`).
pub fn default_cache_dir() -> PathBuf {
    dirs_cache_dir().join("field-deps").join("fields")
}

fn dirs_cache_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cache");
    }
    std::env::temp_dir()
}
