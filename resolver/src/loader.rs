//! Schema loading with an on-disk cache.
//!
//! [`SchemaLoader`] turns a dependency reference such as `git@v8.0.0` into
//! parsed field definitions. Each (schema, reference) pair is stored once
//! under the cache root:
//!
//! ```text
//! <cache_dir>/<schema>/<reference>/<file>
//! ```
//!
//! A cached file is read without touching the network. On a miss the file
//! is downloaded once through a [`SchemaFetcher`] and written to the cache.
//!
//! Cache writes are plain file writes. Two processes resolving the same
//! reference at the same time may both download and both write it; the last
//! writer wins and a reader racing a writer can see a partial file.

use std::collections::HashMap;
use std::path::Path;

use field_deps_core::{DependencyManager, FieldDefinition};
use tracing::debug;

use crate::config::{ECS_SCHEMA_FILE, ECS_SCHEMA_NAME, ResolverConfig};
use crate::error::{ResolverError, Result};
use crate::manifest::Dependencies;

/// Prefix marking a reference as a Git ref.
pub const GIT_REFERENCE_PREFIX: &str = "git@";

/// Result of a single schema download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response with its full body.
    Found(Vec<u8>),
    /// 404 response.
    NotFound,
    /// Any other status code.
    Status(u16),
}

/// Downloads schema documents.
///
/// Implementations perform one request per call with no retries.
pub trait SchemaFetcher {
    /// Fetches `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Fetch`](ResolverError::Fetch) on transport failures.
    fn fetch(&self, url: &str) -> Result<FetchOutcome>;
}

impl<F: SchemaFetcher + ?Sized> SchemaFetcher for &F {
    fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP fetcher backed by `reqwest` with the client's defaults.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchemaFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        let fetch_err = |source: reqwest::Error| ResolverError::Fetch {
            url: url.to_string(),
            source,
        };

        let resp = self.client.get(url).send().map_err(fetch_err)?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            return Ok(FetchOutcome::Status(status.as_u16()));
        }

        let body = resp.bytes().map_err(fetch_err)?;
        Ok(FetchOutcome::Found(body.to_vec()))
    }
}

/// Loads schemas from the cache, fetching them on a miss.
pub struct SchemaLoader<F> {
    config: ResolverConfig,
    fetcher: F,
}

impl<F: SchemaFetcher> SchemaLoader<F> {
    pub fn new(config: ResolverConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Returns the loader configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Loads the ECS schema for `reference`.
    ///
    /// An empty reference means the dependency is not declared and yields
    /// `Ok(None)`.
    pub fn load_ecs(&self, reference: &str) -> Result<Option<Vec<FieldDefinition>>> {
        if reference.is_empty() {
            debug!("ECS dependency isn't defined");
            return Ok(None);
        }

        let content = self
            .read_schema_file(ECS_SCHEMA_NAME, reference, ECS_SCHEMA_FILE)
            .map_err(|err| err.context("error reading ECS fields schema file"))?;
        parse_schema(&content).map(Some)
    }

    /// Returns the raw schema document for `reference`, from the cache if
    /// present.
    ///
    /// # Errors
    ///
    /// - [`InvalidReference`](ResolverError::InvalidReference) before any
    ///   I/O if `reference` lacks the `git@` prefix.
    /// - [`UnsatisfiedDependency`](ResolverError::UnsatisfiedDependency) if
    ///   the reference does not exist upstream.
    /// - [`UnexpectedStatus`](ResolverError::UnexpectedStatus) or
    ///   [`Fetch`](ResolverError::Fetch) for other download failures.
    /// - `CacheDir`, `CacheRead` or `CacheWrite` for cache failures.
    pub fn read_schema_file(&self, schema: &str, reference: &str, file: &str) -> Result<Vec<u8>> {
        let git_reference = as_git_reference(reference)?;
        let cached_schema_path = self.config.cached_schema_path(schema, git_reference, file);

        match std::fs::read(&cached_schema_path) {
            Ok(content) => {
                debug!(path = %cached_schema_path.display(), "Using cached schema");
                Ok(content)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(reference, "Pulling {schema} dependency");
                let content = self.download(schema, git_reference, file)?;
                write_cache(&cached_schema_path, &content)?;
                Ok(content)
            }
            Err(source) => Err(ResolverError::CacheRead {
                path: cached_schema_path,
                source,
            }),
        }
    }

    fn download(&self, schema: &str, git_reference: &str, file: &str) -> Result<Vec<u8>> {
        let url = self.config.schema_url(git_reference, file);
        debug!(url = %url, "Schema URL");

        match self.fetcher.fetch(&url)? {
            FetchOutcome::Found(content) => {
                debug!(bytes = content.len(), "Downloaded schema");
                Ok(content)
            }
            FetchOutcome::NotFound => Err(ResolverError::UnsatisfiedDependency {
                schema: schema.to_uppercase(),
                url,
            }),
            FetchOutcome::Status(status) => Err(ResolverError::UnexpectedStatus { status, url }),
        }
    }
}

fn write_cache(cached_schema_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(cached_schema_dir) = cached_schema_path.parent() {
        std::fs::create_dir_all(cached_schema_dir).map_err(|source| ResolverError::CacheDir {
            path: cached_schema_dir.to_path_buf(),
            source,
        })?;
    }

    debug!(path = %cached_schema_path.display(), "Cache downloaded schema");
    std::fs::write(cached_schema_path, content).map_err(|source| ResolverError::CacheWrite {
        path: cached_schema_path.to_path_buf(),
        source,
    })
}

/// Strips the `git@` prefix from a dependency reference.
///
/// # Examples
///
/// ```
/// use field_deps_resolver::as_git_reference;
///
/// assert_eq!(as_git_reference("git@v8.0.0").unwrap(), "v8.0.0");
/// assert!(as_git_reference("v8.0.0").is_err());
/// ```
pub fn as_git_reference(reference: &str) -> Result<&str> {
    reference
        .strip_prefix(GIT_REFERENCE_PREFIX)
        .ok_or_else(|| ResolverError::InvalidReference(reference.to_string()))
}

/// Parses a schema document into field definitions.
pub fn parse_schema(content: &[u8]) -> Result<Vec<FieldDefinition>> {
    serde_yaml::from_slice(content).map_err(ResolverError::SchemaParse)
}

/// Builds a [`DependencyManager`] from the dependencies of a build manifest.
///
/// Dependencies with an empty reference are skipped, so later imports from
/// them fail with "not defined as package dependency".
pub fn create_field_dependency_manager<F: SchemaFetcher>(
    deps: &Dependencies,
    loader: &SchemaLoader<F>,
) -> Result<DependencyManager> {
    let schema = build_fields_schema(deps, loader)
        .map_err(|err| err.context("can't build fields schema"))?;
    let dm = DependencyManager::new(schema);
    debug!(schemas = ?dm.schema_names().collect::<Vec<_>>(), "Field dependencies loaded");
    Ok(dm)
}

fn build_fields_schema<F: SchemaFetcher>(
    deps: &Dependencies,
    loader: &SchemaLoader<F>,
) -> Result<HashMap<String, Vec<FieldDefinition>>> {
    let mut schema = HashMap::new();
    let ecs_schema = loader
        .load_ecs(&deps.ecs.reference)
        .map_err(|err| err.context("can't load fields"))?;
    if let Some(ecs_schema) = ecs_schema {
        schema.insert(ECS_SCHEMA_NAME.to_string(), ecs_schema);
    }
    Ok(schema)
}
