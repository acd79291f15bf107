//! Package build manifest.
//!
//! A package declares its schema dependencies in `_dev/build/build.yml`:
//!
//! ```yaml
//! dependencies:
//!   ecs:
//!     reference: git@v8.0.0
//! ```
//!
//! A package without this file has no dependency manager; any external
//! field it uses fails to import.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ResolverError, Result};

/// Location of the build manifest relative to the package root.
pub const BUILD_MANIFEST_PATH: &str = "_dev/build/build.yml";

/// Contents of `_dev/build/build.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    #[serde(default)]
    pub dependencies: Dependencies,
}

/// External schemas the package depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub ecs: EcsDependency,
}

/// ECS dependency, selected by a `git@<ref>` reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcsDependency {
    #[serde(default)]
    pub reference: String,
}

impl BuildManifest {
    /// Returns the manifest path for a package root.
    pub fn path(package_root: impl AsRef<Path>) -> PathBuf {
        package_root.as_ref().join(BUILD_MANIFEST_PATH)
    }

    /// Reads the build manifest of a package.
    ///
    /// Returns `Ok(None)` when the package has no build manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestRead`](ResolverError::ManifestRead) if the file
    /// exists but cannot be read, or
    /// [`ManifestParse`](ResolverError::ManifestParse) if it is not valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use field_deps_resolver::BuildManifest;
    ///
    /// let dir = std::env::temp_dir().join("field_deps_doc_no_manifest");
    /// assert!(BuildManifest::read(&dir).unwrap().is_none());
    /// ```
    pub fn read(package_root: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = Self::path(package_root);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ResolverError::ManifestRead { path, source }),
        };
        Self::parse(&content)
            .map(Some)
            .map_err(|source| ResolverError::ManifestParse { path, source })
    }

    /// Parses manifest YAML.
    pub fn parse(content: &[u8]) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(content)
    }

    /// Returns `true` if any dependency reference is set.
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.ecs.reference.is_empty()
    }
}
