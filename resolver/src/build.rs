//! Package build step resolving external fields in place.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use field_deps_core::{DependencyManager, FieldNode, inject_fields};
use tracing::{debug, info};

use crate::error::{ResolverError, Result};
use crate::loader::{SchemaFetcher, SchemaLoader, create_field_dependency_manager};
use crate::manifest::BuildManifest;

/// Files touched by [`resolve_external_fields`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Field files that were examined, in processing order.
    pub scanned: Vec<PathBuf>,
    /// Field files that contained external references and were rewritten.
    pub injected: Vec<PathBuf>,
}

/// Creates the dependency manager for a package.
///
/// Returns `Ok(None)` when the package has no build manifest. Every external
/// field then fails to import with a message naming the missing file.
pub fn load_dependency_manager<F: SchemaFetcher>(
    package_root: impl AsRef<Path>,
    loader: &SchemaLoader<F>,
) -> Result<Option<DependencyManager>> {
    let Some(manifest) = BuildManifest::read(package_root)? else {
        debug!("Build manifest hasn't been defined for the package");
        return Ok(None);
    };
    if !manifest.has_dependencies() {
        debug!("Package doesn't have any external dependencies defined");
    }
    create_field_dependency_manager(&manifest.dependencies, loader).map(Some)
}

/// Replaces external field references in every field file under
/// `build_dir`.
///
/// Field files are `data_stream/*/fields/*.yml` and `fields/*.yml`. Files
/// without external references are left untouched. The first failure
/// aborts the step; files already rewritten stay rewritten.
pub fn resolve_external_fields<F: SchemaFetcher>(
    package_root: impl AsRef<Path>,
    build_dir: impl AsRef<Path>,
    loader: &SchemaLoader<F>,
) -> Result<ResolveReport> {
    let dm = load_dependency_manager(package_root, loader)?;
    let mut report = ResolveReport::default();

    for file in collect_field_files(build_dir.as_ref())? {
        let injected = resolve_field_file(dm.as_ref(), &file)
            .map_err(|err| err.context(format!("{} failed", file.display())))?;
        if injected {
            report.injected.push(file.clone());
        }
        report.scanned.push(file);
    }

    Ok(report)
}

/// Rewrites a single field file if it references external fields.
fn resolve_field_file(dm: Option<&DependencyManager>, file: &Path) -> Result<bool> {
    let content = fs::read(file).map_err(|source| ResolverError::FieldsRead {
        path: file.to_path_buf(),
        source,
    })?;
    let (output, injected) = inject_fields_document(dm, &content)?;
    if injected {
        info!(path = %file.display(), "Injected external fields");
        fs::write(file, output).map_err(|source| ResolverError::FieldsWrite {
            path: file.to_path_buf(),
            source,
        })?;
    }
    Ok(injected)
}

/// Parses a field file, injects external fields and serializes it back.
///
/// Returns the new document and whether anything was injected.
pub fn inject_fields_document(
    dm: Option<&DependencyManager>,
    content: &[u8],
) -> Result<(String, bool)> {
    let defs: Vec<FieldNode> = if content.iter().all(u8::is_ascii_whitespace) {
        Vec::new()
    } else {
        serde_yaml::from_slice(content).map_err(|source| ResolverError::FieldsDocument {
            context: "can't unmarshal source file",
            source,
        })?
    };

    let (updated, changed) = inject_fields(dm, defs)?;
    let output = serde_yaml::to_string(&updated)
        .map_err(|source| ResolverError::FieldsDocument {
            context: "can't marshal source file",
            source,
        })?;
    Ok((output, changed))
}

/// Lists field files under a package or build directory in sorted order.
pub fn collect_field_files(build_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = BTreeSet::new();

    collect_yml(&build_dir.join("fields"), &mut paths)?;

    let data_streams = build_dir.join("data_stream");
    if data_streams.is_dir() {
        for entry in fs::read_dir(&data_streams)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                collect_yml(&path.join("fields"), &mut paths)?;
            }
        }
    }

    Ok(paths.into_iter().collect())
}

fn collect_yml(dir: &Path, paths: &mut BTreeSet<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension() == Some(OsStr::new("yml")) {
            paths.insert(path);
        }
    }
    Ok(())
}
