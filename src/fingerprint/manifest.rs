//! Dependency manifest detection
//!
//! Finds the files that enumerate a .NET project's external package
//! references. Same manifests = same package cache.

use crate::error::{DotpubError, DotpubResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project file extensions that carry `PackageReference` items
const PROJECT_EXTENSIONS: &[&str] = &["csproj", "fsproj", "vbproj"];

/// Well-known manifest names, compared case-insensitively
const MANIFEST_NAMES: &[&str] = &[
    "packages.lock.json",
    "directory.packages.props",
    "directory.build.props",
    "nuget.config",
    "global.json",
];

/// Whether a path names a dependency manifest
pub fn is_dependency_manifest(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_ascii_lowercase();

    if MANIFEST_NAMES.contains(&lower.as_str()) {
        return true;
    }

    Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| PROJECT_EXTENSIONS.contains(&ext))
}

/// Detect dependency manifests in a project directory.
///
/// Scans the project root and its immediate subdirectories (solution
/// layouts keep one project per folder), skipping build output. Fails when
/// nothing is found: without a manifest there is no package fingerprint.
pub fn dependency_manifests(project_dir: &Path) -> DotpubResult<BTreeSet<PathBuf>> {
    let mut found = BTreeSet::new();
    scan_dir(project_dir, &mut found)?;

    let entries = fs::read_dir(project_dir)
        .map_err(|e| DotpubError::manifest(project_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| DotpubError::manifest(project_dir, e))?;
        let path = entry.path();
        if path.is_dir() && !super::is_generated_path(Path::new(&entry.file_name())) {
            scan_dir(&path, &mut found)?;
        }
    }

    if found.is_empty() {
        return Err(DotpubError::manifest(
            project_dir,
            "no .csproj, .fsproj, .vbproj or packages.lock.json found",
        ));
    }

    debug!("Detected {} dependency manifest(s)", found.len());
    Ok(found)
}

fn scan_dir(dir: &Path, found: &mut BTreeSet<PathBuf>) -> DotpubResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| DotpubError::manifest(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| DotpubError::manifest(dir, e))?;
        let path = entry.path();
        if path.is_file() && is_dependency_manifest(&path) {
            debug!("Found dependency manifest: {}", path.display());
            found.insert(path);
        }
    }
    Ok(())
}
