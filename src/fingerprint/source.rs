//! Source tree enumeration

use super::FingerprintKind;
use crate::error::{DotpubError, DotpubResult};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Directories holding build-time generated artifacts
const GENERATED_DIRS: &[&str] = &["bin", "obj", ".git", "node_modules"];

/// Whether a relative path lies inside generated build output
pub fn is_generated_path(rel: &Path) -> bool {
    rel.components().any(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|n| GENERATED_DIRS.contains(&n)),
        _ => false,
    })
}

/// List every tracked source file under `root`
pub fn source_files(root: &Path) -> DotpubResult<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();

    let walker = WalkDir::new(root).follow_links(false).into_iter();
    let walker = walker.filter_entry(|entry| {
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        !is_generated_path(rel)
    });

    for entry in walker {
        let entry = entry.map_err(|e| DotpubError::SourceRead {
            kind: FingerprintKind::FullSource,
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            files.insert(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn generated_paths() {
        assert!(is_generated_path(Path::new("obj/project.assets.json")));
        assert!(is_generated_path(Path::new("src/bin/Release/app.dll")));
        assert!(!is_generated_path(Path::new("src/binder.cs")));
        assert!(!is_generated_path(Path::new("Startup.cs")));
    }

    #[test]
    fn lists_sources_without_build_output() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Controllers")).unwrap();
        fs::create_dir_all(dir.path().join("bin").join("Debug")).unwrap();
        fs::write(dir.path().join("Startup.cs"), "").unwrap();
        fs::write(dir.path().join("Controllers").join("Values.cs"), "").unwrap();
        fs::write(dir.path().join("bin").join("Debug").join("app.dll"), "").unwrap();

        let files = source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&dir.path().join("Startup.cs")));
        assert!(files.contains(&dir.path().join("Controllers").join("Values.cs")));
    }
}
