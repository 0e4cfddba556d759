//! Build context identifiers
//!
//! Every store operation is scoped by an explicit context id, so two builds
//! of different sources never share layer records.

use crate::error::{DotpubError, DotpubResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Validated identifier of one build context
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildContextId(String);

impl BuildContextId {
    /// Parse a user supplied context id
    pub fn new(id: impl Into<String>) -> DotpubResult<Self> {
        let id = id.into();
        validate_name(&id).map_err(|reason| DotpubError::InvalidContext {
            id: id.clone(),
            reason,
        })?;
        Ok(Self(id))
    }

    /// Derive a stable id from a source directory.
    ///
    /// Uses the canonical path when it resolves, so `./app` and the
    /// absolute path name the same context.
    pub fn for_source(source: &Path) -> Self {
        let canonical = source
            .canonicalize()
            .unwrap_or_else(|_| source.to_path_buf());
        let stem = canonical
            .file_name()
            .and_then(|n| n.to_str())
            .map(sanitize)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "app".to_string());

        let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
        Self(format!("{}-{}", stem, hex::encode(&digest[..6])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Validate that a name is safe to use as a path component.
///
/// Shared by context ids and layer names.
pub(crate) fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".to_string());
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") || name.contains('\0') {
        return Err("must not contain path separators or '..'".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(
            "must contain only alphanumeric characters, hyphens, underscores or dots".to_string(),
        );
    }
    Ok(())
}
