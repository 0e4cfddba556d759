//! Content fingerprints for cache validation
//!
//! A fingerprint is a SHA256 digest over a file set. Two domains exist for
//! file sets: the dependency manifests alone, and the full source tree. A
//! third domain is derived from the build plan rather than from files.
//!
//! Only relative path names and byte contents contribute. Timestamps,
//! permissions and the order the paths were supplied in do not.

pub mod manifest;
pub mod source;

pub use manifest::{dependency_manifests, is_dependency_manifest};
pub use source::{is_generated_path, source_files};

use crate::error::{DotpubError, DotpubResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Which file set a fingerprint covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintKind {
    /// Dependency manifests only (project files, lock files, NuGet config)
    Dependencies,
    /// Every tracked source file, excluding build output
    FullSource,
    /// Selected toolchain and configuration
    Toolchain,
}

impl FingerprintKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::FullSource => "full-source",
            Self::Toolchain => "toolchain",
        }
    }
}

impl fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerprintKind {
    type Err = DotpubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dependencies" => Ok(Self::Dependencies),
            "full-source" => Ok(Self::FullSource),
            "toolchain" => Ok(Self::Toolchain),
            other => Err(DotpubError::User(format!(
                "Unknown fingerprint kind '{}'",
                other
            ))),
        }
    }
}

/// Hex characters in a SHA256 digest
const DIGEST_HEX_LEN: usize = 64;

/// Opaque SHA256 digest, stored as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digest over an ordered list of string parts
    pub fn of_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            let part = part.as_ref();
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Full hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    /// Accepts exactly 64 hex digits, normalized to lowercase
    fn try_from(hex: String) -> Result<Self, Self::Error> {
        if hex.len() != DIGEST_HEX_LEN || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!(
                "fingerprint must be {} hex characters, got '{}'",
                DIGEST_HEX_LEN, hex
            ));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relative path with `/` separators, used as the hashed name of a member
fn member_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(kind: FingerprintKind, path: &Path, reason: impl ToString) -> DotpubError {
    match kind {
        FingerprintKind::Dependencies => DotpubError::manifest(path, reason),
        _ => DotpubError::SourceRead {
            kind,
            path: path.to_path_buf(),
            reason: reason.to_string(),
        },
    }
}

/// Compute the fingerprint of a file set.
///
/// `Dependencies` keeps only recognized manifests and `FullSource` drops
/// generated build output; an empty set after filtering is a read error,
/// never a silent invalidation. `Toolchain` is not file based and is
/// rejected here; use [`Fingerprint::of_parts`].
pub fn fingerprint<'a, I>(
    root: &Path,
    paths: I,
    kind: FingerprintKind,
) -> DotpubResult<Fingerprint>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let mut members: BTreeMap<String, &Path> = BTreeMap::new();
    for path in paths {
        let name = member_name(root, path);
        let keep = match kind {
            FingerprintKind::Dependencies => is_dependency_manifest(path),
            FingerprintKind::FullSource => !is_generated_path(Path::new(&name)),
            FingerprintKind::Toolchain => {
                return Err(DotpubError::User(
                    "toolchain fingerprints are derived from the build plan".to_string(),
                ))
            }
        };
        if keep {
            members.insert(name, path.as_path());
        }
    }

    if members.is_empty() {
        return Err(read_error(kind, root, "no files to fingerprint"));
    }

    let mut hasher = Sha256::new();
    for (name, path) in &members {
        let contents = fs::read(path).map_err(|e| read_error(kind, path, e))?;
        hasher.update((name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }

    let digest = Fingerprint(hex::encode(hasher.finalize()));
    debug!(
        "Fingerprinted {} file(s) for {}: {}",
        members.len(),
        kind,
        digest.short()
    );
    Ok(digest)
}
