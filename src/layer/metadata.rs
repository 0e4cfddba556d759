//! Layer records
//!
//! Each layer is persisted as `<name>.toml` with a `[types]` table carrying
//! the availability flags and a `[metadata]` table carrying the fingerprint
//! the layer was built from.

use crate::error::{DotpubError, DotpubResult};
use crate::fingerprint::{Fingerprint, FingerprintKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where a layer is visible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerFlags {
    /// Included in the runtime image
    pub launch: bool,
    /// Visible to later buildpacks in the same build
    pub build: bool,
    /// Restored on the next build of the same context
    pub cache: bool,
}

impl LayerFlags {
    pub const fn new(launch: bool, build: bool, cache: bool) -> Self {
        Self {
            launch,
            build,
            cache,
        }
    }
}

/// A persisted layer
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Layer name (unique per build context)
    pub name: String,
    /// Availability flags
    pub flags: LayerFlags,
    /// Fingerprint the layer content was built from
    pub fingerprint: Fingerprint,
    /// Domain of that fingerprint
    pub fingerprint_kind: FingerprintKind,
    /// Payload directory (opaque to the store)
    pub payload: PathBuf,
    /// First build of this layer
    pub created_at: DateTime<Utc>,
    /// Last rebuild of this layer
    pub updated_at: DateTime<Utc>,
    /// Free-form key/value metadata (sdk version, configuration)
    pub extra: BTreeMap<String, String>,
}

/// Serialized form of a layer record
#[derive(Debug, Serialize, Deserialize)]
struct LayerRecord {
    types: LayerFlags,
    metadata: RecordMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordMetadata {
    fingerprint: Fingerprint,
    fingerprint_kind: FingerprintKind,
    payload: PathBuf,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, String>,
}

impl Layer {
    /// Serialize to the on-disk TOML record
    pub fn to_toml(&self) -> DotpubResult<String> {
        let record = LayerRecord {
            types: self.flags,
            metadata: RecordMetadata {
                fingerprint: self.fingerprint.clone(),
                fingerprint_kind: self.fingerprint_kind,
                payload: self.payload.clone(),
                created_at: self.created_at,
                updated_at: self.updated_at,
                extra: self.extra.clone(),
            },
        };
        toml::to_string_pretty(&record).map_err(|e| DotpubError::store(&self.name, e))
    }

    /// Parse an on-disk TOML record
    pub fn from_toml(name: &str, content: &str) -> DotpubResult<Self> {
        let record: LayerRecord =
            toml::from_str(content).map_err(|e| DotpubError::store(name, e))?;
        Ok(Self {
            name: name.to_string(),
            flags: record.types,
            fingerprint: record.metadata.fingerprint,
            fingerprint_kind: record.metadata.fingerprint_kind,
            payload: record.metadata.payload,
            created_at: record.metadata.created_at,
            updated_at: record.metadata.updated_at,
            extra: record.metadata.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    const NUGET_RECORD: &str = r#"
[types]
launch = false
build = false
cache = true

[metadata]
fingerprint = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
fingerprint_kind = "dependencies"
payload = "/layers/nuget-cache"
created_at = "2024-01-15T10:00:00Z"
updated_at = "2024-01-16T10:00:00Z"
"#;

    #[test]
    fn parse_record() {
        let layer = Layer::from_toml("nuget-cache", NUGET_RECORD).unwrap();
        assert_eq!(layer.name, "nuget-cache");
        assert_eq!(layer.flags, LayerFlags::new(false, false, true));
        assert_eq!(layer.fingerprint.as_str(), DIGEST);
        assert_eq!(layer.fingerprint_kind, FingerprintKind::Dependencies);
        assert_eq!(layer.payload, PathBuf::from("/layers/nuget-cache"));
        assert!(layer.extra.is_empty());
    }

    #[test]
    fn types_table_required() {
        let record = r#"
[metadata]
fingerprint = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
fingerprint_kind = "full-source"
payload = "/layers/publish-output"
created_at = "2024-01-15T10:00:00Z"
updated_at = "2024-01-15T10:00:00Z"
"#;
        let err = Layer::from_toml("publish-output", record);
        assert!(err.is_err());

        let with_empty_types = format!("[types]\n{}", record);
        let layer = Layer::from_toml("publish-output", &with_empty_types).unwrap();
        assert_eq!(layer.flags, LayerFlags::default());
    }

    #[test]
    fn serialized_record_keeps_types_table() {
        let mut layer = Layer::from_toml("nuget-cache", NUGET_RECORD).unwrap();
        layer.extra.insert("sdk".into(), "6.0.100".into());

        let toml = layer.to_toml().unwrap();
        assert!(toml.contains("[types]"));
        assert!(toml.contains("cache = true"));
        assert!(toml.contains("fingerprint_kind = \"dependencies\""));

        let parsed = Layer::from_toml("nuget-cache", &toml).unwrap();
        assert_eq!(parsed, layer);
    }

    #[test]
    fn corrupt_record_is_store_error() {
        let err = Layer::from_toml("nuget-cache", "not = [valid").unwrap_err();
        assert!(matches!(err, DotpubError::StoreIo { ref layer, .. } if layer == "nuget-cache"));
    }

    #[test]
    fn malformed_fingerprint_is_store_error() {
        for bad in ["abc123", "ééééééééééééé", ""] {
            let record = NUGET_RECORD.replace(DIGEST, bad);
            let err = Layer::from_toml("nuget-cache", &record).unwrap_err();
            assert!(
                matches!(err, DotpubError::StoreIo { ref layer, .. } if layer == "nuget-cache"),
                "{:?}",
                err
            );
        }
    }
}
