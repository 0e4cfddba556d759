//! Persistent layer store
//!
//! Layout, per build context:
//!
//! ```text
//! <root>/<context>/<name>.toml   layer record
//! <root>/<context>/<name>/       layer payload
//! ```
//!
//! Records are written to a temporary file and renamed into place, so a
//! failed write never leaves a half-written record behind. Layers share no
//! files, so concurrent `put` calls for distinct names are independent.

use crate::error::{DotpubError, DotpubResult};
use crate::fingerprint::{Fingerprint, FingerprintKind};
use crate::layer::context::{validate_name, BuildContextId};
use crate::layer::metadata::{Layer, LayerFlags};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const RECORD_EXT: &str = "toml";

/// Layer store scoped to one build context
#[derive(Debug, Clone)]
pub struct LayerStore {
    root: PathBuf,
    context: BuildContextId,
}

impl LayerStore {
    /// Open the store for a build context under `root`
    pub fn new(root: impl Into<PathBuf>, context: BuildContextId) -> Self {
        Self {
            root: root.into(),
            context,
        }
    }

    /// Build context this store is scoped to
    pub fn context(&self) -> &BuildContextId {
        &self.context
    }

    /// Directory holding this context's layers
    pub fn context_dir(&self) -> PathBuf {
        self.root.join(self.context.as_str())
    }

    /// Payload directory for a layer
    pub fn payload_dir(&self, name: &str) -> DotpubResult<PathBuf> {
        check_layer_name(name)?;
        Ok(self.context_dir().join(name))
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.context_dir().join(format!("{}.{}", name, RECORD_EXT))
    }

    /// Look up a layer, returning `None` when no record exists
    pub async fn find(&self, name: &str) -> DotpubResult<Option<Layer>> {
        check_layer_name(name)?;
        let path = self.record_path(name);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DotpubError::store(
                    name,
                    format!("reading {}: {}", path.display(), e),
                ))
            }
        };

        Layer::from_toml(name, &content).map(Some)
    }

    /// Look up a layer that must exist
    pub async fn get(&self, name: &str) -> DotpubResult<Layer> {
        self.find(name)
            .await?
            .ok_or_else(|| DotpubError::LayerNotFound(name.to_string()))
    }

    /// True iff a record exists for `name` with exactly this fingerprint
    pub async fn is_valid(&self, name: &str, fingerprint: &Fingerprint) -> DotpubResult<bool> {
        Ok(self
            .find(name)
            .await?
            .is_some_and(|layer| &layer.fingerprint == fingerprint))
    }

    /// Write (or overwrite) a layer record.
    ///
    /// Keeps the original `created_at` when the layer already exists.
    pub async fn put(
        &self,
        name: &str,
        fingerprint: Fingerprint,
        kind: FingerprintKind,
        flags: LayerFlags,
        payload: &Path,
    ) -> DotpubResult<Layer> {
        self.put_with(name, fingerprint, kind, flags, payload, BTreeMap::new())
            .await
    }

    /// Like [`put`](Self::put), attaching extra metadata to the record
    pub async fn put_with(
        &self,
        name: &str,
        fingerprint: Fingerprint,
        kind: FingerprintKind,
        flags: LayerFlags,
        payload: &Path,
        extra: BTreeMap<String, String>,
    ) -> DotpubResult<Layer> {
        let existing = self.find(name).await?;
        let now = Utc::now();

        let layer = Layer {
            name: name.to_string(),
            flags,
            fingerprint,
            fingerprint_kind: kind,
            payload: payload.to_path_buf(),
            created_at: existing.map(|l| l.created_at).unwrap_or(now),
            updated_at: now,
            extra,
        };
        let content = layer.to_toml()?;

        let dir = self.context_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DotpubError::store(name, format!("creating {}: {}", dir.display(), e)))?;

        let path = self.record_path(name);
        let tmp = dir.join(format!(".{}.{}.tmp", name, RECORD_EXT));
        fs::write(&tmp, content)
            .await
            .map_err(|e| DotpubError::store(name, format!("writing {}: {}", tmp.display(), e)))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(DotpubError::store(
                name,
                format!("committing {}: {}", path.display(), e),
            ));
        }

        debug!(
            "Stored layer {} ({} {})",
            name,
            layer.fingerprint_kind,
            layer.fingerprint.short()
        );
        Ok(layer)
    }

    /// All layer records in this context, sorted by name
    pub async fn list(&self) -> DotpubResult<Vec<Layer>> {
        let dir = self.context_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(DotpubError::io(format!("reading {}", dir.display()), e)),
        };

        let mut layers = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DotpubError::io("reading layer entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXT) {
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if name.starts_with('.') || check_layer_name(name).is_err() {
                    continue;
                }
                if let Some(layer) = self.find(name).await? {
                    layers.push(layer);
                }
            }
        }

        layers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(layers)
    }

    /// Remove one layer's record and payload
    pub async fn remove(&self, name: &str) -> DotpubResult<bool> {
        check_layer_name(name)?;
        let record = self.record_path(name);
        if !record.exists() {
            return Ok(false);
        }

        fs::remove_file(&record)
            .await
            .map_err(|e| DotpubError::store(name, format!("removing record: {}", e)))?;

        let payload = self.context_dir().join(name);
        if payload.exists() {
            fs::remove_dir_all(&payload)
                .await
                .map_err(|e| DotpubError::store(name, format!("removing payload: {}", e)))?;
        }

        info!("Removed layer: {}", name);
        Ok(true)
    }

    /// Remove every layer of this context
    pub async fn clear(&self) -> DotpubResult<usize> {
        let layers = self.list().await?;
        for layer in &layers {
            self.remove(&layer.name).await?;
        }
        Ok(layers.len())
    }
}

fn check_layer_name(name: &str) -> DotpubResult<()> {
    validate_name(name).map_err(|reason| DotpubError::InvalidLayerName {
        name: name.to_string(),
        reason,
    })?;
    if name.starts_with('.') {
        return Err(DotpubError::InvalidLayerName {
            name: name.to_string(),
            reason: "must not start with '.'".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LayerStore {
        LayerStore::new(dir.path(), BuildContextId::new("test-app").unwrap())
    }

    const CACHE_ONLY: LayerFlags = LayerFlags::new(false, false, true);

    #[tokio::test]
    async fn get_missing_layer() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.find("nuget-cache").await.unwrap().is_none());
        let err = store.get("nuget-cache").await.unwrap_err();
        assert!(matches!(err, DotpubError::LayerNotFound(_)));
    }

    #[tokio::test]
    async fn put_then_validate() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let fp = Fingerprint::of_parts(["deps"]);
        let payload = store.payload_dir("nuget-cache").unwrap();

        store
            .put("nuget-cache", fp.clone(), FingerprintKind::Dependencies, CACHE_ONLY, &payload)
            .await
            .unwrap();

        assert!(store.is_valid("nuget-cache", &fp).await.unwrap());
        assert!(!store
            .is_valid("nuget-cache", &Fingerprint::of_parts(["other"]))
            .await
            .unwrap());
        assert!(!store.is_valid("publish-output", &fp).await.unwrap());

        let layer = store.get("nuget-cache").await.unwrap();
        assert_eq!(layer.flags, CACHE_ONLY);
        assert_eq!(layer.payload, payload);
    }

    #[tokio::test]
    async fn overwrite_keeps_created_at() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let payload = dir.path().join("payload");

        let first = store
            .put(
                "app",
                Fingerprint::of_parts(["1"]),
                FingerprintKind::FullSource,
                CACHE_ONLY,
                &payload,
            )
            .await
            .unwrap();
        let second = store
            .put(
                "app",
                Fingerprint::of_parts(["2"]),
                FingerprintKind::FullSource,
                CACHE_ONLY,
                &payload,
            )
            .await
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.get("app").await.unwrap().fingerprint, Fingerprint::of_parts(["2"]));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn contexts_are_isolated() {
        let dir = TempDir::new().unwrap();
        let a = LayerStore::new(dir.path(), BuildContextId::new("a").unwrap());
        let b = LayerStore::new(dir.path(), BuildContextId::new("b").unwrap());
        let fp = Fingerprint::of_parts(["x"]);

        a.put("nuget-cache", fp.clone(), FingerprintKind::Dependencies, CACHE_ONLY, dir.path())
            .await
            .unwrap();

        assert!(a.is_valid("nuget-cache", &fp).await.unwrap());
        assert!(!b.is_valid("nuget-cache", &fp).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_puts_for_distinct_layers() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut handles = vec![];
        for name in ["nuget-cache", "publish-output", "debug-support"] {
            let store = store.clone();
            let payload = dir.path().join(name);
            handles.push(tokio::spawn(async move {
                store
                    .put(
                        name,
                        Fingerprint::of_parts([name]),
                        FingerprintKind::FullSource,
                        CACHE_ONLY,
                        &payload,
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let names: Vec<_> = store.list().await.unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["debug-support", "nuget-cache", "publish-output"]);
        assert!(store
            .is_valid("publish-output", &Fingerprint::of_parts(["publish-output"]))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn corrupt_record_is_store_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(store.context_dir()).unwrap();
        std::fs::write(store.context_dir().join("nuget-cache.toml"), "garbage [").unwrap();

        let err = store.is_valid("nuget-cache", &Fingerprint::of_parts(["x"])).await.unwrap_err();
        assert!(matches!(err, DotpubError::StoreIo { .. }));
    }

    #[tokio::test]
    async fn rejects_unsafe_layer_names() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.find("../escape").await.is_err());
        assert!(store.find(".hidden").await.is_err());
        assert!(store.payload_dir("a/b").is_err());
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for name in ["nuget-cache", "publish-output"] {
            let payload = store.payload_dir(name).unwrap();
            std::fs::create_dir_all(&payload).unwrap();
            store
                .put(
                    name,
                    Fingerprint::of_parts([name]),
                    FingerprintKind::FullSource,
                    CACHE_ONLY,
                    &payload,
                )
                .await
                .unwrap();
        }

        assert!(store.remove("nuget-cache").await.unwrap());
        assert!(!store.remove("nuget-cache").await.unwrap());
        assert!(!store.payload_dir("nuget-cache").unwrap().exists());

        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.list().await.unwrap().is_empty());
    }
}
