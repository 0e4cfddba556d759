//! Configuration management for dotpub

pub mod options;
pub mod schema;

pub use options::{BuildOptions, LogLevel};
pub use schema::Config;

use crate::error::{DotpubError, DotpubResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the project-local config overlay
pub const LOCAL_CONFIG_NAME: &str = "dotpub.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dotpub")
            .join("config.toml")
    }

    /// Default layer store root
    pub fn default_store_root() -> PathBuf {
        dirs::cache_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dotpub")
            .join("layers")
    }

    /// Store root from config, falling back to the default
    pub fn store_root(config: &Config) -> PathBuf {
        config
            .store
            .root
            .clone()
            .unwrap_or_else(Self::default_store_root)
    }

    /// Look for `dotpub.toml` in `dir`
    pub fn find_local_config(dir: &Path) -> Option<PathBuf> {
        let path = dir.join(LOCAL_CONFIG_NAME);
        path.is_file().then_some(path)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> DotpubResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load global config, then overlay a project-local file key by key
    pub async fn load_merged(&self, local: Option<&Path>) -> DotpubResult<Config> {
        let mut base = if self.config_path.exists() {
            read_table(&self.config_path).await?
        } else {
            toml::Table::new()
        };

        if let Some(path) = local {
            debug!("Merging local config: {}", path.display());
            merge_tables(&mut base, read_table(path).await?);
        }

        let path = local.unwrap_or(&self.config_path).to_path_buf();
        toml::Value::Table(base)
            .try_into()
            .map_err(|e: toml::de::Error| DotpubError::ConfigInvalid {
                path,
                reason: e.to_string(),
            })
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> DotpubResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| DotpubError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| DotpubError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> DotpubResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                DotpubError::io(format!("creating config directory {}", parent.display()), e)
            })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            DotpubError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_table(path: &Path) -> DotpubResult<toml::Table> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| DotpubError::io(format!("reading config from {}", path.display()), e))?;
    content.parse::<toml::Table>().map_err(|e| DotpubError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Recursively overlay `overlay` onto `base`; non-table values replace
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let toml::Value::Table(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.toolchain.dotnet, "dotnet");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.toolchain.runtime_identifier = "linux-arm64".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.toolchain.runtime_identifier, "linux-arm64");
    }

    #[tokio::test]
    async fn local_config_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        std::fs::write(
            &global,
            "[toolchain]\nsdks = [\"6.0.100\"]\nruntime_identifier = \"linux-musl-x64\"\n",
        )
        .unwrap();

        let project = temp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join(LOCAL_CONFIG_NAME), "[toolchain]\nsdks = [\"3.1.426\"]\n")
            .unwrap();

        let local = ConfigManager::find_local_config(&project);
        assert!(local.is_some());

        let config = ConfigManager::with_path(global)
            .load_merged(local.as_deref())
            .await
            .unwrap();
        assert_eq!(config.toolchain.sdks, vec!["3.1.426"]);
        assert_eq!(config.toolchain.runtime_identifier, "linux-musl-x64");
    }

    #[tokio::test]
    async fn invalid_config_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[toolchain]\nsdks = 7\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, DotpubError::ConfigInvalid { path: p, .. } if p == path));
    }
}
