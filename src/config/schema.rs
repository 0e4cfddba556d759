//! Configuration schema for dotpub
//!
//! Configuration is stored at `~/.config/dotpub/config.toml`, optionally
//! overlaid by a project-local `dotpub.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Layer store settings
    pub store: StoreConfig,

    /// .NET toolchain settings
    pub toolchain: ToolchainConfig,

    /// Buildpack identity used in the build log
    pub buildpack: BuildpackConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Layer store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store root; defaults to the user cache directory
    pub root: Option<PathBuf>,
}

/// .NET toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// dotnet executable
    pub dotnet: String,

    /// Installation root, scanned for `sdk/<version>` directories
    pub dotnet_root: Option<PathBuf>,

    /// Installed SDK versions; overrides discovery when non-empty
    pub sdks: Vec<String>,

    /// Runtime identifier passed to `dotnet publish --runtime`
    pub runtime_identifier: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            dotnet: "dotnet".to_string(),
            dotnet_root: None,
            sdks: vec![],
            runtime_identifier: "linux-x64".to_string(),
        }
    }
}

/// Buildpack identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackConfig {
    pub name: String,
    pub version: String,
}

impl Default for BuildpackConfig {
    fn default() -> Self {
        Self {
            name: "Paketo Buildpack for .NET Publish".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
