//! Installed .NET SDK inventory and version selection

use crate::config::schema::ToolchainConfig;
use crate::error::{DotpubError, DotpubResult};
use crate::plan::project::TargetFramework;
use semver::Version;
use std::path::{Path, PathBuf};
use tracing::debug;

/// SDK versions available to this build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainInventory {
    sdks: Vec<Version>,
}

impl ToolchainInventory {
    pub fn new(mut sdks: Vec<Version>) -> Self {
        sdks.sort();
        sdks.dedup();
        Self { sdks }
    }

    /// Parse version strings (e.g. from config)
    pub fn from_strings<I, S>(versions: I) -> DotpubResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sdks = versions
            .into_iter()
            .map(|v| {
                let v = v.as_ref();
                Version::parse(v.trim())
                    .map_err(|e| DotpubError::User(format!("Invalid SDK version '{}': {}", v, e)))
            })
            .collect::<DotpubResult<Vec<_>>>()?;
        Ok(Self::new(sdks))
    }

    /// Discover SDKs from `<dotnet_root>/sdk/<version>` directories
    pub async fn discover(dotnet_root: &Path) -> DotpubResult<Self> {
        let sdk_dir = dotnet_root.join("sdk");
        let mut entries = match tokio::fs::read_dir(&sdk_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No SDK directory at {}", sdk_dir.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(DotpubError::io(format!("reading {}", sdk_dir.display()), e)),
        };

        let mut sdks = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DotpubError::io("reading SDK entry", e))?
        {
            if !entry.path().is_dir() {
                continue;
            }
            // Non-version directories (NuGetFallbackFolder) are skipped
            if let Some(version) = entry
                .file_name()
                .to_str()
                .and_then(|name| Version::parse(name).ok())
            {
                sdks.push(version);
            }
        }

        debug!("Discovered {} SDK(s) under {}", sdks.len(), sdk_dir.display());
        Ok(Self::new(sdks))
    }

    /// Inventory from config: explicit list, else discovery under the
    /// configured root or `DOTNET_ROOT`
    pub async fn from_config(config: &ToolchainConfig) -> DotpubResult<Self> {
        if !config.sdks.is_empty() {
            return Self::from_strings(&config.sdks);
        }

        let root = config
            .dotnet_root
            .clone()
            .or_else(|| std::env::var_os("DOTNET_ROOT").map(PathBuf::from));
        match root {
            Some(root) => Self::discover(&root).await,
            None => Ok(Self::default()),
        }
    }

    /// Installed versions, ascending
    pub fn sdks(&self) -> &[Version] {
        &self.sdks
    }
}

/// Pick the SDK for a target framework.
///
/// Prefers an SDK whose major.minor equals the framework's (newest patch
/// wins), else the newest SDK of the same major with a higher minor.
pub fn select_sdk(
    inventory: &ToolchainInventory,
    framework: &TargetFramework,
) -> DotpubResult<Version> {
    let wanted = framework.version();

    let exact = inventory
        .sdks()
        .iter()
        .filter(|v| v.major == wanted.major && v.minor == wanted.minor)
        .max();
    if let Some(version) = exact {
        return Ok(version.clone());
    }

    let compatible = inventory
        .sdks()
        .iter()
        .filter(|v| v.major == wanted.major && v.minor > wanted.minor)
        .max();
    if let Some(version) = compatible {
        debug!("No exact SDK for {}, using compatible {}", framework, version);
        return Ok(version.clone());
    }

    let installed = if inventory.sdks().is_empty() {
        "none".to_string()
    } else {
        inventory
            .sdks()
            .iter()
            .map(Version::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    Err(DotpubError::unsupported(
        framework.moniker(),
        format!(
            "no compatible .NET SDK {}.{}.x installed (installed: {})",
            wanted.major, wanted.minor, installed
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn inventory(versions: &[&str]) -> ToolchainInventory {
        ToolchainInventory::from_strings(versions).unwrap()
    }

    fn tf(s: &str) -> TargetFramework {
        s.parse().unwrap()
    }

    #[test]
    fn exact_match_prefers_newest_patch() {
        let inv = inventory(&["6.0.100", "6.0.408", "7.0.100", "3.1.426"]);
        assert_eq!(select_sdk(&inv, &tf("net6.0")).unwrap(), Version::parse("6.0.408").unwrap());
        assert_eq!(
            select_sdk(&inv, &tf("netcoreapp3.1")).unwrap(),
            Version::parse("3.1.426").unwrap()
        );
    }

    #[test]
    fn falls_back_to_newest_compatible_minor() {
        let inv = inventory(&["3.0.103", "3.1.200", "3.1.426"]);
        // no 3.2 installed: 3.1 is lower, so nothing compatible for 3.2
        assert!(select_sdk(&inv, &tf("netcoreapp3.2")).is_err());

        let inv = inventory(&["2.2.100", "2.1.800"]);
        assert_eq!(
            select_sdk(&inv, &tf("netcoreapp2.0")).unwrap(),
            Version::parse("2.2.100").unwrap()
        );
    }

    #[test]
    fn no_compatible_sdk() {
        let inv = inventory(&["3.1.426"]);
        let err = select_sdk(&inv, &tf("net6.0")).unwrap_err();
        assert!(matches!(err, DotpubError::UnsupportedFramework { .. }));
        assert!(err.to_string().contains("3.1.426"));

        let err = select_sdk(&ToolchainInventory::default(), &tf("net6.0")).unwrap_err();
        assert!(err.to_string().contains("installed: none"));
    }

    #[test]
    fn invalid_version_string() {
        assert!(ToolchainInventory::from_strings(["6.0"]).is_err());
    }

    #[tokio::test]
    async fn discover_sdk_directories() {
        let dir = TempDir::new().unwrap();
        for name in ["6.0.100", "3.1.426", "NuGetFallbackFolder"] {
            std::fs::create_dir_all(dir.path().join("sdk").join(name)).unwrap();
        }

        let inv = ToolchainInventory::discover(dir.path()).await.unwrap();
        assert_eq!(
            inv.sdks(),
            &[Version::parse("3.1.426").unwrap(), Version::parse("6.0.100").unwrap()]
        );
    }

    #[tokio::test]
    async fn discover_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let inv = ToolchainInventory::discover(&dir.path().join("nope")).await.unwrap();
        assert!(inv.sdks().is_empty());
    }
}
