//! Error types for dotpub
//!
//! All modules use `DotpubResult<T>` as their return type. Every build error
//! aborts the current build context; nothing in the core retries.

use crate::fingerprint::FingerprintKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dotpub operations
pub type DotpubResult<T> = Result<T, DotpubError>;

/// All errors that can occur in dotpub
#[derive(Error, Debug)]
pub enum DotpubError {
    // Fingerprint input errors
    #[error("Failed to read dependency manifest {path}: {reason}")]
    ManifestRead { path: PathBuf, reason: String },

    #[error("Failed to read source for {kind} fingerprint at {path}: {reason}")]
    SourceRead {
        kind: FingerprintKind,
        path: PathBuf,
        reason: String,
    },

    // Planning errors
    #[error("Unsupported target framework {framework}: {reason}")]
    UnsupportedFramework { framework: String, reason: String },

    // Layer store errors
    #[error("Layer store error for layer '{layer}': {reason}")]
    StoreIo { layer: String, reason: String },

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Invalid layer name '{name}': {reason}")]
    InvalidLayerName { name: String, reason: String },

    #[error("Invalid build context id '{id}': {reason}")]
    InvalidContext { id: String, reason: String },

    // Execution errors
    #[error("Build step for layer '{layer}' failed: {command}\n{output}")]
    ExecutionFailure {
        layer: String,
        command: String,
        output: String,
    },

    #[error("Build step for layer '{layer}' was cancelled")]
    Cancelled { layer: String },

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid build option {key}={value}: {reason}")]
    OptionInvalid {
        key: String,
        value: String,
        reason: String,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

impl DotpubError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a store error for a layer
    pub fn store(layer: impl Into<String>, reason: impl ToString) -> Self {
        Self::StoreIo {
            layer: layer.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a manifest read error
    pub fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ManifestRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an unsupported framework error
    pub fn unsupported(framework: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedFramework {
            framework: framework.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error comes from reading fingerprint inputs
    pub fn is_read_error(&self) -> bool {
        matches!(self, Self::ManifestRead { .. } | Self::SourceRead { .. })
    }

    /// The layer this error concerns, if any
    pub fn layer(&self) -> Option<&str> {
        match self {
            Self::StoreIo { layer, .. }
            | Self::ExecutionFailure { layer, .. }
            | Self::Cancelled { layer } => Some(layer),
            Self::LayerNotFound(name) => Some(name),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestRead { .. } => {
                Some("Check that the project file exists, or set BP_DOTNET_PROJECT_PATH")
            }
            Self::UnsupportedFramework { .. } => {
                Some("Install a matching .NET SDK or change the project's TargetFramework")
            }
            Self::StoreIo { .. } => Some("Run: dotpub clear to reset the layer cache"),
            Self::CommandFailed { .. } => Some("Make sure the dotnet CLI is on PATH"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DotpubError::unsupported("net9.0", "no compatible SDK installed");
        assert!(err.to_string().contains("net9.0"));
        assert!(err.to_string().contains("no compatible SDK"));
    }

    #[test]
    fn error_hint() {
        let err = DotpubError::manifest("/workspace/app.csproj", "missing");
        assert!(err.hint().unwrap().contains("BP_DOTNET_PROJECT_PATH"));
        assert_eq!(DotpubError::User("x".into()).hint(), None);
    }

    #[test]
    fn error_layer_context() {
        let err = DotpubError::store("nuget-cache", "disk full");
        assert_eq!(err.layer(), Some("nuget-cache"));
        assert!(err.to_string().contains("nuget-cache"));

        let err = DotpubError::Cancelled {
            layer: "publish-output".into(),
        };
        assert_eq!(err.layer(), Some("publish-output"));
    }

    #[test]
    fn read_error_family() {
        assert!(DotpubError::manifest("a.csproj", "gone").is_read_error());
        let err = DotpubError::SourceRead {
            kind: FingerprintKind::FullSource,
            path: "Startup.cs".into(),
            reason: "denied".into(),
        };
        assert!(err.is_read_error());
        assert!(err.to_string().contains("full-source"));
        assert!(!DotpubError::store("x", "y").is_read_error());
    }
}
