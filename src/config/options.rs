//! Build options read from `BP_*` environment variables

use crate::error::{DotpubError, DotpubResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Extra flags appended to `dotnet publish`
pub const PUBLISH_FLAGS: &str = "BP_DOTNET_PUBLISH_FLAGS";
/// Force a Debug build with debugger support
pub const DEBUG_ENABLED: &str = "BP_DEBUG_ENABLED";
/// Reporter verbosity
pub const LOG_LEVEL: &str = "BP_LOG_LEVEL";
/// Emit tool output as one block
pub const DISABLE_OUTPUT_SLICING: &str = "BP_DOTNET_DISABLE_BUILDPACK_OUTPUT_SLICING";
/// Project directory relative to the source root
pub const PROJECT_PATH: &str = "BP_DOTNET_PROJECT_PATH";

/// Only variables with this prefix are build options
const OPTION_PREFIX: &str = "BP_";

/// Reporter verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            _ => Err("expected INFO or DEBUG".to_string()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Debug => write!(f, "DEBUG"),
        }
    }
}

/// Declared build options for one build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Raw `BP_DOTNET_PUBLISH_FLAGS` value
    pub publish_flags: Option<String>,
    pub debug_enabled: bool,
    pub log_level: LogLevel,
    pub disable_output_slicing: bool,
    /// Project directory relative to the source root
    pub project_path: Option<PathBuf>,
    /// Every `BP_*` variable, sorted by key
    declared: BTreeMap<String, String>,
}

impl BuildOptions {
    /// Build options from environment-style key/value pairs.
    ///
    /// The pairs may come from an unordered map; they are sorted here so
    /// anything rendered from them is stable.
    pub fn from_env<I, K, V>(vars: I) -> DotpubResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let declared: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(OPTION_PREFIX))
            .collect();

        let non_empty = |key: &str| {
            declared
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let log_level = match declared.get(LOG_LEVEL) {
            Some(v) => v.parse().map_err(|reason| DotpubError::OptionInvalid {
                key: LOG_LEVEL.to_string(),
                value: v.clone(),
                reason,
            })?,
            None => LogLevel::Info,
        };

        Ok(Self {
            publish_flags: non_empty(PUBLISH_FLAGS),
            debug_enabled: parse_bool(&declared, DEBUG_ENABLED)?,
            log_level,
            disable_output_slicing: parse_bool(&declared, DISABLE_OUTPUT_SLICING)?,
            project_path: non_empty(PROJECT_PATH).map(PathBuf::from),
            declared,
        })
    }

    /// Read options from the process environment
    pub fn from_process_env() -> DotpubResult<Self> {
        Self::from_env(process_vars())
    }

    /// Declared `BP_*` options in canonical (lexicographic) order
    pub fn declared(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declared.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// `BP_*` variables of the process environment.
///
/// Unrelated variables are never decoded, so a non-UTF-8 value elsewhere in
/// the environment is ignored. A `BP_*` value that is not UTF-8 is decoded
/// lossily.
pub fn process_vars() -> Vec<(String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| {
            let key = key.to_str()?.to_string();
            if !key.starts_with(OPTION_PREFIX) {
                return None;
            }
            let value = match value.into_string() {
                Ok(v) => v,
                Err(raw) => {
                    warn!(key = %key, "Build option value is not valid UTF-8");
                    raw.to_string_lossy().into_owned()
                }
            };
            Some((key, value))
        })
        .collect()
}

fn parse_bool(vars: &BTreeMap<String, String>, key: &str) -> DotpubResult<bool> {
    let Some(value) = vars.get(key) else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        _ => Err(DotpubError::OptionInvalid {
            key: key.to_string(),
            value: value.clone(),
            reason: "expected true or false".to_string(),
        }),
    }
}
