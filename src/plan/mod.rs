//! Build planning
//!
//! Turns project metadata and declared build options into a [`BuildPlan`]:
//! which SDK to use, which configuration to publish, whether debugger
//! support is included, and the exact `dotnet publish` arguments. Planning
//! never touches the layer store.

pub mod project;
pub mod toolchain;

pub use project::{PackageReference, ProjectMetadata, TargetFramework};
pub use toolchain::{select_sdk, ToolchainInventory};

use crate::config::options::{BuildOptions, DEBUG_ENABLED, PUBLISH_FLAGS};
use crate::error::{DotpubError, DotpubResult};
use semver::Version;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// MSBuild configuration to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Configuration {
    Debug,
    Release,
    /// Any other configuration named through publish flags
    Custom(String),
}

impl Configuration {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "release" => Self::Release,
            _ => Self::Custom(value.to_string()),
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => f.write_str("Debug"),
            Self::Release => f.write_str("Release"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Paths and identifiers the plan publishes into
#[derive(Debug, Clone)]
pub struct PublishLayout {
    /// Source root of the build context
    pub source_root: PathBuf,
    /// Publish output directory (the publish-output layer payload)
    pub output_dir: PathBuf,
    /// Runtime identifier, e.g. `linux-x64`
    pub runtime_identifier: String,
}

/// Per-build configuration; transient, never persisted
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub configuration: Configuration,
    pub target_framework: TargetFramework,
    pub sdk_version: Version,
    /// Include the debug-support layer
    pub debug_support: bool,
    /// Directory containing the project file
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub runtime_identifier: String,
    /// Arguments after `dotnet`
    pub publish_args: Vec<String>,
}

impl BuildPlan {
    /// Human-readable toolchain invocation, as shown in the build log
    pub fn invocation(&self) -> String {
        format!("dotnet {}", self.publish_args.join(" "))
    }

    /// Arguments for the package restore step
    pub fn restore_args(&self) -> Vec<String> {
        vec![
            "restore".to_string(),
            self.project_dir.display().to_string(),
            "--runtime".to_string(),
            self.runtime_identifier.clone(),
        ]
    }
}

/// Derive the build plan.
///
/// `debug-enabled` forces `Debug` and adds debugger support; otherwise the
/// configuration is `Release`. Publish flags are appended verbatim after
/// the defaults, and any default the user already passed is left out, so a
/// conflicting `--configuration` is published as given and logged as a
/// warning.
pub fn plan(
    project: &ProjectMetadata,
    options: &BuildOptions,
    inventory: &ToolchainInventory,
    layout: &PublishLayout,
) -> DotpubResult<BuildPlan> {
    let target_framework = project.target_framework()?;
    let sdk_version = select_sdk(inventory, &target_framework)?;

    let user_flags = match &options.publish_flags {
        Some(flags) => split_flags(flags)?,
        None => vec![],
    };

    let user_configuration = flag_value(&user_flags, &["--configuration", "-c"]);
    let configuration = match (options.debug_enabled, user_configuration) {
        (true, Some(value)) => {
            let requested = Configuration::parse(&value);
            if requested != Configuration::Debug {
                warn!(
                    "{} forces Debug but publish flags request the {} configuration",
                    DEBUG_ENABLED, requested
                );
            }
            Configuration::Debug
        }
        (true, None) => Configuration::Debug,
        (false, Some(value)) => Configuration::parse(&value),
        (false, None) => Configuration::Release,
    };

    let project_dir = project
        .project_file
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| layout.source_root.clone());

    let mut args = vec!["publish".to_string(), project_dir.display().to_string()];
    if !has_flag(&user_flags, &["--configuration", "-c"]) {
        args.push("--configuration".to_string());
        args.push(configuration.to_string());
    }
    if !has_flag(&user_flags, &["--runtime", "-r"]) {
        args.push("--runtime".to_string());
        args.push(layout.runtime_identifier.clone());
    }
    if !has_flag(&user_flags, &["--self-contained", "--no-self-contained", "--sc"]) {
        args.push("--self-contained".to_string());
        args.push("false".to_string());
    }
    if !has_flag(&user_flags, &["--output", "-o"]) {
        args.push("--output".to_string());
        args.push(layout.output_dir.display().to_string());
    }
    args.extend(user_flags);

    let plan = BuildPlan {
        configuration,
        target_framework,
        sdk_version,
        debug_support: options.debug_enabled,
        project_dir,
        output_dir: layout.output_dir.clone(),
        runtime_identifier: layout.runtime_identifier.clone(),
        publish_args: args,
    };

    info!(
        "Planned {} build for {} with SDK {}",
        plan.configuration, plan.target_framework, plan.sdk_version
    );
    Ok(plan)
}

/// Whether any of `names` appears as `--name`, `--name=value` or `-n`
fn has_flag(flags: &[String], names: &[&str]) -> bool {
    flags.iter().any(|flag| {
        names.iter().any(|name| {
            flag == name
                || flag
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('=') || rest.starts_with(':'))
        })
    })
}

/// Value of the first occurrence of a flag, in either `--f v` or `--f=v` form
fn flag_value(flags: &[String], names: &[&str]) -> Option<String> {
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        for name in names {
            if flag == name {
                return iter.next().cloned();
            }
            if let Some(rest) = flag.strip_prefix(name) {
                if let Some(value) = rest.strip_prefix('=').or_else(|| rest.strip_prefix(':')) {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Split a flag string on whitespace; single or double quotes group words
pub fn split_flags(input: &str) -> DotpubResult<Vec<String>> {
    let mut words = vec![];
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(DotpubError::OptionInvalid {
            key: PUBLISH_FLAGS.to_string(),
            value: input.to_string(),
            reason: "unterminated quote".to_string(),
        });
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
