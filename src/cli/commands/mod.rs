//! CLI command implementations

pub mod build;
pub mod clear;
pub mod config;
pub mod layers;
pub mod plan;

pub use build::execute as build;
pub use clear::execute as clear;
pub use config::execute as config;
pub use layers::execute as layers;
pub use plan::execute as plan;

use crate::build::BuildContext;
use crate::cli::args::ContextArgs;
use crate::config::options::process_vars;
use crate::config::{BuildOptions, Config};
use crate::error::{DotpubError, DotpubResult};
use crate::layer::BuildContextId;
use std::path::PathBuf;

/// Resolve `--source` and `--context` into a build context
pub(crate) fn resolve_context(
    target: &ContextArgs,
    config: &Config,
) -> DotpubResult<BuildContext> {
    let source = match &target.source {
        Some(path) => path.clone(),
        None => std::env::current_dir()
            .map_err(|e| DotpubError::io("getting current directory", e))?,
    };
    let source: PathBuf = source
        .canonicalize()
        .map_err(|e| DotpubError::io(format!("resolving {}", source.display()), e))?;

    let id = target.context.as_deref().map(BuildContextId::new).transpose()?;
    Ok(BuildContext::new(&source, id, config))
}

/// Build options from the process environment, overridden by `--env` pairs
pub(crate) fn resolve_options(
    env: &[(String, String)],
    no_env: bool,
) -> DotpubResult<BuildOptions> {
    let process = if no_env { vec![] } else { process_vars() };
    BuildOptions::from_env(process.into_iter().chain(env.iter().cloned()))
}
