//! External build execution
//!
//! The actual compile and publish is performed by the .NET toolchain. This
//! module defines the seam the pipeline drives it through, plus the
//! cancellation signal every execution honors.

mod cancel;
mod dotnet;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use dotnet::DotnetCli;

use crate::error::DotpubResult;
use crate::layer::{DEBUG_SUPPORT, NUGET_CACHE, PUBLISH_OUTPUT};
use crate::plan::BuildPlan;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Max number of output lines to include in build error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Which layer a build step populates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionScope {
    /// `dotnet restore` into the package cache
    Restore { packages_dir: PathBuf },
    /// `dotnet publish` into the plan's output directory
    Publish { packages_dir: PathBuf },
    /// Debugger launch support files
    DebugSupport { layer_dir: PathBuf },
}

impl ExecutionScope {
    /// Name of the layer this scope writes
    pub fn layer(&self) -> &'static str {
        match self {
            Self::Restore { .. } => NUGET_CACHE,
            Self::Publish { .. } => PUBLISH_OUTPUT,
            Self::DebugSupport { .. } => DEBUG_SUPPORT,
        }
    }
}

/// Result of a successful build step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Command as shown in the build log
    pub command: String,
    /// Raw tool output, stdout and stderr interleaved
    pub lines: Vec<String>,
}

/// Performs the build step for one layer scope
///
/// Implementations must return `Cancelled` promptly once the token fires
/// and must not leave the layer half-committed; the store is only written
/// after `execute` returns `Ok`.
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    /// Run the step for `scope`
    async fn execute(
        &self,
        plan: &BuildPlan,
        scope: &ExecutionScope,
        cancel: &CancelToken,
    ) -> DotpubResult<ExecutionOutput>;

    /// Executor name for logs
    fn name(&self) -> &'static str;
}

/// Extract the useful tail of build output for error diagnostics.
pub(crate) fn build_error_output(lines: &[String]) -> String {
    let total = lines.len();
    let tail = if total > BUILD_ERROR_TAIL_LINES {
        &lines[total - BUILD_ERROR_TAIL_LINES..]
    } else {
        lines
    };
    tail.join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns all collected output lines.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(&str) + Send + Sync),
) -> Vec<String> {
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return vec![];
    };

    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(&line);
                        all_output.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(&line);
                        all_output.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
        }
    }

    all_output
}
