//! `dotnet` CLI executor

use super::{
    build_error_output, stream_child_output, BuildExecutor, CancelToken, ExecutionOutput,
    ExecutionScope,
};
use crate::config::schema::ToolchainConfig;
use crate::error::{DotpubError, DotpubResult};
use crate::layer::DEBUG_SUPPORT;
use crate::plan::BuildPlan;
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Debugger launch settings written into the debug-support layer
pub const LAUNCH_SETTINGS_FILE: &str = "launch.json";

/// Runs restore and publish through the installed `dotnet` CLI
#[derive(Debug, Clone)]
pub struct DotnetCli {
    dotnet: String,
    dotnet_root: Option<PathBuf>,
}

impl DotnetCli {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            dotnet: config.dotnet.clone(),
            dotnet_root: config.dotnet_root.clone(),
        }
    }

    async fn run(
        &self,
        layer: &str,
        args: &[String],
        packages_dir: &Path,
        cancel: &CancelToken,
    ) -> DotpubResult<ExecutionOutput> {
        let command = format!("{} {}", self.dotnet, args.join(" "));
        if cancel.is_cancelled() {
            return Err(DotpubError::Cancelled {
                layer: layer.to_string(),
            });
        }

        info!("Running '{}'", command);
        let mut cmd = Command::new(&self.dotnet);
        cmd.args(args)
            .env("NUGET_PACKAGES", packages_dir)
            .env("DOTNET_CLI_TELEMETRY_OPTOUT", "1")
            .env("DOTNET_NOLOGO", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(root) = &self.dotnet_root {
            cmd.env("DOTNET_ROOT", root);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| DotpubError::command_failed(command.clone(), e))?;

        let on_output = |line: &str| debug!("{}", line);
        let streamed = tokio::select! {
            lines = stream_child_output(&mut child, &on_output) => Some(lines),
            _ = cancel.cancelled() => None,
        };

        let Some(lines) = streamed else {
            let _ = child.kill().await;
            info!("Cancelled '{}'", command);
            return Err(DotpubError::Cancelled {
                layer: layer.to_string(),
            });
        };

        let status = child
            .wait()
            .await
            .map_err(|e| DotpubError::command_failed(command.clone(), e))?;

        if !status.success() {
            return Err(DotpubError::ExecutionFailure {
                layer: layer.to_string(),
                command,
                output: build_error_output(&lines),
            });
        }

        Ok(ExecutionOutput { command, lines })
    }
}

#[async_trait]
impl BuildExecutor for DotnetCli {
    async fn execute(
        &self,
        plan: &BuildPlan,
        scope: &ExecutionScope,
        cancel: &CancelToken,
    ) -> DotpubResult<ExecutionOutput> {
        match scope {
            ExecutionScope::Restore { packages_dir } => {
                self.run(scope.layer(), &plan.restore_args(), packages_dir, cancel)
                    .await
            }
            ExecutionScope::Publish { packages_dir } => {
                self.run(scope.layer(), &plan.publish_args, packages_dir, cancel)
                    .await
            }
            ExecutionScope::DebugSupport { layer_dir } => {
                write_debug_support(plan, layer_dir).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "dotnet"
    }
}

/// Write debugger launch settings and the launch-time environment
pub(crate) async fn write_debug_support(
    plan: &BuildPlan,
    layer_dir: &Path,
) -> DotpubResult<ExecutionOutput> {
    let store_err = |e: std::io::Error| DotpubError::store(DEBUG_SUPPORT, e);

    let env_dir = layer_dir.join("env.launch");
    tokio::fs::create_dir_all(&env_dir).await.map_err(store_err)?;

    let settings = json!({
        "version": "0.2.0",
        "configurations": [{
            "name": ".NET Core Attach",
            "type": "coreclr",
            "request": "attach",
            "processName": "dotnet",
            "justMyCode": false,
            "sourceFileMap": {
                "/workspace": plan.project_dir.display().to_string(),
            },
            "pipeTransport": {
                "pipeProgram": "sh",
                "pipeArgs": ["-c"],
                "debuggerPath": "vsdbg",
            },
        }],
        "targetFramework": plan.target_framework.to_string(),
        "sdkVersion": plan.sdk_version.to_string(),
    });

    let path = layer_dir.join(LAUNCH_SETTINGS_FILE);
    tokio::fs::write(&path, serde_json::to_string_pretty(&settings)?)
        .await
        .map_err(store_err)?;
    tokio::fs::write(env_dir.join("ASPNETCORE_ENVIRONMENT.default"), "Development")
        .await
        .map_err(store_err)?;

    debug!("Wrote debugger settings to {}", path.display());
    Ok(ExecutionOutput {
        command: format!("write {}", LAUNCH_SETTINGS_FILE),
        lines: vec![],
    })
}
