//! Build command - build the application layers

use crate::build::Builder;
use crate::cli::args::BuildArgs;
use crate::cli::commands::{resolve_context, resolve_options};
use crate::config::Config;
use crate::error::DotpubResult;
use crate::execute::{cancel_pair, DotnetCli};
use crate::plan::ToolchainInventory;
use crate::report::BuildReporter;
use std::sync::Arc;
use tracing::{debug, warn};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> DotpubResult<()> {
    let ctx = resolve_context(&args.target, config)?;
    let options = resolve_options(&args.env, args.no_env)?;
    debug!(
        "Building {} (context {}, store {})",
        ctx.source_root.display(),
        ctx.id,
        ctx.store_root.display()
    );

    let builder = Builder::new(
        Arc::new(DotnetCli::new(&config.toolchain)),
        ToolchainInventory::from_config(&config.toolchain).await?,
        BuildReporter::new(&config.buildpack),
    );

    let (handle, token) = cancel_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling build");
            handle.cancel();
        }
    });

    let result = builder.build(&ctx, &options, &token).await;
    interrupt.abort();

    let outcome = result?;
    print!("{}", outcome.report);
    Ok(())
}
