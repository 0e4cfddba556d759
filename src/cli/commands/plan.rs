//! Plan command - show what a build would run

use crate::build::Builder;
use crate::cli::args::{OutputFormat, PlanArgs};
use crate::cli::commands::{resolve_context, resolve_options};
use crate::config::Config;
use crate::error::DotpubResult;
use crate::execute::DotnetCli;
use crate::plan::{BuildPlan, ToolchainInventory};
use crate::report::BuildReporter;
use console::style;
use serde_json::json;
use std::sync::Arc;

/// Execute the plan command
pub async fn execute(args: PlanArgs, config: &Config) -> DotpubResult<()> {
    let ctx = resolve_context(&args.target, config)?;
    let options = resolve_options(&args.env, args.no_env)?;

    let builder = Builder::new(
        Arc::new(DotnetCli::new(&config.toolchain)),
        ToolchainInventory::from_config(&config.toolchain).await?,
        BuildReporter::new(&config.buildpack),
    );
    let plan = builder.plan(&ctx, &options).await?;

    match args.format {
        OutputFormat::Plain => println!("{}", plan.invocation()),
        OutputFormat::Json => print_json(&plan)?,
        OutputFormat::Table => print_table(&plan),
    }
    Ok(())
}

fn print_table(plan: &BuildPlan) {
    let rows = [
        ("Target framework", plan.target_framework.to_string()),
        ("SDK version", plan.sdk_version.to_string()),
        ("Configuration", plan.configuration.to_string()),
        ("Debug support", plan.debug_support.to_string()),
        ("Runtime", plan.runtime_identifier.clone()),
        ("Output", plan.output_dir.display().to_string()),
    ];
    for (key, value) in rows {
        println!("{:<18} {}", style(key).bold(), value);
    }
    println!();
    println!("{}", plan.invocation());
}

fn print_json(plan: &BuildPlan) -> DotpubResult<()> {
    let value = json!({
        "target_framework": plan.target_framework.to_string(),
        "sdk_version": plan.sdk_version.to_string(),
        "configuration": plan.configuration.to_string(),
        "debug_support": plan.debug_support,
        "runtime_identifier": plan.runtime_identifier,
        "output_dir": plan.output_dir,
        "args": plan.publish_args,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
