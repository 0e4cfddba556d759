//! Layers command - list stored layers

use crate::cli::args::{LayersArgs, OutputFormat};
use crate::cli::commands::resolve_context;
use crate::config::Config;
use crate::error::DotpubResult;
use crate::layer::Layer;
use console::style;
use serde_json::json;

/// Execute the layers command
pub async fn execute(args: LayersArgs, config: &Config) -> DotpubResult<()> {
    let ctx = resolve_context(&args.target, config)?;
    let layers = ctx.store().list().await?;

    if layers.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No layers stored for context {}", ctx.id),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&layers),
        OutputFormat::Json => print_json(&layers)?,
        OutputFormat::Plain => print_plain(&layers),
    }

    Ok(())
}

fn print_table(layers: &[Layer]) {
    println!(
        "{:<16} {:<14} {:<14} {:<8} {:<18}",
        style("LAYER").bold(),
        style("DOMAIN").bold(),
        style("FINGERPRINT").bold(),
        style("TYPES").bold(),
        style("UPDATED").bold()
    );
    println!("{}", "-".repeat(74));

    for layer in layers {
        let types = [
            (layer.flags.launch, "l"),
            (layer.flags.build, "b"),
            (layer.flags.cache, "c"),
        ]
        .iter()
        .map(|(on, flag)| if *on { *flag } else { "-" })
        .collect::<String>();

        println!(
            "{:<16} {:<14} {:<14} {:<8} {:<18}",
            layer.name,
            layer.fingerprint_kind.to_string(),
            layer.fingerprint.short(),
            types,
            layer.updated_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("{} layer(s)", layers.len());
}

fn print_json(layers: &[Layer]) -> DotpubResult<()> {
    let values: Vec<_> = layers
        .iter()
        .map(|layer| {
            json!({
                "name": layer.name,
                "types": layer.flags,
                "fingerprint": layer.fingerprint,
                "fingerprint_kind": layer.fingerprint_kind,
                "payload": layer.payload,
                "created_at": layer.created_at,
                "updated_at": layer.updated_at,
                "metadata": layer.extra,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

fn print_plain(layers: &[Layer]) {
    for layer in layers {
        println!("{}", layer.name);
    }
}
