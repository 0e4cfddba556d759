//! Clear command - remove stored layers

use crate::cli::args::ClearArgs;
use crate::cli::commands::resolve_context;
use crate::config::Config;
use crate::error::{DotpubError, DotpubResult};
use console::style;

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> DotpubResult<()> {
    let ctx = resolve_context(&args.target, config)?;
    let store = ctx.store();

    match args.layer {
        Some(name) => {
            if !store.remove(&name).await? {
                return Err(DotpubError::LayerNotFound(name));
            }
            println!("{} Removed layer {}", style("✓").green(), name);
        }
        None => {
            let removed = store.clear().await?;
            println!(
                "{} Removed {} layer(s) from context {}",
                style("✓").green(),
                removed,
                ctx.id
            );
        }
    }

    Ok(())
}
