//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dotpub - layer-caching build core for .NET publish
///
/// Fingerprints a .NET project, reuses cached layers whose inputs are
/// unchanged, and runs `dotnet publish` for the rest.
#[derive(Parser, Debug)]
#[command(name = "dotpub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DOTPUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local dotpub.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the application layers, reusing cached ones
    Build(BuildArgs),

    /// Show the build plan without building
    Plan(PlanArgs),

    /// List stored layers for a build context
    Layers(LayersArgs),

    /// Remove stored layers
    Clear(ClearArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Source directory and build context selection
#[derive(Parser, Debug, Clone)]
pub struct ContextArgs {
    /// Application source directory (defaults to current directory)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Build context id (derived from the source path if not provided)
    #[arg(long)]
    pub context: Option<String>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: ContextArgs,

    /// Build options (KEY=VALUE), e.g. BP_DEBUG_ENABLED=true
    #[arg(short, long, value_parser = parse_env_var)]
    pub env: Vec<(String, String)>,

    /// Ignore BP_* variables from the process environment
    #[arg(long)]
    pub no_env: bool,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: ContextArgs,

    /// Build options (KEY=VALUE)
    #[arg(short, long, value_parser = parse_env_var)]
    pub env: Vec<(String, String)>,

    /// Ignore BP_* variables from the process environment
    #[arg(long)]
    pub no_env: bool,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the layers command
#[derive(Parser, Debug)]
pub struct LayersArgs {
    #[command(flatten)]
    pub target: ContextArgs,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    #[command(flatten)]
    pub target: ContextArgs,

    /// Only remove this layer
    #[arg(short, long)]
    pub layer: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Parse environment variable in KEY=VALUE format
fn parse_env_var(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE format: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_var_valid() {
        let (k, v) = parse_env_var("BP_DEBUG_ENABLED=true").unwrap();
        assert_eq!(k, "BP_DEBUG_ENABLED");
        assert_eq!(v, "true");
    }

    #[test]
    fn parse_env_var_with_equals() {
        let (k, v) = parse_env_var("BP_DOTNET_PUBLISH_FLAGS=--verbosity=normal").unwrap();
        assert_eq!(k, "BP_DOTNET_PUBLISH_FLAGS");
        assert_eq!(v, "--verbosity=normal");
    }

    #[test]
    fn parse_env_var_invalid() {
        assert!(parse_env_var("BP_DEBUG_ENABLED").is_err());
    }

    #[test]
    fn cli_parses_build() {
        let cli = Cli::parse_from([
            "dotpub",
            "build",
            "--source",
            "app",
            "-e",
            "BP_DEBUG_ENABLED=true",
            "--env",
            "BP_LOG_LEVEL=DEBUG",
        ]);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.target.source, Some(PathBuf::from("app")));
                assert_eq!(args.env.len(), 2);
                assert!(!args.no_env);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn cli_parses_layers() {
        let cli = Cli::parse_from(["dotpub", "layers", "--context", "api", "--format", "json"]);
        match cli.command {
            Commands::Layers(args) => {
                assert_eq!(args.target.context.as_deref(), Some("api"));
                assert!(matches!(args.format, OutputFormat::Json));
            }
            _ => panic!("expected Layers command"),
        }
    }

    #[test]
    fn cli_parses_clear_layer() {
        let cli = Cli::parse_from(["dotpub", "clear", "--layer", "nuget-cache"]);
        match cli.command {
            Commands::Clear(args) => assert_eq!(args.layer.as_deref(), Some("nuget-cache")),
            _ => panic!("expected Clear command"),
        }
    }

    #[test]
    fn cli_global_flags() {
        let cli = Cli::parse_from(["dotpub", "plan", "-vv", "--no-local"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_local);
        assert!(matches!(cli.command, Commands::Plan(_)));
    }

    #[test]
    fn cli_parses_config() {
        let cli = Cli::parse_from(["dotpub", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(args) => {
                assert!(matches!(args.action, Some(ConfigAction::Init { force: true })));
            }
            _ => panic!("expected Config command"),
        }
    }
}
