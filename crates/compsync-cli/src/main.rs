//! compsync CLI - Map Liquid component collections into themes
//!
//! Builds reference graphs for a theme and a component collection, decides
//! which snippet and asset files the collection owns, and keeps the theme's
//! files in line with that manifest.
//!
//! # Usage
//!
//! ```bash
//! # Record ownership for a collection checked out next to the theme
//! compsync map ../component-kit
//!
//! # Map, copy owned files and delete orphans in one go
//! compsync install ../component-kit --setup-files
//!
//! # Show what the manifest currently records
//! compsync status --json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use compsync_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod progress;

/// compsync - Component graph mapping for Liquid themes
#[derive(Parser, Debug)]
#[command(name = "compsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Theme root to operate on (defaults to the current directory)
    #[arg(long, short = 't', global = true, env = "COMPSYNC_THEME")]
    theme: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "COMPSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default .compsync/config.toml into the theme
    Init(commands::init::InitArgs),

    /// Reconcile the manifest against a collection
    Map(commands::map::MapArgs),

    /// Copy the files a collection owns into the theme
    Copy(commands::copy::CopyArgs),

    /// Delete theme snippets and assets nobody owns
    Clean(commands::clean::CleanArgs),

    /// Map, copy and clean in one run
    Install(commands::install::InstallArgs),

    /// Show the recorded collections and ownership counts
    Status(commands::status::StatusArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let context = match commands::Context::load(&cli.global) {
        Ok(context) => context,
        Err(err) => {
            init_logging(&cli.global, &LoggingConfig::default())?;
            return Err(err);
        }
    };
    init_logging(&cli.global, &context.config.logging)?;

    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &context),
        Commands::Map(args) => commands::map::execute(args, &context),
        Commands::Copy(args) => commands::copy::execute(args, &context),
        Commands::Clean(args) => commands::clean::execute(args, &context),
        Commands::Install(args) => commands::install::execute(args, &context),
        Commands::Status(args) => commands::status::execute(args, &context),
    }
}

/// Install the stderr subscriber.
///
/// `--quiet`/`--verbose` win over everything; otherwise `RUST_LOG` wins over
/// the configured level.
fn init_logging(global: &GlobalOptions, logging: &LoggingConfig) -> Result<()> {
    let filter = if global.quiet {
        EnvFilter::new("error")
    } else if global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?
    };

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()?,
    }

    Ok(())
}
