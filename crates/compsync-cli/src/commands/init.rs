//! Init command - Write a default theme-local configuration

use anyhow::{Context as _, Result};
use clap::Args;
use compsync_config::{ConfigLoader, SyncConfig};

use super::{display_relative, print_info, Context};

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration with the defaults
    #[arg(long, short = 'f')]
    pub force: bool,
}

/// Execute the init command
pub fn execute(args: InitArgs, ctx: &Context) -> Result<()> {
    let loader = ConfigLoader::new();
    let config_path = loader.local_config_path(&ctx.theme);

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            config_path.display()
        );
    }

    if args.force {
        loader
            .save_local(&ctx.theme, &SyncConfig::default())
            .context("Failed to write configuration")?;
    } else {
        loader
            .init_local(&ctx.theme)
            .context("Failed to initialize configuration")?;
    }

    print_info(
        &format!(
            "Wrote {}",
            display_relative(&config_path, &ctx.theme)
        ),
        ctx.quiet,
    );
    Ok(())
}
