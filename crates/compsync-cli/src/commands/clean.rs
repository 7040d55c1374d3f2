//! Clean command - Delete theme snippets and assets the manifest does not list

use anyhow::{Context as _, Result};
use clap::Args;
use compsync_core::{plan_clean, ComponentGraph, GraphScanner, Manifest, SyncReport};

use super::{print_report, run_plan, Context};

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Show what would be deleted without deleting
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the clean command
pub fn execute(args: CleanArgs, ctx: &Context) -> Result<()> {
    let manifest_path = ctx.manifest_path();
    // Without a manifest every snippet would count as unowned.
    if !manifest_path.exists() {
        anyhow::bail!(
            "No manifest at {}; run `compsync map` first",
            manifest_path.display()
        );
    }

    let manifest = ctx.load_manifest()?;
    let theme = ComponentGraph::from_nodes(
        GraphScanner::new(ctx.scan_config())
            .scan_theme(&ctx.theme)
            .with_context(|| format!("Failed to scan {}", ctx.theme.display()))?,
    );

    let quiet = ctx.quiet || args.json;
    let report = clean_unowned(&manifest, &theme, args.dry_run, quiet)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !ctx.quiet {
        print_report(&report, &ctx.theme, args.dry_run);
    }
    Ok(())
}

/// Plan and apply deletions of unowned theme files.
pub fn clean_unowned(
    manifest: &Manifest,
    theme: &ComponentGraph,
    dry_run: bool,
    quiet: bool,
) -> Result<SyncReport> {
    let plan = plan_clean(manifest, theme);
    run_plan(&plan, dry_run, "Cleaning", quiet)
}
