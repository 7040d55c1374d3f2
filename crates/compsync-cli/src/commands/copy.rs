//! Copy command - Copy the files a collection owns into the theme

use anyhow::{Context as _, Result};
use clap::Args;
use compsync_core::{
    plan_copy, CollectionMeta, ComponentGraph, CopyOptions, GraphScanner, Manifest, SyncReport,
};

use super::{print_report, run_plan, Context};

/// Arguments for the copy command
#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Collection directory, or a name registered under [collections]
    pub collection: String,

    /// Also copy the setup files of owned components
    #[arg(long)]
    pub setup_files: bool,

    /// Show what would be copied without writing
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the copy command
pub fn execute(args: CopyArgs, ctx: &Context) -> Result<()> {
    let target = ctx.resolve_collection(&args.collection)?;
    let meta = CollectionMeta::from_dir(&target.path)?;
    let manifest = ctx.load_manifest()?;

    if !manifest.has_collection(&meta.name) {
        anyhow::bail!(
            "Collection '{}' is not in the manifest; run `compsync map` first",
            meta.name
        );
    }

    let graph = ComponentGraph::from_nodes(
        GraphScanner::new(ctx.scan_config())
            .scan_collection(&target.path)
            .with_context(|| format!("Failed to scan {}", target.path.display()))?,
    );

    let quiet = ctx.quiet || args.json;
    let report = copy_owned(
        &manifest,
        &graph,
        &meta.name,
        args.setup_files,
        args.dry_run,
        quiet,
        ctx,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !ctx.quiet {
        print_report(&report, &ctx.theme, args.dry_run);
    }
    Ok(())
}

/// Plan and apply the copies for `collection_name`.
pub fn copy_owned(
    manifest: &Manifest,
    graph: &ComponentGraph,
    collection_name: &str,
    include_setup: bool,
    dry_run: bool,
    quiet: bool,
    ctx: &Context,
) -> Result<SyncReport> {
    let plan = plan_copy(
        manifest,
        graph,
        collection_name,
        &ctx.theme,
        &CopyOptions { include_setup },
    );
    run_plan(&plan, dry_run, "Copying", quiet)
}
