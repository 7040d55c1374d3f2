//! Install command - Map, copy and clean in one run

use anyhow::Result;
use clap::Args;
use compsync_core::SyncReport;
use serde::Serialize;

use super::clean::clean_unowned;
use super::copy::copy_owned;
use super::map::{self, MapSummary};
use super::{print_report, Context, PolicyArgs};

/// Arguments for the install command
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Collection directory, or a name registered under [collections]
    pub collection: String,

    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Also copy the setup files of owned components
    #[arg(long)]
    pub setup_files: bool,

    /// Show what would change without touching the theme or the manifest
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct InstallResult<'a> {
    map: MapSummary<'a>,
    copy: SyncReport,
    clean: SyncReport,
}

/// Execute the install command
pub fn execute(args: InstallArgs, ctx: &Context) -> Result<()> {
    let quiet = ctx.quiet || args.json;
    let outcome = map::run(&args.collection, &args.policy, args.dry_run, quiet, ctx)?;

    let copy = copy_owned(
        &outcome.manifest,
        &outcome.collection_graph,
        &outcome.collection.name,
        args.setup_files,
        args.dry_run,
        quiet,
        ctx,
    )?;
    // Files just copied are owned, so the pre-copy theme graph is enough here.
    let clean = clean_unowned(&outcome.manifest, &outcome.theme, args.dry_run, quiet)?;

    if args.json {
        let result = InstallResult {
            map: MapSummary::new(&outcome, ctx, args.dry_run),
            copy,
            clean,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if !ctx.quiet {
        print_report(&copy, &ctx.theme, args.dry_run);
        print_report(&clean, &ctx.theme, args.dry_run);
    }
    Ok(())
}
