//! Map command - Reconcile the manifest against a collection

use anyhow::{Context as _, Result};
use clap::Args;
use compsync_core::{
    map_collection, CollectionMeta, MapOptions, MapOutcome, Owner, PolicyWarning,
};
use serde::Serialize;

use super::{print_info, Context, PolicyArgs};
use crate::progress::{finish_spinner, finish_spinner_error, finish_spinner_warn, spinner};

/// Arguments for the map command
#[derive(Args, Debug)]
pub struct MapArgs {
    /// Collection directory, or a name registered under [collections]
    pub collection: String,

    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Compute the manifest without writing it
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Summary of a map run
#[derive(Debug, Serialize)]
pub struct MapSummary<'a> {
    pub collection: &'a CollectionMeta,
    pub manifest: String,
    pub dry_run: bool,
    /// Snippets owned by the collection
    pub snippets: usize,
    /// Assets owned by the collection
    pub assets: usize,
    pub warnings: &'a [PolicyWarning],
}

impl<'a> MapSummary<'a> {
    pub fn new(outcome: &'a MapOutcome, ctx: &Context, dry_run: bool) -> Self {
        let owner = Owner::collection(outcome.collection.name.clone());
        Self {
            collection: &outcome.collection,
            manifest: ctx.manifest_path().display().to_string(),
            dry_run,
            snippets: outcome.manifest.files.snippets.owned_by(&owner).count(),
            assets: outcome.manifest.files.assets.owned_by(&owner).count(),
            warnings: &outcome.warnings,
        }
    }
}

/// Execute the map command
pub fn execute(args: MapArgs, ctx: &Context) -> Result<()> {
    let quiet = ctx.quiet || args.json;
    let outcome = run(&args.collection, &args.policy, args.dry_run, quiet, ctx)?;
    let summary = MapSummary::new(&outcome, ctx, args.dry_run);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if args.dry_run {
        print_info("Dry run: manifest not written", ctx.quiet);
    }
    Ok(())
}

/// Map a collection argument, reporting progress on a spinner.
pub fn run(
    collection: &str,
    policy: &PolicyArgs,
    dry_run: bool,
    quiet: bool,
    ctx: &Context,
) -> Result<MapOutcome> {
    let target = ctx.resolve_collection(collection)?;
    let options = MapOptions {
        policy: ctx.policy(policy, target.key.as_deref()),
        manifest_path: ctx.manifest_path(),
        scan: ctx.scan_config(),
        dry_run,
    };

    let pb = spinner(&format!("Mapping {}...", target.path.display()), quiet);
    let outcome = match map_collection(&ctx.theme, &target.path, &options) {
        Ok(outcome) => outcome,
        Err(err) => {
            finish_spinner_error(pb, "Map failed");
            return Err(err)
                .with_context(|| format!("Failed to map {}", target.path.display()));
        }
    };

    let summary = MapSummary::new(&outcome, ctx, dry_run);
    let message = format!(
        "Mapped '{}' {}: {} snippets, {} assets",
        outcome.collection.name, outcome.collection.version, summary.snippets, summary.assets
    );
    if outcome.warnings.is_empty() {
        finish_spinner(pb, &message);
    } else {
        finish_spinner_warn(
            pb,
            &format!("{} ({} warnings)", message, outcome.warnings.len()),
        );
    }

    Ok(outcome)
}
