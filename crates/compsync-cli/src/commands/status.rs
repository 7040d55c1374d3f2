//! Status command - Show the recorded collections and ownership counts

use anyhow::Result;
use clap::Args;
use compsync_core::{Manifest, Owner};
use serde::Serialize;

use super::{display_relative, Context};

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Snapshot of a theme's manifest
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub theme: String,
    pub manifest: String,
    pub manifest_exists: bool,
    pub collections: Vec<CollectionStatus>,
    /// Files kept by the theme itself
    pub theme_owned: OwnedCounts,
}

#[derive(Debug, Serialize)]
pub struct CollectionStatus {
    pub name: String,
    pub version: String,
    pub commit: String,
    #[serde(flatten)]
    pub owned: OwnedCounts,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnedCounts {
    pub snippets: usize,
    pub assets: usize,
}

impl OwnedCounts {
    fn of(manifest: &Manifest, owner: &Owner) -> Self {
        Self {
            snippets: manifest.files.snippets.owned_by(owner).count(),
            assets: manifest.files.assets.owned_by(owner).count(),
        }
    }
}

impl StatusReport {
    fn build(ctx: &Context, manifest: &Manifest) -> Self {
        let manifest_path = ctx.manifest_path();
        let collections = manifest
            .collections
            .iter()
            .map(|(name, record)| CollectionStatus {
                name: name.clone(),
                version: record.version.clone(),
                commit: record.commit.clone(),
                owned: OwnedCounts::of(manifest, &Owner::collection(name.clone())),
            })
            .collect();

        Self {
            theme: ctx.theme.display().to_string(),
            manifest: manifest_path.display().to_string(),
            manifest_exists: manifest_path.exists(),
            collections,
            theme_owned: OwnedCounts::of(manifest, &Owner::Theme),
        }
    }
}

/// Execute the status command
pub fn execute(args: StatusArgs, ctx: &Context) -> Result<()> {
    let manifest = ctx.load_manifest()?;
    let report = StatusReport::build(ctx, &manifest);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Theme:    {}", report.theme);
    if !report.manifest_exists {
        println!("Manifest: none (run `compsync map <collection>`)");
        return Ok(());
    }
    println!(
        "Manifest: {}",
        display_relative(&ctx.manifest_path(), &ctx.theme)
    );

    println!("\nCollections:");
    if report.collections.is_empty() {
        println!("  (none)");
    }
    for collection in &report.collections {
        let commit = if collection.commit.is_empty() {
            "-"
        } else {
            &collection.commit[..collection.commit.len().min(12)]
        };
        println!(
            "  {} {} ({}): {} snippets, {} assets",
            collection.name,
            collection.version,
            commit,
            collection.owned.snippets,
            collection.owned.assets
        );
    }
    println!(
        "\nTheme-owned: {} snippets, {} assets",
        report.theme_owned.snippets, report.theme_owned.assets
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use compsync_config::SyncConfig;
    use compsync_core::{CollectionRecord, ThemeFolder};
    use std::path::PathBuf;

    #[test]
    fn test_status_counts_per_owner() {
        let mut manifest = Manifest::default();
        manifest.collections.insert(
            "kit".to_string(),
            CollectionRecord {
                commit: String::new(),
                version: "1.0.0".to_string(),
            },
        );
        let kit = Owner::collection("kit");
        manifest
            .files
            .claim(ThemeFolder::Snippets, "card.liquid", kit.clone());
        manifest
            .files
            .claim(ThemeFolder::Assets, "card.css", kit.clone());
        manifest
            .files
            .claim(ThemeFolder::Snippets, "header.liquid", Owner::Theme);

        let ctx = Context {
            theme: PathBuf::from("/nonexistent/theme"),
            config: SyncConfig::default(),
            quiet: true,
        };
        let report = StatusReport::build(&ctx, &manifest);

        assert!(!report.manifest_exists);
        assert_eq!(report.collections.len(), 1);
        assert_eq!(
            report.collections[0].owned,
            OwnedCounts {
                snippets: 1,
                assets: 1
            }
        );
        assert_eq!(
            report.theme_owned,
            OwnedCounts {
                snippets: 1,
                assets: 0
            }
        );
    }
}
