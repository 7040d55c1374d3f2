//! CLI command implementations
//!
//! This module contains all compsync CLI command implementations.

pub mod clean;
pub mod copy;
pub mod init;
pub mod install;
pub mod map;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use compsync_config::{ConfigLoader, ConfigOverrides, SyncConfig};
use compsync_core::{
    apply, Manifest, ManifestStore, ReconcilePolicy, ScanConfig, SyncPlan, SyncReport,
};

use crate::progress::{finish_spinner, spinner};
use crate::GlobalOptions;

/// Resolved theme and configuration shared by all commands.
#[derive(Debug)]
pub struct Context {
    pub theme: PathBuf,
    pub config: SyncConfig,
    pub quiet: bool,
}

/// A collection argument resolved to a directory.
#[derive(Debug, Clone)]
pub struct CollectionTarget {
    /// Name under `[collections]`, when the argument was one
    pub key: Option<String>,
    pub path: PathBuf,
}

/// Policy flags shared by `map` and `install`.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Components to map (`*` or comma-separated names)
    #[arg(long)]
    pub components: Option<String>,

    /// Let the collection claim files that also exist in the theme
    #[arg(long)]
    pub ignore_conflicts: bool,

    /// Reassign files already owned by another collection
    #[arg(long)]
    pub ignore_overrides: bool,
}

impl PolicyArgs {
    fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            ignore_conflicts: self.ignore_conflicts.then_some(true),
            ignore_overrides: self.ignore_overrides.then_some(true),
            components: self.components.clone(),
            ..Default::default()
        }
    }
}

impl Context {
    /// Resolve the theme and load its configuration.
    pub fn load(global: &GlobalOptions) -> Result<Self> {
        let theme = resolve_theme(global)?;
        let config = load_config(global, &theme)?;
        Ok(Self {
            theme,
            config,
            quiet: global.quiet,
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config.manifest_path(&self.theme)
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            components_dir: self.config.scan.components_dir.clone(),
            parallelism: self.config.scan.parallelism,
        }
    }

    pub fn load_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        ManifestStore::new(&path)
            .load()
            .with_context(|| format!("Failed to load manifest {}", path.display()))
    }

    /// Reconcile policy: config defaults with the command-line flags on top.
    ///
    /// `--components` beats a per-collection selector, which beats `[map]`.
    pub fn policy(&self, args: &PolicyArgs, collection: Option<&str>) -> ReconcilePolicy {
        let mut config = self.config.clone();
        config.apply_overrides(&args.to_config_overrides());

        ReconcilePolicy {
            ignore_conflicts: config.map.ignore_conflicts,
            ignore_overrides: config.map.ignore_overrides,
            selector: args
                .components
                .clone()
                .or_else(|| self.config.selector_for(collection)),
        }
    }

    /// Resolve a collection argument: an existing directory, or a registered name.
    pub fn resolve_collection(&self, arg: &str) -> Result<CollectionTarget> {
        let path = PathBuf::from(arg);
        if path.is_dir() {
            return Ok(CollectionTarget {
                key: None,
                path: path
                    .canonicalize()
                    .with_context(|| format!("Failed to resolve {}", path.display()))?,
            });
        }

        if let Ok(entry) = self.config.collection(arg) {
            let path = if entry.path.is_absolute() {
                entry.path.clone()
            } else {
                self.theme.join(&entry.path)
            };
            if !path.is_dir() {
                anyhow::bail!(
                    "Collection '{}' points to {}, which is not a directory",
                    arg,
                    path.display()
                );
            }
            return Ok(CollectionTarget {
                key: Some(arg.to_string()),
                path,
            });
        }

        anyhow::bail!(
            "Collection '{}' not found (not a directory or a name under [collections])",
            arg
        );
    }
}

/// Resolve the theme path from options or current directory.
pub fn resolve_theme(global: &GlobalOptions) -> Result<PathBuf> {
    let path = match global.theme {
        Some(ref theme) => theme.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if !path.is_dir() {
        anyhow::bail!("Theme directory not found: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))
}

/// Load configuration with optional config file override.
pub fn load_config(global: &GlobalOptions, theme: &Path) -> Result<SyncConfig> {
    let mut loader = ConfigLoader::new();

    if let Some(ref config_path) = global.config {
        return loader
            .load_file(config_path, None)
            .with_context(|| format!("Failed to load config file {}", config_path.display()));
    }

    loader
        .load(theme, None)
        .context("Failed to load configuration")
}

/// Apply a plan under a spinner.
pub fn run_plan(plan: &SyncPlan, dry_run: bool, label: &str, quiet: bool) -> Result<SyncReport> {
    let pb = spinner(&format!("{label} ({} operations)...", plan.len()), quiet);
    let report = apply(plan, dry_run).with_context(|| format!("{label} failed"))?;
    finish_spinner(
        pb,
        &format!(
            "{label}: {} written, {} unchanged, {} deleted",
            report.written.len(),
            report.unchanged,
            report.deleted.len()
        ),
    );
    Ok(report)
}

/// Print the files a report touched.
pub fn print_report(report: &SyncReport, theme: &Path, dry_run: bool) {
    let (write, delete) = if dry_run {
        ("would write", "would delete")
    } else {
        ("wrote", "deleted")
    };

    for path in &report.written {
        println!("  {} {}", write, display_relative(path, theme));
    }
    for path in &report.deleted {
        println!("  {} {}", delete, display_relative(path, theme));
    }
}

/// Path relative to `base` when it lives below it.
pub fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
