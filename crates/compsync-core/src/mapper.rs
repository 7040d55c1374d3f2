//! Map Pipeline
//!
//! Scans the theme and the collection in parallel, reconciles their graphs
//! against the stored manifest and persists the result. The manifest file is
//! written only after the whole pass succeeded.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::collection::CollectionError;
use crate::graph::ComponentGraph;
use crate::manifest::{Manifest, ManifestError, ManifestStore};
use crate::reconcile::{
    CollectionMeta, PolicyWarning, ReconcileError, ReconcilePolicy, Reconciler,
};
use crate::scanner::{GraphScanner, ScanConfig, ScanError};

/// Errors that can abort a map run.
#[derive(Debug, Error)]
pub enum MapError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Collection(#[from] CollectionError),
}

/// Options for one map run.
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub policy: ReconcilePolicy,
    /// Manifest file of the theme
    pub manifest_path: PathBuf,
    pub scan: ScanConfig,
    /// Compute the manifest without writing it
    pub dry_run: bool,
}

/// Everything a map run produced.
#[derive(Debug)]
pub struct MapOutcome {
    pub manifest: Manifest,
    pub warnings: Vec<PolicyWarning>,
    pub collection: CollectionMeta,
    pub theme: ComponentGraph,
    pub collection_graph: ComponentGraph,
}

/// Scan both roots and return their graphs.
pub fn scan_graphs(
    theme_dir: &Path,
    collection_dir: &Path,
    config: &ScanConfig,
) -> Result<(ComponentGraph, ComponentGraph), ScanError> {
    let scanner = GraphScanner::new(config.clone());
    let (theme_nodes, collection_nodes) = rayon::join(
        || scanner.scan_theme(theme_dir),
        || scanner.scan_collection(collection_dir),
    );

    Ok((
        ComponentGraph::from_nodes(theme_nodes?),
        ComponentGraph::from_nodes(collection_nodes?),
    ))
}

/// Map the collection at `collection_dir` into the theme at `theme_dir`.
pub fn map_collection(
    theme_dir: &Path,
    collection_dir: &Path,
    options: &MapOptions,
) -> Result<MapOutcome, MapError> {
    let collection = CollectionMeta::from_dir(collection_dir)?;
    let store = ManifestStore::new(&options.manifest_path);
    let old = store.load()?;

    let (theme, collection_graph) = scan_graphs(theme_dir, collection_dir, &options.scan)?;
    info!(
        "Theme graph: {} nodes, {} edges; collection graph: {} nodes, {} edges",
        theme.node_count(),
        theme.edge_count(),
        collection_graph.node_count(),
        collection_graph.edge_count()
    );

    let reconciliation = Reconciler::new(&theme, &collection_graph, options.policy.clone())
        .reconcile(&old, &collection)?;

    if !options.dry_run {
        store.save(&reconciliation.manifest)?;
    }

    Ok(MapOutcome {
        manifest: reconciliation.manifest,
        warnings: reconciliation.warnings,
        collection,
        theme,
        collection_graph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Owner;
    use crate::node::ThemeFolder;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let theme = temp.path().join("theme");
        let kit = temp.path().join("kit");
        write(&theme, "layout/theme.liquid", "{% render 'card' %}");
        write(&kit, "package.json", r#"{"name": "kit", "version": "0.3.0"}"#);
        write(&kit, "components/card/card.liquid", "{{ 'card.css' | asset_url }}");
        write(&kit, "components/card/assets/card.css", "");
        (temp, theme, kit)
    }

    fn options(theme: &Path, dry_run: bool) -> MapOptions {
        MapOptions {
            policy: ReconcilePolicy::default(),
            manifest_path: theme.join(".compsync/manifest.json"),
            scan: ScanConfig::default(),
            dry_run,
        }
    }

    #[test]
    fn test_map_collection_writes_manifest() {
        let (_temp, theme, kit) = fixture();
        let options = options(&theme, false);

        let outcome = map_collection(&theme, &kit, &options).unwrap();

        assert_eq!(outcome.collection.name, "kit");
        assert_eq!(
            outcome.manifest.owner_of(ThemeFolder::Assets, "card.css"),
            Some(&Owner::collection("kit"))
        );
        let stored = ManifestStore::new(&options.manifest_path).load().unwrap();
        assert_eq!(stored, outcome.manifest);
    }

    #[test]
    fn test_dry_run_leaves_manifest_untouched() {
        let (_temp, theme, kit) = fixture();
        let options = options(&theme, true);

        map_collection(&theme, &kit, &options).unwrap();
        assert!(!options.manifest_path.exists());
    }

    #[test]
    fn test_failed_run_does_not_write() {
        let (_temp, theme, kit) = fixture();
        let mut options = options(&theme, false);
        options.policy.selector = Some("missing".to_string());

        let err = map_collection(&theme, &kit, &options).unwrap_err();
        assert!(matches!(err, MapError::Reconcile(_)));
        assert!(!options.manifest_path.exists());
    }
}
