//! compsync Core - Component graphs and manifest reconciliation for Liquid themes
//!
//! This crate provides the core functionality for mapping a component
//! collection into a theme:
//! - Render/asset reference extraction from Liquid and JavaScript sources
//! - Typed file nodes and per-root graph scanning (parallel per file)
//! - Transitive reachability from theme entry points
//! - Ownership reconciliation against the persisted manifest
//! - Copy/clean planning driven by the reconciled manifest

pub mod collection;
pub mod graph;
pub mod manifest;
pub mod mapper;
pub mod node;
pub mod parser;
pub mod reconcile;
pub mod scanner;
pub mod sync;
pub mod walker;

// Node and graph re-exports
pub use graph::{ComponentGraph, EdgeType};
pub use node::{generate, Node, NodeKey, NodeKind, NodeType, ThemeFolder};
pub use parser::{parse_liquid, parse_script, ParsedReferences};

// Scanning re-exports
pub use scanner::{GraphScanner, ScanConfig, ScanError};

// Reachability re-exports
pub use walker::{expand_selector, reachable, ReachableSet, WILDCARD_SELECTOR};

// Manifest re-exports
pub use manifest::{
    CollectionRecord, FileMaps, Manifest, ManifestError, ManifestStore, Owner, OwnershipMap,
    THEME_OWNER,
};

// Reconciler re-exports
pub use reconcile::{
    CollectionMeta, PolicyWarning, ReconcileError, ReconcilePolicy, Reconciler, Reconciliation,
};

// Collection metadata re-exports
pub use collection::{latest_commit, CollectionError, PackageInfo};

// Sync re-exports
pub use sync::{
    apply, content_hash, plan_clean, plan_copy, CopyOptions, SyncError, SyncOp, SyncPlan,
    SyncReport,
};

// Pipeline re-exports
pub use mapper::{map_collection, scan_graphs, MapError, MapOptions, MapOutcome};
