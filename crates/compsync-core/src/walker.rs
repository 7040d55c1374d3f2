//! Reachability Walker
//!
//! Computes the transitive closure of snippets and assets referenced from a
//! set of starting nodes. The same walk serves two purposes:
//! - from theme entry points, to find the files the theme actually uses
//! - from selected collection components, to expand a component selector
//!   into "the component plus everything it needs"
//!
//! Traversal is a depth-first search over [`ComponentGraph`] edges with a
//! shared visited set, so components rendering each other terminate.

use std::collections::BTreeSet;

use petgraph::visit::Dfs;
use tracing::debug;

use crate::graph::ComponentGraph;
use crate::node::{Node, NodeKey, ThemeFolder};
use crate::reconcile::ReconcileError;

/// Selector matching every component
pub const WILDCARD_SELECTOR: &str = "*";

/// Set of (folder, name) pairs reached by a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachableSet(BTreeSet<NodeKey>);

impl ReachableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, returning false if it was already present
    pub fn insert(&mut self, key: NodeKey) -> bool {
        self.0.insert(key)
    }

    pub fn contains(&self, folder: ThemeFolder, name: &str) -> bool {
        self.0.contains(&NodeKey::new(folder, name))
    }

    pub fn contains_key(&self, key: &NodeKey) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeKey> {
        self.0.iter()
    }
}

impl Extend<NodeKey> for ReachableSet {
    fn extend<I: IntoIterator<Item = NodeKey>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Walk `graph` from the snippet and asset names referenced by `starts`.
///
/// Start nodes need not belong to `graph`: theme entries are matched against
/// a collection graph by name. Names that do not resolve in `graph` are
/// skipped; only nodes of `graph` end up in the result.
pub fn reachable<'a>(
    starts: impl IntoIterator<Item = &'a Node>,
    graph: &ComponentGraph,
) -> ReachableSet {
    let mut set = ReachableSet::new();
    let mut dfs = Dfs::empty(graph.inner());

    for start in starts {
        let seeds = start
            .snippets
            .iter()
            .filter_map(|name| graph.index_of(ThemeFolder::Snippets, name))
            .chain(
                start
                    .assets
                    .iter()
                    .filter_map(|name| graph.index_of(ThemeFolder::Assets, name)),
            );

        for seed in seeds {
            // Visited seeds yield nothing; the discovered set is kept across moves
            dfs.move_to(seed);
            while let Some(idx) = dfs.next(graph.inner()) {
                if let Some(node) = graph.node(idx) {
                    set.insert(node.key());
                }
            }
        }
    }

    set
}

/// Expand a component selector against a collection graph.
///
/// Returns `None` for the wildcard. Otherwise the selector is a
/// comma-separated list of component names (with or without `.liquid`);
/// each must name a collection component and is expanded to itself plus its
/// transitive closure.
pub fn expand_selector(
    selector: &str,
    collection: &ComponentGraph,
) -> Result<Option<ReachableSet>, ReconcileError> {
    let names: Vec<&str> = selector
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if names.iter().any(|name| *name == WILDCARD_SELECTOR) {
        return Ok(None);
    }

    let mut components = Vec::with_capacity(names.len());
    for name in &names {
        let file_name = if name.ends_with(".liquid") {
            name.to_string()
        } else {
            format!("{}.liquid", name)
        };
        match collection.get(ThemeFolder::Snippets, &file_name) {
            Some(node) if node.is_component() => components.push(node),
            _ => return Err(ReconcileError::UnknownComponent(name.to_string())),
        }
    }

    let mut selected = ReachableSet::new();
    for component in &components {
        selected.insert(component.key());
    }
    selected.extend(reachable(components.iter().copied(), collection).iter().cloned());

    if selected.is_empty() {
        return Err(ReconcileError::EmptySelection(selector.to_string()));
    }

    debug!(
        "Selector '{}' expanded to {} files",
        selector,
        selected.len()
    );
    Ok(Some(selected))
}
