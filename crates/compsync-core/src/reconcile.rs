//! Manifest Reconciliation
//!
//! Merges the previous manifest, the theme graph and the collection graph
//! into a new manifest. The pass runs in five steps:
//!
//! 1. Expand the component selector against the collection graph.
//! 2. Record theme files added since the last run as `@theme`, warning when
//!    the collection defines a file of the same name (a conflict). Files
//!    already owned by `@theme` stay with the theme.
//! 3. Carry forward theme assets owned by other recorded collections.
//! 4. Claim every file reachable from theme entry points, resolving
//!    overrides of files previously owned by someone else. Files held by
//!    the theme are walked too, so a collection component rendered only
//!    from a theme snippet is still claimed.
//! 5. Replace the file maps wholesale and record the collection version.
//!    Theme files that were `@theme` before and nobody claimed stay `@theme`.
//!
//! Anything not re-derived during a pass is dropped from the manifest.
//! The pass is single-threaded: all claims go through one [`ClaimContext`]
//! and the first claim of a name is final.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::graph::ComponentGraph;
use crate::manifest::{CollectionRecord, FileMaps, Manifest, Owner};
use crate::node::{Node, NodeKey, ThemeFolder};
use crate::walker::{expand_selector, ReachableSet, WILDCARD_SELECTOR};

// ============================================================================
// Errors
// ============================================================================

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A selector name matches no collection component
    #[error("Component '{0}' not found in collection")]
    UnknownComponent(String),

    /// The selector expanded to nothing
    #[error("Selector '{0}' matched no files")]
    EmptySelection(String),
}

// ============================================================================
// Inputs and Outputs
// ============================================================================

/// Policy flags for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Let the collection claim theme files that collide by name
    pub ignore_conflicts: bool,
    /// Reassign files owned by another owner to this collection
    pub ignore_overrides: bool,
    /// Comma-separated component names; `None` or `*` selects everything
    pub selector: Option<String>,
}

impl ReconcilePolicy {
    fn selector(&self) -> &str {
        self.selector.as_deref().unwrap_or(WILDCARD_SELECTOR)
    }
}

/// Identity of the collection being mapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionMeta {
    pub name: String,
    pub version: String,
    pub commit: String,
}

impl CollectionMeta {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            commit: commit.into(),
        }
    }
}

/// Non-fatal outcome worth reporting to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyWarning {
    /// A theme file collides with a collection file and stays with the theme
    Conflict { path: PathBuf, collection: String },
    /// A file owned elsewhere keeps its owner although the collection defines it
    OverrideKept {
        folder: ThemeFolder,
        name: String,
        owner: Owner,
        collection: String,
    },
    /// A file owned elsewhere was reassigned to the collection
    OverrideReassigned {
        folder: ThemeFolder,
        name: String,
        previous: Owner,
        collection: String,
    },
}

impl std::fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyWarning::Conflict { path, collection } => write!(
                f,
                "{} also exists in collection '{}'; keeping the theme version",
                path.display(),
                collection
            ),
            PolicyWarning::OverrideKept {
                folder,
                name,
                owner,
                collection,
            } => write!(
                f,
                "{}/{} is owned by '{}'; not overridden by '{}'",
                folder, name, owner, collection
            ),
            PolicyWarning::OverrideReassigned {
                folder,
                name,
                previous,
                collection,
            } => write!(
                f,
                "{}/{} was owned by '{}'; now owned by '{}'",
                folder, name, previous, collection
            ),
        }
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub manifest: Manifest,
    pub warnings: Vec<PolicyWarning>,
}

// ============================================================================
// Claim Context
// ============================================================================

/// Mutable state of step 4.
struct ClaimContext<'a> {
    old: &'a FileMaps,
    new: FileMaps,
    selected: Option<ReachableSet>,
    /// Keys already handled by step 4
    visited: BTreeSet<NodeKey>,
    collection: &'a str,
    warnings: Vec<PolicyWarning>,
}

impl<'a> ClaimContext<'a> {
    fn owner(&self) -> Owner {
        Owner::collection(self.collection)
    }

    fn is_selected(&self, key: &NodeKey) -> bool {
        self.selected
            .as_ref()
            .map(|set| set.contains_key(key))
            .unwrap_or(true)
    }

    fn warn(&mut self, warning: PolicyWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Computes a new manifest for one collection mapped into one theme.
pub struct Reconciler<'a> {
    theme: &'a ComponentGraph,
    collection: &'a ComponentGraph,
    policy: ReconcilePolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        theme: &'a ComponentGraph,
        collection: &'a ComponentGraph,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            theme,
            collection,
            policy,
        }
    }

    /// Run a full pass against `old`.
    ///
    /// Fails only on selector errors; `old` is never modified.
    pub fn reconcile(
        &self,
        old: &Manifest,
        meta: &CollectionMeta,
    ) -> Result<Reconciliation, ReconcileError> {
        let selected = expand_selector(self.policy.selector(), self.collection)?;

        let mut ctx = ClaimContext {
            old: &old.files,
            new: FileMaps::new(),
            selected,
            visited: BTreeSet::new(),
            collection: &meta.name,
            warnings: Vec::new(),
        };

        self.claim_theme_additions(&mut ctx);
        self.preserve_foreign_assets(&mut ctx, old);

        for entry in self.theme.entries() {
            let keys = entry_references(entry);
            self.claim_closure(&mut ctx, keys);
        }
        self.retain_theme_files(&mut ctx);

        let ClaimContext { new, warnings, .. } = ctx;

        let mut collections = old.collections.clone();
        collections.insert(
            meta.name.clone(),
            CollectionRecord {
                commit: meta.commit.clone(),
                version: meta.version.clone(),
            },
        );

        info!(
            "Reconciled {} snippets and {} assets for '{}' ({} warnings)",
            new.snippets.len(),
            new.assets.len(),
            meta.name,
            warnings.len()
        );

        Ok(Reconciliation {
            manifest: Manifest {
                collections,
                files: new,
            },
            warnings,
        })
    }

    /// Step 2: theme files the old manifest has never seen.
    ///
    /// Files already recorded as `@theme` keep that owner while they exist,
    /// unless overrides are ignored and the collection defines them too.
    fn claim_theme_additions(&self, ctx: &mut ClaimContext<'_>) {
        for node in tracked_nodes(self.theme) {
            let in_collection = self.collection.contains(node.theme_folder, &node.name);

            match ctx.old.get(node.theme_folder, &node.name) {
                None => {}
                Some(Owner::Theme) if !(in_collection && self.policy.ignore_overrides) => {
                    ctx.new
                        .claim(node.theme_folder, node.name.clone(), Owner::Theme);
                    continue;
                }
                Some(_) => continue,
            }

            if in_collection {
                if self.policy.ignore_conflicts {
                    debug!("Leaving conflicting {} to the collection", node.key());
                    continue;
                }
                ctx.new
                    .claim(node.theme_folder, node.name.clone(), Owner::Theme);
                ctx.warn(PolicyWarning::Conflict {
                    path: node.file.clone(),
                    collection: ctx.collection.to_string(),
                });
            } else {
                ctx.new
                    .claim(node.theme_folder, node.name.clone(), Owner::Theme);
            }
        }
    }

    /// Theme files previously owned by `@theme` that step 4 left unclaimed.
    ///
    /// Only reachable under `ignore_overrides`, where step 2 defers files the
    /// collection also defines.
    fn retain_theme_files(&self, ctx: &mut ClaimContext<'_>) {
        for node in tracked_nodes(self.theme) {
            let was_theme = matches!(
                ctx.old.get(node.theme_folder, &node.name),
                Some(Owner::Theme)
            );
            if was_theme && !ctx.new.contains(node.theme_folder, &node.name) {
                debug!("Keeping unreached {} with the theme", node.key());
                ctx.new
                    .claim(node.theme_folder, node.name.clone(), Owner::Theme);
            }
        }
    }

    /// Step 3: assets owned by another collection still recorded in the manifest.
    fn preserve_foreign_assets(&self, ctx: &mut ClaimContext<'_>, old: &Manifest) {
        for node in self.theme.nodes_in(ThemeFolder::Assets) {
            let Some(owner) = ctx.old.get(ThemeFolder::Assets, &node.name) else {
                continue;
            };
            let Some(other) = owner.collection_name() else {
                continue;
            };
            if other != ctx.collection && old.has_collection(other) {
                ctx.new
                    .claim(ThemeFolder::Assets, node.name.clone(), owner.clone());
            }
        }
    }

    /// Step 4: claim each key and everything it needs.
    fn claim_closure(&self, ctx: &mut ClaimContext<'_>, roots: Vec<NodeKey>) {
        let mut stack: Vec<NodeKey> = roots.into_iter().rev().collect();

        while let Some(key) = stack.pop() {
            let children = self.claim(ctx, &key);
            stack.extend(children.into_iter().rev());
        }
    }

    /// Resolve ownership of one key, returning the keys to visit next.
    fn claim(&self, ctx: &mut ClaimContext<'_>, key: &NodeKey) -> Vec<NodeKey> {
        if !ctx.visited.insert(key.clone()) {
            return Vec::new();
        }

        let theme_node = self.theme.get_by_key(key);
        let collection_node = self.collection.get_by_key(key);

        // Held by step 2 or 3: the owner stands, the theme file's renders are walked.
        match ctx.new.get(key.folder, &key.name).map(Owner::is_theme) {
            Some(true) => {
                return self.walk_theme_held(ctx, key, theme_node, collection_node);
            }
            Some(false) => return Vec::new(),
            None => {}
        }

        match ctx.old.get(key.folder, &key.name) {
            Some(previous) if !previous.is_collection(ctx.collection) => {
                let previous = previous.clone();
                let working = match collection_node {
                    Some(node) if self.policy.ignore_overrides => {
                        let owner = ctx.owner();
                        ctx.new.claim(key.folder, key.name.clone(), owner);
                        ctx.warn(PolicyWarning::OverrideReassigned {
                            folder: key.folder,
                            name: key.name.clone(),
                            previous,
                            collection: ctx.collection.to_string(),
                        });
                        Some(node)
                    }
                    Some(node) => {
                        ctx.new.claim(key.folder, key.name.clone(), previous.clone());
                        ctx.warn(PolicyWarning::OverrideKept {
                            folder: key.folder,
                            name: key.name.clone(),
                            owner: previous,
                            collection: ctx.collection.to_string(),
                        });
                        theme_node.or(Some(node))
                    }
                    None => {
                        if theme_node.is_none() {
                            debug!("Dropping {} owned by {}: file is gone", key, previous);
                            return Vec::new();
                        }
                        ctx.new.claim(key.folder, key.name.clone(), previous);
                        theme_node
                    }
                };

                working.map(snippet_children).unwrap_or_default()
            }
            _ => {
                if !ctx.is_selected(key) {
                    debug!("Skipping {}: outside the selected components", key);
                    return Vec::new();
                }
                let Some(node) = collection_node else {
                    return Vec::new();
                };

                let owner = ctx.owner();
                ctx.new.claim(key.folder, key.name.clone(), owner);
                debug!("Claimed {} for '{}'", key, ctx.collection);

                let mut children = asset_children(node);
                if node.is_snippet_like() {
                    children.extend(snippet_children(node));
                }
                children
            }
        }
    }

    /// A file held by the theme: the owner stands, its renders are walked.
    fn walk_theme_held(
        &self,
        ctx: &mut ClaimContext<'_>,
        key: &NodeKey,
        theme_node: Option<&Node>,
        collection_node: Option<&Node>,
    ) -> Vec<NodeKey> {
        let was_theme = matches!(ctx.old.get(key.folder, &key.name), Some(Owner::Theme));
        if was_theme && collection_node.is_some() {
            ctx.warn(PolicyWarning::OverrideKept {
                folder: key.folder,
                name: key.name.clone(),
                owner: Owner::Theme,
                collection: ctx.collection.to_string(),
            });
        }
        theme_node.map(snippet_children).unwrap_or_default()
    }
}

/// Snippet and asset nodes of a graph, in scan order.
fn tracked_nodes(graph: &ComponentGraph) -> impl Iterator<Item = &Node> {
    graph.nodes().filter(|node| {
        matches!(node.theme_folder, ThemeFolder::Snippets | ThemeFolder::Assets)
            && !node.is_entry()
            && !node.is_setup()
    })
}

fn snippet_children(node: &Node) -> Vec<NodeKey> {
    node.snippets.iter().cloned().map(NodeKey::snippet).collect()
}

fn asset_children(node: &Node) -> Vec<NodeKey> {
    node.assets.iter().cloned().map(NodeKey::asset).collect()
}

fn entry_references(entry: &Node) -> Vec<NodeKey> {
    let mut keys = snippet_children(entry);
    keys.extend(asset_children(entry));
    keys
}
