//! Component Graph
//!
//! Resolves the name-based edges of a node set into a `petgraph::StableGraph`.
//! Snippet and asset nodes are indexed by [`NodeKey`]; entries are kept in
//! their own list since nothing references them; setup nodes carry no edges
//! and are stored unindexed.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::node::{Node, NodeKey, ThemeFolder};

/// Relationship between two files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Liquid `render` of a snippet
    Renders,
    /// Asset reference (asset_url, import, or component-local asset)
    Loads,
}

/// Dependency graph of one theme or collection.
#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    /// The underlying petgraph instance
    graph: StableGraph<Node, EdgeType>,

    /// Snippet-folder and asset-folder nodes by key
    index: HashMap<NodeKey, NodeIndex>,

    /// Entry points in insertion order
    entries: Vec<NodeIndex>,
}

impl ComponentGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from scanned nodes, resolving snippet and asset names.
    ///
    /// When two nodes share a key the first one wins; names that resolve to no
    /// node produce no edge.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut graph = Self::new();

        for node in nodes {
            let key = node.key();
            let is_entry = node.is_entry();
            let is_setup = node.is_setup();
            let idx = graph.graph.add_node(node);

            if is_entry {
                graph.entries.push(idx);
            } else if !is_setup {
                if graph.index.contains_key(&key) {
                    debug!("Ignoring shadowed node {}", key);
                } else {
                    graph.index.insert(key, idx);
                }
            }
        }

        let sources: Vec<NodeIndex> = graph.graph.node_indices().collect();
        for source in sources {
            let targets: Vec<(NodeIndex, EdgeType)> = {
                let node = &graph.graph[source];
                node.snippets
                    .iter()
                    .filter_map(|name| {
                        graph
                            .index_of(ThemeFolder::Snippets, name)
                            .map(|idx| (idx, EdgeType::Renders))
                    })
                    .chain(node.assets.iter().filter_map(|name| {
                        graph
                            .index_of(ThemeFolder::Assets, name)
                            .map(|idx| (idx, EdgeType::Loads))
                    }))
                    .collect()
            };
            for (target, edge_type) in targets {
                graph.graph.add_edge(source, target, edge_type);
            }
        }

        graph
    }

    // ------------------------------------------------------------------------
    // Node Operations
    // ------------------------------------------------------------------------

    /// Get the snippet or asset node with the given folder and name
    pub fn get(&self, folder: ThemeFolder, name: &str) -> Option<&Node> {
        self.index_of(folder, name)
            .and_then(|idx| self.graph.node_weight(idx))
    }

    /// Get a node by key
    pub fn get_by_key(&self, key: &NodeKey) -> Option<&Node> {
        self.index
            .get(key)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Check if a snippet or asset with this name exists
    pub fn contains(&self, folder: ThemeFolder, name: &str) -> bool {
        self.index_of(folder, name).is_some()
    }

    /// Get the NodeIndex for a folder and name
    pub fn index_of(&self, folder: ThemeFolder, name: &str) -> Option<NodeIndex> {
        self.index.get(&NodeKey::new(folder, name)).copied()
    }

    /// Get a node by its NodeIndex
    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    /// Iterate over all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Iterate over entry points
    pub fn entries(&self) -> impl Iterator<Item = &Node> {
        self.entries.iter().filter_map(|&idx| self.graph.node_weight(idx))
    }

    /// Iterate over indexed nodes of one folder
    pub fn nodes_in(&self, folder: ThemeFolder) -> impl Iterator<Item = &Node> {
        self.index
            .iter()
            .filter(move |(key, _)| key.folder == folder)
            .filter_map(|(_, &idx)| self.graph.node_weight(idx))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Access the underlying petgraph
    pub fn inner(&self) -> &StableGraph<Node, EdgeType> {
        &self.graph
    }
}
