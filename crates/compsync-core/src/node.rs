//! Node Schema and Generation
//!
//! A [`Node`] is one file participating in a theme or collection graph,
//! together with the names of the snippets and assets it statically
//! references. Names are never resolved here; resolution happens when a
//! [`ComponentGraph`](crate::graph::ComponentGraph) is built, which keeps node
//! generation independent per file and safe to run in parallel.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::parser::{parse_liquid, parse_script};
use crate::scanner::ScanError;

// ============================================================================
// Theme Folders
// ============================================================================

/// Theme directory a file is scanned from and written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeFolder {
    Assets,
    Snippets,
    Templates,
    Blocks,
    Config,
    Sections,
    Layout,
}

impl ThemeFolder {
    /// Folders holding theme entry points
    pub const ENTRY_FOLDERS: [ThemeFolder; 4] = [
        ThemeFolder::Layout,
        ThemeFolder::Sections,
        ThemeFolder::Blocks,
        ThemeFolder::Templates,
    ];

    /// Every folder a theme may contain
    pub const ALL: [ThemeFolder; 7] = [
        ThemeFolder::Assets,
        ThemeFolder::Snippets,
        ThemeFolder::Templates,
        ThemeFolder::Blocks,
        ThemeFolder::Config,
        ThemeFolder::Sections,
        ThemeFolder::Layout,
    ];

    /// Get the directory name
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeFolder::Assets => "assets",
            ThemeFolder::Snippets => "snippets",
            ThemeFolder::Templates => "templates",
            ThemeFolder::Blocks => "blocks",
            ThemeFolder::Config => "config",
            ThemeFolder::Sections => "sections",
            ThemeFolder::Layout => "layout",
        }
    }

    /// Parse a directory name
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|folder| folder.as_str() == name)
    }
}

impl std::fmt::Display for ThemeFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Node Types
// ============================================================================

/// Role of a file, as declared by where it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Theme layout, section, block or template
    Entry,
    /// Collection component (the component's eponymous Liquid file)
    Component,
    /// Liquid snippet
    Snippet,
    /// Static asset
    Asset,
    /// Auxiliary file installed alongside a component
    Setup,
}

impl NodeType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Entry => "entry",
            NodeType::Component => "component",
            NodeType::Snippet => "snippet",
            NodeType::Asset => "asset",
            NodeType::Setup => "setup",
        }
    }
}

/// Node variant with the data specific to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Entry,
    Component {
        /// Setup files found under the component's `setup/` directory
        setup: Vec<PathBuf>,
    },
    Snippet,
    Asset,
    Setup,
}

impl NodeKind {
    /// Get the plain node type
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Entry => NodeType::Entry,
            NodeKind::Component { .. } => NodeType::Component,
            NodeKind::Snippet => NodeType::Snippet,
            NodeKind::Asset => NodeType::Asset,
            NodeKind::Setup => NodeType::Setup,
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// Identity of a node for cross-graph matching: folder plus file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub folder: ThemeFolder,
    pub name: String,
}

impl NodeKey {
    pub fn new(folder: ThemeFolder, name: impl Into<String>) -> Self {
        Self {
            folder,
            name: name.into(),
        }
    }

    pub fn snippet(name: impl Into<String>) -> Self {
        Self::new(ThemeFolder::Snippets, name)
    }

    pub fn asset(name: impl Into<String>) -> Self {
        Self::new(ThemeFolder::Assets, name)
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.folder, self.name)
    }
}

/// A file in a theme or collection graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Absolute path of the file
    pub file: PathBuf,
    /// File basename used for matching across graphs
    pub name: String,
    /// Node variant
    pub kind: NodeKind,
    /// Folder the file belongs to in a theme
    pub theme_folder: ThemeFolder,
    /// Snippet names rendered by this file
    pub snippets: BTreeSet<String>,
    /// Asset names referenced by this file
    pub assets: BTreeSet<String>,
}

impl Node {
    /// Create a node with no edges
    pub fn new(file: impl Into<PathBuf>, kind: NodeKind, theme_folder: ThemeFolder) -> Self {
        let file = file.into();
        let name = file_name(&file);
        Self {
            file,
            name,
            kind,
            theme_folder,
            snippets: BTreeSet::new(),
            assets: BTreeSet::new(),
        }
    }

    /// Add rendered snippet names
    pub fn with_snippets<I, S>(mut self, snippets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.snippets.extend(snippets.into_iter().map(Into::into));
        self
    }

    /// Add referenced asset names
    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets.extend(assets.into_iter().map(Into::into));
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.theme_folder, self.name.clone())
    }

    pub fn is_entry(&self) -> bool {
        matches!(self.kind, NodeKind::Entry)
    }

    pub fn is_component(&self) -> bool {
        matches!(self.kind, NodeKind::Component { .. })
    }

    pub fn is_setup(&self) -> bool {
        matches!(self.kind, NodeKind::Setup)
    }

    /// Check if this node lives in the snippets folder (snippet or component)
    pub fn is_snippet_like(&self) -> bool {
        matches!(self.kind, NodeKind::Snippet | NodeKind::Component { .. })
    }

    /// Setup files of a component node (empty for other variants)
    pub fn setup_files(&self) -> &[PathBuf] {
        match &self.kind {
            NodeKind::Component { setup } => setup,
            _ => &[],
        }
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Build a node for `file`, reading and parsing it when its type has edges.
///
/// Entries, snippets and components are parsed as Liquid. JavaScript assets
/// contribute their own imports; other assets and setup files are not read.
/// A component additionally lists its local `assets/` directory as asset
/// edges and collects every file under its `setup/` directory.
pub fn generate(
    file: &Path,
    node_type: NodeType,
    theme_folder: ThemeFolder,
) -> Result<Node, ScanError> {
    let kind = match node_type {
        NodeType::Entry => NodeKind::Entry,
        NodeType::Snippet => NodeKind::Snippet,
        NodeType::Asset => NodeKind::Asset,
        NodeType::Setup => NodeKind::Setup,
        NodeType::Component => NodeKind::Component {
            setup: component_dir(file)
                .map(|dir| list_files(&dir.join("setup"), usize::MAX))
                .transpose()?
                .unwrap_or_default(),
        },
    };

    let mut node = Node::new(file, kind, theme_folder);

    match node_type {
        NodeType::Entry | NodeType::Snippet | NodeType::Component => {
            let refs = parse_liquid(&read_source(file)?);
            node.snippets = refs.snippets;
            node.assets = refs.assets;
        }
        NodeType::Asset if is_script(file) => {
            node.assets = parse_script(&read_source(file)?);
        }
        NodeType::Asset | NodeType::Setup => {}
    }

    if node_type == NodeType::Component {
        if let Some(dir) = component_dir(file) {
            let local_assets = list_files(&dir.join("assets"), 1)?;
            node.assets
                .extend(local_assets.iter().map(|path| file_name(path)));
        }
    }

    debug!(
        "Generated {} node {} ({} snippets, {} assets)",
        node_type.as_str(),
        node.name,
        node.snippets.len(),
        node.assets.len()
    );

    Ok(node)
}

fn read_source(file: &Path) -> Result<String, ScanError> {
    std::fs::read_to_string(file).map_err(|e| ScanError::read(file, e))
}

fn is_script(file: &Path) -> bool {
    matches!(
        file.extension().and_then(|ext| ext.to_str()),
        Some("js") | Some("mjs")
    )
}

fn component_dir(file: &Path) -> Option<PathBuf> {
    file.parent().map(Path::to_path_buf)
}

/// File basename as a string.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Sorted list of non-hidden files under `dir`, up to `max_depth` levels.
///
/// A missing directory is empty; any other walk failure is an error.
pub(crate) fn list_files(dir: &Path, max_depth: usize) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.map_err(|e| ScanError::walk(dir, e))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}
