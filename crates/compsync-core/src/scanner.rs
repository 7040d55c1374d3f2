//! Graph Scanner
//!
//! Enumerates the files of a theme or collection by fixed directory
//! conventions and generates one [`Node`] per file. Enumeration is
//! sequential; node generation runs in parallel with rayon and is joined
//! before the node set is returned, so callers never observe a partial graph.
//!
//! ## Theme layout
//!
//! | Directory | Node type |
//! |-----------|-----------|
//! | `layout/`, `sections/`, `blocks/`, `templates/` | entry |
//! | `snippets/*.liquid` | snippet |
//! | `assets/*` | asset |
//!
//! ## Collection layout
//!
//! | Path | Node type |
//! |------|-----------|
//! | `components/<c>/<c>.liquid` | component |
//! | `components/<c>/snippets/*.liquid` | snippet |
//! | `components/<c>/assets/*` | asset |
//! | `components/<c>/setup/<folder>/**` | setup |
//! | `snippets/*.liquid`, `assets/*` | shared snippet / asset |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::node::{file_name, generate, list_files, Node, NodeType, ThemeFolder};

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while scanning a theme or collection.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Scan root does not exist
    #[error("Scan root does not exist: {0}")]
    RootNotFound(PathBuf),

    /// A source file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory could not be listed
    #[error("Failed to list {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Several files in one collection define the same snippet name
    #[error("Duplicate snippet names in collection:\n{}", format_paths(.paths))]
    DuplicateSnippets { paths: Vec<PathBuf> },

    /// Dedicated thread pool could not be created
    #[error("Failed to create scan thread pool: {0}")]
    ThreadPool(String),
}

impl ScanError {
    /// Create a new Read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a new Walk error.
    pub fn walk(path: impl Into<PathBuf>, source: walkdir::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, ScanError>;

// ============================================================================
// Scan Configuration
// ============================================================================

/// Configuration for the graph scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory holding components inside a collection
    pub components_dir: String,
    /// Worker threads for node generation (0 = rayon global pool)
    pub parallelism: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            components_dir: "components".to_string(),
            parallelism: 0,
        }
    }
}

/// One file to turn into a node.
#[derive(Debug, Clone)]
struct ScanJob {
    path: PathBuf,
    node_type: NodeType,
    folder: ThemeFolder,
}

impl ScanJob {
    fn new(path: PathBuf, node_type: NodeType, folder: ThemeFolder) -> Self {
        Self {
            path,
            node_type,
            folder,
        }
    }
}

// ============================================================================
// Graph Scanner
// ============================================================================

/// Produces the node set of a theme or collection directory.
#[derive(Debug, Clone, Default)]
pub struct GraphScanner {
    config: ScanConfig,
}

impl GraphScanner {
    /// Create a scanner with custom configuration
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Create a scanner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ScanConfig::default())
    }

    /// Scan a theme directory.
    pub fn scan_theme(&self, root: &Path) -> Result<Vec<Node>> {
        let root = canonical_root(root)?;
        info!("Scanning theme {}", root.display());

        let mut jobs = Vec::new();
        for folder in ThemeFolder::ENTRY_FOLDERS {
            for path in list_files(&root.join(folder.as_str()), usize::MAX)? {
                jobs.push(ScanJob::new(path, NodeType::Entry, folder));
            }
        }
        push_shared_jobs(&root, &mut jobs)?;

        let nodes = self.generate_all(jobs)?;
        info!("Scanned {} theme files", nodes.len());
        Ok(nodes)
    }

    /// Scan a component collection.
    ///
    /// Fails with [`ScanError::DuplicateSnippets`] naming every colliding path
    /// when two files would install under the same snippet name.
    pub fn scan_collection(&self, root: &Path) -> Result<Vec<Node>> {
        let root = canonical_root(root)?;
        info!("Scanning collection {}", root.display());

        let mut jobs = Vec::new();
        let components_root = root.join(&self.config.components_dir);
        for component_dir in list_dirs(&components_root)? {
            push_component_jobs(&component_dir, &mut jobs)?;
        }
        push_shared_jobs(&root, &mut jobs)?;

        check_duplicate_snippets(&jobs)?;

        let nodes = self.generate_all(jobs)?;
        info!(
            "Scanned {} collection files ({} components)",
            nodes.len(),
            nodes.iter().filter(|n| n.is_component()).count()
        );
        Ok(nodes)
    }

    /// Generate all nodes in parallel; the first failure aborts the scan.
    fn generate_all(&self, jobs: Vec<ScanJob>) -> Result<Vec<Node>> {
        let run = || -> Result<Vec<Node>> {
            jobs.par_iter()
                .map(|job| generate(&job.path, job.node_type, job.folder))
                .collect()
        };

        let mut nodes = if self.config.parallelism > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.parallelism)
                .build()
                .map_err(|e| ScanError::ThreadPool(e.to_string()))?;
            pool.install(run)?
        } else {
            run()?
        };

        // Sort for deterministic ordering
        nodes.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(nodes)
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .map_err(|_| ScanError::RootNotFound(root.to_path_buf()))
}

/// Jobs for `snippets/` and `assets/` directly under `root`.
fn push_shared_jobs(root: &Path, jobs: &mut Vec<ScanJob>) -> Result<()> {
    for path in list_files(&root.join(ThemeFolder::Snippets.as_str()), 1)? {
        if is_liquid(&path) {
            jobs.push(ScanJob::new(path, NodeType::Snippet, ThemeFolder::Snippets));
        }
    }
    for path in list_files(&root.join(ThemeFolder::Assets.as_str()), 1)? {
        jobs.push(ScanJob::new(path, NodeType::Asset, ThemeFolder::Assets));
    }
    Ok(())
}

fn push_component_jobs(component_dir: &Path, jobs: &mut Vec<ScanJob>) -> Result<()> {
    let component_name = file_name(component_dir);
    let main_file = component_dir.join(format!("{}.liquid", component_name));

    if main_file.is_file() {
        jobs.push(ScanJob::new(
            main_file,
            NodeType::Component,
            ThemeFolder::Snippets,
        ));
    } else {
        debug!("Component {} has no {}.liquid", component_name, component_name);
    }

    push_shared_jobs(component_dir, jobs)?;

    for setup_dir in list_dirs(&component_dir.join("setup"))? {
        let dir_name = file_name(&setup_dir);
        let Some(folder) = ThemeFolder::from_dir_name(&dir_name) else {
            warn!(
                "Ignoring unknown setup folder {} in component {}",
                dir_name, component_name
            );
            continue;
        };
        for path in list_files(&setup_dir, usize::MAX)? {
            jobs.push(ScanJob::new(path, NodeType::Setup, folder));
        }
    }
    Ok(())
}

/// Fail if two snippet-folder files share a name, listing every such path.
fn check_duplicate_snippets(jobs: &[ScanJob]) -> Result<()> {
    let mut by_name: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for job in jobs {
        if matches!(job.node_type, NodeType::Component | NodeType::Snippet) {
            by_name
                .entry(file_name(&job.path))
                .or_default()
                .push(job.path.clone());
        }
    }

    let mut paths: Vec<PathBuf> = by_name
        .into_values()
        .filter(|paths| paths.len() > 1)
        .flatten()
        .collect();

    if paths.is_empty() {
        return Ok(());
    }

    paths.sort();
    Err(ScanError::DuplicateSnippets { paths })
}

/// Sorted non-hidden subdirectories of `dir`; empty when `dir` is missing.
fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| ScanError::read(dir, e))? {
        let entry = entry.map_err(|e| ScanError::read(dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| ScanError::read(entry.path(), e))?;
        if file_type.is_dir() && !entry.file_name().to_string_lossy().starts_with('.') {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    Ok(dirs)
}

fn is_liquid(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("liquid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn names_of(nodes: &[Node], node_type: NodeType) -> Vec<String> {
        nodes
            .iter()
            .filter(|n| n.node_type() == node_type)
            .map(|n| n.name.clone())
            .collect()
    }

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.components_dir, "components");
        assert_eq!(config.parallelism, 0);
    }

    #[test]
    fn test_scan_theme() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "layout/theme.liquid", "{% render 'header' %}");
        write(temp.path(), "templates/customers/account.json", "{}");
        write(temp.path(), "snippets/header.liquid", "");
        write(temp.path(), "snippets/notes.txt", "");
        write(temp.path(), "assets/theme.css", "");
        write(temp.path(), "config/settings_schema.json", "[]");

        let nodes = GraphScanner::with_defaults().scan_theme(temp.path()).unwrap();

        assert_eq!(
            names_of(&nodes, NodeType::Entry),
            vec!["theme.liquid", "account.json"]
        );
        assert_eq!(names_of(&nodes, NodeType::Snippet), vec!["header.liquid"]);
        assert_eq!(names_of(&nodes, NodeType::Asset), vec!["theme.css"]);
        assert_eq!(nodes.len(), 4);
    }

    #[test]
    fn test_scan_collection() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "components/card/card.liquid",
            "{% render 'card-media' %}",
        );
        write(temp.path(), "components/card/snippets/card-media.liquid", "");
        write(temp.path(), "components/card/assets/card.css", "");
        write(temp.path(), "components/card/setup/sections/card-demo.liquid", "");
        write(temp.path(), "components/card/setup/locales/en.json", "{}");
        write(temp.path(), "assets/shared.js", "");

        let nodes = GraphScanner::with_defaults()
            .scan_collection(temp.path())
            .unwrap();

        assert_eq!(names_of(&nodes, NodeType::Component), vec!["card.liquid"]);
        assert_eq!(names_of(&nodes, NodeType::Snippet), vec!["card-media.liquid"]);
        assert_eq!(
            names_of(&nodes, NodeType::Asset),
            vec!["shared.js", "card.css"]
        );
        let setup: Vec<&Node> = nodes.iter().filter(|n| n.is_setup()).collect();
        assert_eq!(setup.len(), 1);
        assert_eq!(setup[0].theme_folder, ThemeFolder::Sections);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_folder_fails_scan() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        write(temp.path(), "layout/theme.liquid", "");
        write(temp.path(), "sections/header.liquid", "");
        let locked = temp.path().join("sections");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root
        let enforced = std::fs::read_dir(&locked).is_err();
        let result = GraphScanner::with_defaults().scan_theme(temp.path());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if enforced {
            assert!(matches!(result, Err(ScanError::Walk { .. })));
        } else {
            assert_eq!(result.unwrap().len(), 2);
        }
    }

    #[test]
    fn test_missing_components_dir_scans_shared_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "snippets/icon.liquid", "");

        let nodes = GraphScanner::with_defaults()
            .scan_collection(temp.path())
            .unwrap();

        assert_eq!(names_of(&nodes, NodeType::Snippet), vec!["icon.liquid"]);
    }

    #[test]
    fn test_duplicate_snippets_lists_every_path() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "components/a/a.liquid", "");
        write(temp.path(), "components/a/snippets/icon.liquid", "");
        write(temp.path(), "components/b/b.liquid", "");
        write(temp.path(), "components/b/snippets/icon.liquid", "");
        write(temp.path(), "components/c/c.liquid", "");
        write(temp.path(), "components/c/snippets/icon.liquid", "");

        let err = GraphScanner::with_defaults()
            .scan_collection(temp.path())
            .unwrap_err();

        match &err {
            ScanError::DuplicateSnippets { paths } => assert_eq!(paths.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        for component in ["a", "b", "c"] {
            assert!(message.contains(&format!("{component}/snippets/icon.liquid")));
        }
    }

    #[test]
    fn test_scan_missing_root() {
        let result = GraphScanner::with_defaults().scan_theme(Path::new("/no/such/theme"));
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }

    #[test]
    fn test_scan_with_dedicated_pool() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "sections/a.liquid", "");
        write(temp.path(), "sections/b.liquid", "");

        let scanner = GraphScanner::new(ScanConfig {
            parallelism: 2,
            ..Default::default()
        });
        let nodes = scanner.scan_theme(temp.path()).unwrap();
        assert_eq!(nodes.len(), 2);
    }
}
