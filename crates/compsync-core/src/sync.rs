//! Copy and Clean Planning
//!
//! Turns a reconciled manifest into file operations on the theme:
//! - copy: every collection file owned by the collection is written into
//!   the matching theme folder (optionally with component setup files)
//! - clean: every theme snippet or asset no owner map mentions is deleted
//!
//! Plans are plain data; [`apply`] executes them and skips writes whose
//! destination already has identical content (SHA-256).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::graph::ComponentGraph;
use crate::manifest::Manifest;
use crate::node::{Node, ThemeFolder};

/// Errors that can occur while applying a plan.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum SyncOp {
    Copy { from: PathBuf, to: PathBuf },
    Delete { path: PathBuf },
}

/// Ordered list of file operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub ops: Vec<SyncOp>,
}

impl SyncPlan {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Options for copy planning.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Also install the setup files of owned components
    pub include_setup: bool,
}

/// Outcome of [`apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Files written (or that would be written in a dry run)
    pub written: Vec<PathBuf>,
    /// Copies skipped because the content was identical
    pub unchanged: usize,
    /// Files deleted (or that would be deleted in a dry run)
    pub deleted: Vec<PathBuf>,
}

/// Plan copies of every file the manifest assigns to `collection_name`.
pub fn plan_copy(
    manifest: &Manifest,
    collection: &ComponentGraph,
    collection_name: &str,
    theme_dir: &Path,
    options: &CopyOptions,
) -> SyncPlan {
    let mut ops = Vec::new();

    for folder in [ThemeFolder::Snippets, ThemeFolder::Assets] {
        let Some(map) = manifest.files.folder(folder) else {
            continue;
        };
        for (name, owner) in map.iter() {
            if !owner.is_collection(collection_name) {
                continue;
            }
            let Some(node) = collection.get(folder, name) else {
                debug!("{}/{} is owned but missing from the collection", folder, name);
                continue;
            };

            ops.push(SyncOp::Copy {
                from: node.file.clone(),
                to: theme_dir.join(folder.as_str()).join(name),
            });

            if options.include_setup {
                ops.extend(setup_ops(node, theme_dir));
            }
        }
    }

    debug!("Planned {} copies for '{}'", ops.len(), collection_name);
    SyncPlan { ops }
}

/// Setup files keep their path relative to the component's `setup/` directory.
fn setup_ops(component: &Node, theme_dir: &Path) -> Vec<SyncOp> {
    let Some(setup_root) = component.file.parent().map(|dir| dir.join("setup")) else {
        return Vec::new();
    };

    component
        .setup_files()
        .iter()
        .filter_map(|file| {
            let relative = file.strip_prefix(&setup_root).ok()?;
            Some(SyncOp::Copy {
                from: file.clone(),
                to: theme_dir.join(relative),
            })
        })
        .collect()
}

/// Plan deletion of theme snippets and assets that no owner map mentions.
pub fn plan_clean(manifest: &Manifest, theme: &ComponentGraph) -> SyncPlan {
    let mut ops: Vec<SyncOp> = theme
        .nodes()
        .filter(|node| matches!(node.theme_folder, ThemeFolder::Snippets | ThemeFolder::Assets))
        .filter(|node| !node.is_entry())
        .filter(|node| manifest.owner_of(node.theme_folder, &node.name).is_none())
        .map(|node| SyncOp::Delete {
            path: node.file.clone(),
        })
        .collect();

    ops.sort_by(|a, b| op_path(a).cmp(op_path(b)));
    SyncPlan { ops }
}

fn op_path(op: &SyncOp) -> &Path {
    match op {
        SyncOp::Copy { to, .. } => to,
        SyncOp::Delete { path } => path,
    }
}

/// Execute a plan. With `dry_run` nothing is touched but the report is the same.
pub fn apply(plan: &SyncPlan, dry_run: bool) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();

    for op in &plan.ops {
        match op {
            SyncOp::Copy { from, to } => {
                if to.exists() && content_hash(from)? == content_hash(to)? {
                    report.unchanged += 1;
                    continue;
                }
                if !dry_run {
                    copy_file(from, to)?;
                }
                debug!("Wrote {}", to.display());
                report.written.push(to.clone());
            }
            SyncOp::Delete { path } => {
                if !path.exists() {
                    continue;
                }
                if !dry_run {
                    std::fs::remove_file(path).map_err(|source| SyncError::Delete {
                        path: path.clone(),
                        source,
                    })?;
                }
                debug!("Deleted {}", path.display());
                report.deleted.push(path.clone());
            }
        }
    }

    info!(
        "{}{} written, {} unchanged, {} deleted",
        if dry_run { "[dry run] " } else { "" },
        report.written.len(),
        report.unchanged,
        report.deleted.len()
    );
    Ok(report)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), SyncError> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SyncError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::copy(from, to).map_err(|source| SyncError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// SHA-256 of a file's content as lowercase hex.
pub fn content_hash(path: &Path) -> Result<String, SyncError> {
    let hash_error = |source: std::io::Error| SyncError::Hash {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(hash_error)?;
    let mut reader = BufReader::with_capacity(8192, file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer).map_err(hash_error)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Owner;
    use crate::node::NodeKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn manifest(entries: &[(ThemeFolder, &str, Owner)]) -> Manifest {
        let mut manifest = Manifest::default();
        for (folder, name, owner) in entries {
            manifest.files.claim(*folder, *name, owner.clone());
        }
        manifest
    }

    #[test]
    fn test_plan_copy_only_owned_files() {
        let temp = TempDir::new().unwrap();
        let kit = temp.path().join("kit");
        let component = kit.join("components/card/card.liquid");
        let setup = kit.join("components/card/setup/sections/card-demo.liquid");
        write(&component, "");
        write(&setup, "");

        let collection = ComponentGraph::from_nodes(vec![
            Node::new(
                &component,
                NodeKind::Component {
                    setup: vec![setup.clone()],
                },
                ThemeFolder::Snippets,
            ),
            Node::new(kit.join("assets/other.css"), NodeKind::Asset, ThemeFolder::Assets),
        ]);
        let manifest = manifest(&[
            (ThemeFolder::Snippets, "card.liquid", Owner::collection("kit")),
            (ThemeFolder::Assets, "other.css", Owner::collection("other")),
        ]);
        let theme = temp.path().join("theme");

        let plan = plan_copy(&manifest, &collection, "kit", &theme, &CopyOptions::default());
        assert_eq!(
            plan.ops,
            vec![SyncOp::Copy {
                from: component.clone(),
                to: theme.join("snippets/card.liquid"),
            }]
        );

        let with_setup = plan_copy(
            &manifest,
            &collection,
            "kit",
            &theme,
            &CopyOptions {
                include_setup: true,
            },
        );
        assert_eq!(with_setup.len(), 2);
        assert_eq!(
            with_setup.ops[1],
            SyncOp::Copy {
                from: setup,
                to: theme.join("sections/card-demo.liquid"),
            }
        );
    }

    #[test]
    fn test_plan_clean_spares_owned_and_theme_files() {
        let theme = ComponentGraph::from_nodes(vec![
            Node::new("/t/snippets/kept.liquid", NodeKind::Snippet, ThemeFolder::Snippets),
            Node::new("/t/snippets/mine.liquid", NodeKind::Snippet, ThemeFolder::Snippets),
            Node::new("/t/snippets/orphan.liquid", NodeKind::Snippet, ThemeFolder::Snippets),
            Node::new("/t/assets/orphan.css", NodeKind::Asset, ThemeFolder::Assets),
            Node::new("/t/sections/main.liquid", NodeKind::Entry, ThemeFolder::Sections),
        ]);
        let manifest = manifest(&[
            (ThemeFolder::Snippets, "kept.liquid", Owner::collection("kit")),
            (ThemeFolder::Snippets, "mine.liquid", Owner::Theme),
        ]);

        let plan = plan_clean(&manifest, &theme);
        assert_eq!(
            plan.ops,
            vec![
                SyncOp::Delete {
                    path: PathBuf::from("/t/assets/orphan.css")
                },
                SyncOp::Delete {
                    path: PathBuf::from("/t/snippets/orphan.liquid")
                },
            ]
        );
    }

    #[test]
    fn test_apply_skips_identical_content() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("kit/a.liquid");
        let dst = temp.path().join("theme/snippets/a.liquid");
        write(&src, "hello");

        let plan = SyncPlan {
            ops: vec![SyncOp::Copy {
                from: src.clone(),
                to: dst.clone(),
            }],
        };

        let first = apply(&plan, false).unwrap();
        assert_eq!(first.written, vec![dst.clone()]);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "hello");

        let second = apply(&plan, false).unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged, 1);

        write(&src, "changed");
        let third = apply(&plan, false).unwrap();
        assert_eq!(third.written.len(), 1);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "changed");
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("kit/a.liquid");
        let dst = temp.path().join("theme/snippets/a.liquid");
        let orphan = temp.path().join("theme/assets/old.css");
        write(&src, "hello");
        write(&orphan, "");

        let plan = SyncPlan {
            ops: vec![
                SyncOp::Copy {
                    from: src,
                    to: dst.clone(),
                },
                SyncOp::Delete {
                    path: orphan.clone(),
                },
            ],
        };

        let report = apply(&plan, true).unwrap();
        assert_eq!(report.written, vec![dst.clone()]);
        assert_eq!(report.deleted, vec![orphan.clone()]);
        assert!(!dst.exists());
        assert!(orphan.exists());
    }

    #[test]
    fn test_content_hash_is_sha256() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("empty");
        write(&file, "");
        assert_eq!(
            content_hash(&file).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
