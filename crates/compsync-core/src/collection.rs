//! Collection Metadata
//!
//! Name and version come from the collection's `package.json`; the commit is
//! the latest git commit touching the collection directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::reconcile::CollectionMeta;

/// Package manifest file name
pub const PACKAGE_FILE: &str = "package.json";

/// Errors that can occur while reading collection metadata.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// package.json could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// package.json is not valid JSON
    #[error("Invalid package file {path}: {source}")]
    Package {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required package field is missing or empty
    #[error("Package file {path} has no '{field}'")]
    MissingField { path: PathBuf, field: &'static str },
}

/// `name` and `version` of a collection package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
}

#[derive(Deserialize)]
struct RawPackage {
    name: Option<String>,
    version: Option<String>,
}

impl PackageInfo {
    /// Read `package.json` from a collection directory.
    pub fn load(dir: &Path) -> Result<Self, CollectionError> {
        let path = dir.join(PACKAGE_FILE);
        let content = std::fs::read_to_string(&path).map_err(|source| CollectionError::Read {
            path: path.clone(),
            source,
        })?;
        let raw: RawPackage =
            serde_json::from_str(&content).map_err(|source| CollectionError::Package {
                path: path.clone(),
                source,
            })?;

        let required = |value: Option<String>, field: &'static str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CollectionError::MissingField {
                    path: path.clone(),
                    field,
                })
        };

        Ok(Self {
            name: required(raw.name, "name")?,
            version: required(raw.version, "version")?,
        })
    }
}

/// Latest commit hash touching `dir`, or an empty string outside a repository.
pub fn latest_commit(dir: &Path) -> String {
    let commit = std::process::Command::new("git")
        .args(["log", "-1", "--format=%H", "--", "."])
        .current_dir(dir)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default();

    if commit.is_empty() {
        debug!("No commit found for {}", dir.display());
    }
    commit
}

impl CollectionMeta {
    /// Read name, version and commit of the collection at `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, CollectionError> {
        let package = PackageInfo::load(dir)?;
        Ok(Self {
            name: package.name,
            version: package.version,
            commit: latest_commit(dir),
        })
    }
}
