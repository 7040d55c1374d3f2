//! Ownership Manifest
//!
//! The manifest records, per theme, which collection owns each synchronized
//! snippet and asset. It is persisted as JSON with every map written in
//! sorted key order so repeated runs produce byte-identical files.
//!
//! ```json
//! {
//!   "collections": { "my-components": { "commit": "4f2c…", "version": "1.4.0" } },
//!   "files": {
//!     "snippets": { "price.liquid": "my-components", "header.liquid": "@theme" },
//!     "assets":   { "price.css": "my-components" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info};

use crate::node::ThemeFolder;

/// Owner value recorded for files that belong to the theme itself
pub const THEME_OWNER: &str = "@theme";

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while loading or saving a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read the manifest file
    #[error("failed to read manifest '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest content is not valid JSON for the schema
    #[error("failed to parse manifest '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize the manifest
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to write the manifest file
    #[error("failed to write manifest '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Owner
// ============================================================================

/// Owner of one synchronized file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    /// File belongs to the theme (`@theme`)
    Theme,
    /// File belongs to the named collection
    Collection(String),
}

impl Owner {
    pub fn collection(name: impl Into<String>) -> Self {
        Owner::Collection(name.into())
    }

    pub fn is_theme(&self) -> bool {
        matches!(self, Owner::Theme)
    }

    /// Check if this owner is the named collection
    pub fn is_collection(&self, name: &str) -> bool {
        matches!(self, Owner::Collection(owner) if owner == name)
    }

    /// Collection name, if owned by a collection
    pub fn collection_name(&self) -> Option<&str> {
        match self {
            Owner::Theme => None,
            Owner::Collection(name) => Some(name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Owner::Theme => THEME_OWNER,
            Owner::Collection(name) => name,
        }
    }
}

impl From<&str> for Owner {
    fn from(value: &str) -> Self {
        if value == THEME_OWNER {
            Owner::Theme
        } else {
            Owner::Collection(value.to_string())
        }
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Owner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Owner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Err(serde::de::Error::custom("owner must not be empty"));
        }
        Ok(Owner::from(s.as_str()))
    }
}

// ============================================================================
// Ownership Maps
// ============================================================================

/// Exclusive name → owner map for one theme folder.
///
/// A key holds exactly one owner; [`claim`](Self::claim) never replaces an
/// existing owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnershipMap(BTreeMap<String, Owner>);

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Owner> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Record `owner` for `name` if the name is unowned.
    ///
    /// Returns false when the name already had an owner.
    pub fn claim(&mut self, name: impl Into<String>, owner: Owner) -> bool {
        match self.0.entry(name.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(owner);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Owner)> {
        self.0.iter().map(|(name, owner)| (name.as_str(), owner))
    }

    /// Names owned by the given owner
    pub fn owned_by<'a>(&'a self, owner: &'a Owner) -> impl Iterator<Item = &'a str> {
        self.iter()
            .filter(move |(_, o)| *o == owner)
            .map(|(name, _)| name)
    }
}

/// Ownership maps for the folders the manifest tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMaps {
    #[serde(default)]
    pub snippets: OwnershipMap,
    #[serde(default)]
    pub assets: OwnershipMap,
}

impl FileMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map for a folder; only snippets and assets are tracked
    pub fn folder(&self, folder: ThemeFolder) -> Option<&OwnershipMap> {
        match folder {
            ThemeFolder::Snippets => Some(&self.snippets),
            ThemeFolder::Assets => Some(&self.assets),
            _ => None,
        }
    }

    fn folder_mut(&mut self, folder: ThemeFolder) -> Option<&mut OwnershipMap> {
        match folder {
            ThemeFolder::Snippets => Some(&mut self.snippets),
            ThemeFolder::Assets => Some(&mut self.assets),
            _ => None,
        }
    }

    pub fn get(&self, folder: ThemeFolder, name: &str) -> Option<&Owner> {
        self.folder(folder).and_then(|map| map.get(name))
    }

    pub fn contains(&self, folder: ThemeFolder, name: &str) -> bool {
        self.get(folder, name).is_some()
    }

    /// Claim `name` in `folder`; untracked folders are never claimed.
    pub fn claim(&mut self, folder: ThemeFolder, name: impl Into<String>, owner: Owner) -> bool {
        self.folder_mut(folder)
            .map(|map| map.claim(name, owner))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.snippets.len() + self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty() && self.assets.is_empty()
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Version information recorded for a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub version: String,
}

/// Persisted ownership record of one theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Every collection that has mapped into this theme
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionRecord>,
    /// File ownership
    #[serde(default)]
    pub files: FileMaps,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a collection has been recorded
    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    pub fn owner_of(&self, folder: ThemeFolder, name: &str) -> Option<&Owner> {
        self.files.get(folder, name)
    }

    /// Serialize to the on-disk representation (pretty JSON, trailing newline)
    pub fn to_json(&self) -> Result<String, ManifestError> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        Ok(content)
    }
}

// ============================================================================
// Manifest Store
// ============================================================================

/// Loads and saves a manifest file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest.
    ///
    /// A missing or blank file is the empty baseline; malformed JSON is an
    /// error.
    pub fn load(&self) -> Result<Manifest, ManifestError> {
        if !self.path.exists() {
            debug!("No manifest at {:?}, starting empty", self.path);
            return Ok(Manifest::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| ManifestError::Read {
            path: self.path.clone(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(Manifest::default());
        }

        serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Save the manifest, replacing the file atomically.
    pub fn save(&self, manifest: &Manifest) -> Result<(), ManifestError> {
        let content = manifest.to_json()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| ManifestError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        // Write to temporary file first, then rename over the target
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content).map_err(|source| ManifestError::Write {
            path: temp_path.clone(),
            source,
        })?;
        std::fs::rename(&temp_path, &self.path).map_err(|source| ManifestError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!(
            "Saved manifest with {} files to {:?}",
            manifest.files.len(),
            self.path
        );
        Ok(())
    }
}
