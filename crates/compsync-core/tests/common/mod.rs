//! Common test utilities for integration tests.
//!
//! [`Fixture`] lays out a theme and a component collection side by side in a
//! temporary directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use compsync_core::{
    map_collection, Manifest, MapOptions, MapOutcome, ReconcilePolicy, ScanConfig,
};
use tempfile::TempDir;

/// Name recorded in the collection's package.json
pub const COLLECTION: &str = "kit";

pub struct Fixture {
    _temp: TempDir,
    pub theme: PathBuf,
    pub collection: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let theme = temp.path().join("theme");
        let collection = temp.path().join("kit");
        std::fs::create_dir_all(&theme).unwrap();
        std::fs::create_dir_all(&collection).unwrap();

        let fixture = Self {
            _temp: temp,
            theme,
            collection,
        };
        fixture.collection_file(
            "package.json",
            &format!(r#"{{"name": "{COLLECTION}", "version": "1.0.0"}}"#),
        );
        fixture
    }

    pub fn theme_file(&self, rel: &str, content: &str) -> &Self {
        write(&self.theme.join(rel), content);
        self
    }

    pub fn collection_file(&self, rel: &str, content: &str) -> &Self {
        write(&self.collection.join(rel), content);
        self
    }

    /// Add `components/<name>/<name>.liquid`
    pub fn component(&self, name: &str, content: &str) -> &Self {
        self.collection_file(&format!("components/{name}/{name}.liquid"), content)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.theme.join(".compsync/manifest.json")
    }

    pub fn write_manifest(&self, json: &str) {
        write(&self.manifest_path(), json);
    }

    pub fn manifest_text(&self) -> String {
        std::fs::read_to_string(self.manifest_path()).expect("manifest not written")
    }

    pub fn options(&self, policy: ReconcilePolicy) -> MapOptions {
        MapOptions {
            policy,
            manifest_path: self.manifest_path(),
            scan: ScanConfig::default(),
            dry_run: false,
        }
    }

    pub fn map(&self, policy: ReconcilePolicy) -> MapOutcome {
        map_collection(&self.theme, &self.collection, &self.options(policy))
            .expect("map run failed")
    }
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Snippet owners as (name, owner) pairs, sorted by name
pub fn snippet_owners(manifest: &Manifest) -> Vec<(String, String)> {
    manifest
        .files
        .snippets
        .iter()
        .map(|(name, owner)| (name.to_string(), owner.to_string()))
        .collect()
}
