//! Catalog snapshots
//!
//! A snapshot lists the entities known to the catalog by fully qualified name.
//! The CLI seeds an [`InMemoryCatalog`] from one for dry runs and can write the
//! catalog back out afterwards.

use crate::memory::InMemoryCatalog;
use dbtmeta_core::EntityKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub tables: Vec<String>,

    #[serde(default)]
    pub users: Vec<String>,

    #[serde(default)]
    pub teams: Vec<String>,

    #[serde(default)]
    pub test_suites: Vec<String>,

    #[serde(default)]
    pub test_definitions: Vec<String>,

    #[serde(default)]
    pub test_cases: Vec<String>,
}

impl CatalogSnapshot {
    /// Load snapshot from file
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SnapshotError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse snapshot from JSON string
    pub fn from_str(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::ParseError(e.to_string()))
    }

    /// Save snapshot to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::ParseError(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| SnapshotError::IoError(path.display().to_string(), e.to_string()))
    }

    fn groups(&self) -> [(EntityKind, &Vec<String>); 6] {
        [
            (EntityKind::Table, &self.tables),
            (EntityKind::User, &self.users),
            (EntityKind::Team, &self.teams),
            (EntityKind::TestSuite, &self.test_suites),
            (EntityKind::TestDefinition, &self.test_definitions),
            (EntityKind::TestCase, &self.test_cases),
        ]
    }
}

impl InMemoryCatalog {
    /// Create a catalog holding every entity listed in `snapshot`
    pub fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        let catalog = Self::new();
        for (kind, names) in snapshot.groups() {
            for name in names {
                catalog.add_entity(kind, name.clone());
            }
        }
        tracing::debug!(tables = snapshot.tables.len(), "Loaded catalog snapshot");
        catalog
    }

    /// Capture the current entity names
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            tables: self.names(EntityKind::Table),
            users: self.names(EntityKind::User),
            teams: self.names(EntityKind::Team),
            test_suites: self.names(EntityKind::TestSuite),
            test_definitions: self.names(EntityKind::TestDefinition),
            test_cases: self.names(EntityKind::TestCase),
        }
    }
}

/// Snapshot loading errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse snapshot JSON: {0}")]
    ParseError(String),
}
