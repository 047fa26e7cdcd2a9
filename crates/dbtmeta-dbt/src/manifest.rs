//! dbt manifest.json parsing
//!
//! Nodes and sources are kept as raw JSON until the artifacts are merged, so
//! that one malformed entity cannot fail the whole document.

use dbtmeta_core::TableIdentifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// dbt manifest.json structure (subset of fields we care about)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the manifest
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// Model, seed, snapshot and test nodes keyed by unique_id
    #[serde(default)]
    pub nodes: BTreeMap<String, Value>,

    /// Source definitions keyed by unique_id
    #[serde(default)]
    pub sources: BTreeMap<String, Value>,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse manifest from JSON string
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(json).map_err(|e| ManifestError::ParseError(e.to_string()))
    }
}

/// Manifest metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub dbt_schema_version: Option<String>,
    #[serde(default)]
    pub dbt_version: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub invocation_id: Option<String>,
}

/// A node or source in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.my_project.users")
    #[serde(default)]
    pub unique_id: String,

    /// Node name (e.g., "users")
    pub name: String,

    /// Alias (output table name)
    #[serde(default)]
    pub alias: Option<String>,

    /// Resource type (model, source, seed, snapshot, test, ...)
    pub resource_type: String,

    /// Database name
    #[serde(default)]
    pub database: Option<String>,

    /// Schema name
    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default, alias = "raw_code")]
    pub raw_sql: Option<String>,

    #[serde(default, alias = "compiled_code")]
    pub compiled_sql: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Dependencies
    #[serde(default)]
    pub depends_on: DependsOn,

    /// Free-form `meta` block
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,

    /// Column documentation keyed by column name
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnDefinition>,

    /// Generic test invocation, tests only
    #[serde(default)]
    pub test_metadata: Option<TestMetadata>,

    /// Column a test is attached to, column-level tests only
    #[serde(default)]
    pub column_name: Option<String>,

    #[serde(default)]
    pub root_path: Option<String>,

    /// Original file path
    #[serde(default)]
    pub original_file_path: String,
}

impl ManifestNode {
    /// Parse one entity of the merged manifest map
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_test(&self) -> bool {
        self.resource_type == "test"
    }

    /// Output table name: alias when set, node name otherwise
    pub fn table_name(&self) -> &str {
        self.alias
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.name)
    }

    /// Table this node materialises, with "default" database/schema placeholders
    pub fn table_identifier(&self) -> TableIdentifier {
        TableIdentifier::new(self.database.as_deref(), self.schema.as_deref(), self.table_name())
    }

    /// Description, if non-empty
    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// Path of the defining file, prefixed with the project root when known
    pub fn source_path(&self) -> String {
        match self.root_path.as_deref().filter(|r| !r.is_empty()) {
            Some(root) => format!("{}/{}", root, self.original_file_path),
            None => self.original_file_path.clone(),
        }
    }

    /// Column this test targets, if any
    pub fn declared_column(&self) -> Option<&str> {
        self.column_name.as_deref().filter(|c| !c.is_empty())
    }

    /// Documentation of a manifest column, looked up by lower-cased name
    pub fn column_description(&self, column: &str) -> Option<&str> {
        let key = column.to_lowercase();
        self.columns
            .get(&key)
            .or_else(|| {
                self.columns
                    .iter()
                    .find(|(name, _)| name.to_lowercase() == key)
                    .map(|(_, def)| def)
            })
            .and_then(|def| def.description.as_deref())
            .filter(|d| !d.is_empty())
    }
}

/// Column definition from manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name
    #[serde(default)]
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Data type (if declared)
    #[serde(default)]
    pub data_type: Option<String>,
}

/// Dependencies structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    /// List of node unique_ids this node depends on, in declaration order
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Generic test invocation (`not_null`, `unique`, `accepted_values`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetadata {
    /// Generic test name
    pub name: String,

    #[serde(default)]
    pub namespace: Option<String>,

    /// Arguments passed to the test
    #[serde(default)]
    pub kwargs: BTreeMap<String, Value>,
}

/// Artifact parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read artifact file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse artifact JSON: {0}")]
    ParseError(String),
}
