//! dbt catalog.json parsing
//!
//! The catalog artifact describes what dbt found in the warehouse: realised
//! columns, their types and ordinal positions, and table metadata such as the
//! owner. Entities share their keys with the manifest.

use crate::manifest::ManifestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// dbt catalog.json structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogArtifact {
    #[serde(default)]
    pub nodes: BTreeMap<String, Value>,

    #[serde(default)]
    pub sources: BTreeMap<String, Value>,
}

impl CatalogArtifact {
    /// Load catalog from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse catalog from JSON string
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(json).map_err(|e| ManifestError::ParseError(e.to_string()))
    }
}

/// A relation as found in the warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogNode {
    pub metadata: CatalogTableMetadata,

    /// Raw columns keyed by name as reported by the warehouse
    ///
    /// Parsed one at a time by [`CatalogNode::parsed_columns`].
    #[serde(default)]
    pub columns: BTreeMap<String, Value>,

    #[serde(default)]
    pub unique_id: Option<String>,
}

impl CatalogNode {
    /// Parse one entity of the merged catalog map
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Parse each column independently, keyed by its catalog key
    pub fn parsed_columns(&self) -> impl Iterator<Item = (&str, Result<CatalogColumn, serde_json::Error>)> + '_ {
        self.columns
            .iter()
            .map(|(key, value)| (key.as_str(), CatalogColumn::deserialize(value)))
    }

    /// Warehouse owner, if reported and non-empty
    pub fn owner(&self) -> Option<&str> {
        self.metadata.owner.as_deref().filter(|o| !o.is_empty())
    }
}

/// Table-level metadata block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogTableMetadata {
    /// Relation type (table, view, ...)
    #[serde(default, rename = "type")]
    pub relation_type: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,
}

/// A realised column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,

    /// Raw warehouse type string
    #[serde(rename = "type")]
    pub data_type: String,

    /// Ordinal position
    pub index: u32,

    #[serde(default)]
    pub comment: Option<String>,
}
