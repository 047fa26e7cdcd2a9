//! Metadata catalog entities and data models

use crate::types::Column;
use serde::{Deserialize, Serialize};

/// Kinds of entity held by the metadata catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Table,
    DataModel,
    User,
    Team,
    TestSuite,
    TestDefinition,
    TestCase,
}

impl EntityKind {
    /// Entity type string used in entity references
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::DataModel => "dataModel",
            Self::User => "user",
            Self::Team => "team",
            Self::TestSuite => "testSuite",
            Self::TestDefinition => "testDefinition",
            Self::TestCase => "testCase",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog-assigned identity of an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entity as returned by a catalog lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub fully_qualified_name: String,
}

impl Entity {
    /// Reference to this entity
    pub fn reference(&self) -> EntityReference {
        EntityReference::new(self.id.clone(), self.kind)
    }
}

/// Pointer to a catalog entity by identity and type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReference {
    pub id: EntityId,

    #[serde(rename = "type")]
    pub entity_type: String,
}

impl EntityReference {
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            entity_type: kind.as_str().to_string(),
        }
    }
}

/// Origin of a data model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelType {
    /// Generated by dbt
    Dbt,
}

/// A dbt-generated table or view with its columns, lineage and owner
///
/// Created once per manifest node and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModel {
    pub model_type: ModelType,

    pub description: Option<String>,

    /// Source file, `{root_path}/{original_file_path}`
    pub path: String,

    pub raw_sql: String,

    /// Compiled SQL, or the raw SQL when the node was never compiled
    pub sql: String,

    pub columns: Vec<Column>,

    /// Fully qualified names of upstream tables
    pub upstream: Vec<String>,

    pub owner: Option<EntityReference>,
}
