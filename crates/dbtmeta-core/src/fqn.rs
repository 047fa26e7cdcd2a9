//! Fully qualified names
//!
//! Catalog FQNs are dot-joined hierarchies
//! (`service.database.schema.table[.column][.test]`). A part that itself
//! contains a dot is wrapped in double quotes.

use crate::entity::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used when a node carries no database or schema
pub const DEFAULT_NAMESPACE: &str = "default";

/// Quote a single FQN part if it contains the separator
pub fn quote_name(name: &str) -> String {
    if name.contains('.') && !(name.starts_with('"') && name.ends_with('"')) {
        format!("\"{}\"", name)
    } else {
        name.to_string()
    }
}

/// Join parts into a fully qualified name
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| quote_name(p.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

/// A table addressed inside a database service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    /// Database name
    pub database: String,

    /// Schema name
    pub schema: String,

    /// Table name
    pub table: String,
}

impl TableIdentifier {
    /// Create a new table identifier; empty database or schema become `"default"`
    pub fn new(database: Option<&str>, schema: Option<&str>, table: impl Into<String>) -> Self {
        let or_default = |part: Option<&str>| {
            part.filter(|p| !p.is_empty())
                .unwrap_or(DEFAULT_NAMESPACE)
                .to_string()
        };

        Self {
            database: or_default(database),
            schema: or_default(schema),
            table: table.into(),
        }
    }

    /// Request the table's FQN within `service`
    pub fn table_request(&self, service: &str) -> FqnRequest {
        FqnRequest::Table {
            service: service.to_string(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            table: self.table.clone(),
        }
    }

    /// Request the FQN of the data model backing this table
    pub fn data_model_request(&self, service: &str) -> FqnRequest {
        FqnRequest::DataModel {
            service: service.to_string(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            model: self.table.clone(),
        }
    }

    /// Request the FQN of a test case attached to this table or one of its columns
    pub fn test_case_request(&self, service: &str, column: Option<&str>, test_case: &str) -> FqnRequest {
        FqnRequest::TestCase {
            service: service.to_string(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            table: self.table.clone(),
            column: column.map(str::to_string),
            test_case: test_case.to_string(),
        }
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", join(&[&self.database, &self.schema, &self.table]))
    }
}

/// Scoping keys handed to the catalog's FQN builder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "camelCase")]
pub enum FqnRequest {
    Table {
        service: String,
        database: String,
        schema: String,
        table: String,
    },
    DataModel {
        service: String,
        database: String,
        schema: String,
        model: String,
    },
    TestCase {
        service: String,
        database: String,
        schema: String,
        table: String,
        column: Option<String>,
        test_case: String,
    },
    /// Name may contain `*` wildcards
    User { name: String },
    /// Name may contain `*` wildcards
    Team { name: String },
}

impl FqnRequest {
    /// Entity kind the request resolves
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Self::Table { .. } => EntityKind::Table,
            Self::DataModel { .. } => EntityKind::DataModel,
            Self::TestCase { .. } => EntityKind::TestCase,
            Self::User { .. } => EntityKind::User,
            Self::Team { .. } => EntityKind::Team,
        }
    }

    /// Ordered name parts for hierarchical entities, `None` for users and teams
    pub fn hierarchy(&self) -> Option<Vec<&str>> {
        match self {
            Self::Table { service, database, schema, table } => Some(vec![
                service.as_str(),
                database.as_str(),
                schema.as_str(),
                table.as_str(),
            ]),
            Self::DataModel { service, database, schema, model } => Some(vec![
                service.as_str(),
                database.as_str(),
                schema.as_str(),
                model.as_str(),
            ]),
            Self::TestCase { service, database, schema, table, column, test_case } => {
                let mut parts = vec![
                    service.as_str(),
                    database.as_str(),
                    schema.as_str(),
                    table.as_str(),
                ];
                if let Some(column) = column {
                    parts.push(column);
                }
                parts.push(test_case);
                Some(parts)
            }
            Self::User { .. } | Self::Team { .. } => None,
        }
    }
}
