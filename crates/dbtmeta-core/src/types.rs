//! Semantic column types and resolved columns

use serde::{Deserialize, Serialize};

/// Semantic data type of a column as understood by the metadata catalog
///
/// Warehouse-specific type strings from the dbt catalog are mapped onto this
/// portable representation by a [`TypeParser`](crate::TypeParser).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataType {
    /// Boolean type
    Boolean,

    /// Small integer types (smallint, tinyint, int2)
    Smallint,

    /// 32-bit integer types
    Int,

    /// 64-bit integer types
    Bigint,

    /// Floating point (any precision)
    Float,

    /// Decimal with precision and scale
    Decimal {
        precision: Option<u16>,
        scale: Option<u16>,
    },

    /// Variable length string, with optional declared length
    Varchar { length: Option<u32> },

    /// Fixed length string
    Char { length: Option<u32> },

    /// Unbounded text
    Text,

    /// Date (no time component)
    Date,

    /// Time of day
    Time,

    /// Timestamp (with time component)
    Timestamp,

    /// Raw bytes
    Binary,

    /// JSON/Variant type
    Json,

    /// Structured type
    Struct,

    /// Array type
    Array { element_type: Box<DataType> },

    /// Type string not recognised
    Unknown,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Smallint => write!(f, "SMALLINT"),
            Self::Int => write!(f, "INT"),
            Self::Bigint => write!(f, "BIGINT"),
            Self::Float => write!(f, "FLOAT"),
            Self::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => write!(f, "DECIMAL({}, {})", p, s),
                (Some(p), None) => write!(f, "DECIMAL({})", p),
                _ => write!(f, "DECIMAL"),
            },
            Self::Varchar { length: Some(n) } => write!(f, "VARCHAR({})", n),
            Self::Varchar { length: None } => write!(f, "VARCHAR"),
            Self::Char { length: Some(n) } => write!(f, "CHAR({})", n),
            Self::Char { length: None } => write!(f, "CHAR"),
            Self::Text => write!(f, "TEXT"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Binary => write!(f, "BINARY"),
            Self::Json => write!(f, "JSON"),
            Self::Struct => write!(f, "STRUCT"),
            Self::Array { element_type } => write!(f, "ARRAY<{}>", element_type),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A column of a data model, joined from manifest and catalog metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name (lower-cased)
    pub name: String,

    /// Documentation, manifest text first, catalog comment second
    pub description: Option<String>,

    /// Semantic type
    pub data_type: DataType,

    /// Placeholder length, always 1 for dbt columns
    pub data_length: u32,

    /// Ordinal position copied from the catalog index
    pub ordinal_position: u32,
}

impl Column {
    /// Create a column; the name is lower-cased
    pub fn new(name: impl AsRef<str>, data_type: DataType, ordinal_position: u32) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            description: None,
            data_type,
            data_length: 1,
            ordinal_position,
        }
    }

    /// Set description; empty text is treated as absent
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }
}
