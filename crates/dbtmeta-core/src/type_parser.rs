//! Column type string parsing
//!
//! Maps warehouse type strings found in the dbt catalog (`"character varying(256)"`,
//! `"NUMBER(38,0)"`, `"ARRAY<STRING>"`) onto [`DataType`].

use crate::types::DataType;
use regex::Regex;
use std::sync::OnceLock;

/// Resolves raw warehouse type strings to semantic types
///
/// Implementations must be pure and must not fail: unrecognised input maps
/// to [`DataType::Unknown`].
pub trait TypeParser: Send + Sync {
    fn resolve_type(&self, raw_type: &str) -> DataType;
}

/// Default parser covering the common ANSI, Postgres, Snowflake and BigQuery spellings
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlTypeParser;

static TYPE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn type_pattern() -> &'static Regex {
    TYPE_PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([a-z_][a-z0-9_ ]*?)\s*(?:\(([^)]*)\)|<(.*)>)?\s*(?:\[\])?\s*$")
            .expect("valid regex")
    })
}

impl SqlTypeParser {
    /// Split a type string into base name, parenthesised params and angle-bracket element
    fn split(lower: &str) -> Option<(String, Vec<String>, Option<String>)> {
        let captures = type_pattern().captures(lower)?;
        let base = captures.get(1)?.as_str().trim().to_string();
        let params = captures
            .get(2)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let element = captures.get(3).map(|m| m.as_str().trim().to_string());
        Some((base, params, element))
    }
}

impl TypeParser for SqlTypeParser {
    fn resolve_type(&self, raw_type: &str) -> DataType {
        let lower = raw_type.trim().to_lowercase();

        // Postgres array suffix: integer[]
        if let Some(inner) = lower.strip_suffix("[]") {
            return DataType::Array {
                element_type: Box::new(self.resolve_type(inner)),
            };
        }

        let Some((base, params, element)) = Self::split(&lower) else {
            return DataType::Unknown;
        };

        let length = params.first().and_then(|p| p.parse().ok());

        match base.as_str() {
            "bool" | "boolean" => DataType::Boolean,

            "smallint" | "tinyint" | "int2" | "byteint" => DataType::Smallint,
            "int" | "integer" | "int4" | "mediumint" => DataType::Int,
            "bigint" | "int8" | "int64" | "long" => DataType::Bigint,

            "float" | "float4" | "float8" | "float64" | "double" | "double precision" | "real" => {
                DataType::Float
            }

            "decimal" | "numeric" | "number" | "bignumeric" => DataType::Decimal {
                precision: params.first().and_then(|p| p.parse().ok()),
                scale: params.get(1).and_then(|s| s.parse().ok()),
            },

            "varchar" | "character varying" | "nvarchar" | "string" => DataType::Varchar { length },
            "char" | "character" | "nchar" | "bpchar" => DataType::Char { length },
            "text" | "clob" => DataType::Text,

            "date" => DataType::Date,
            "time" | "time without time zone" | "time with time zone" => DataType::Time,
            "timestamp"
            | "datetime"
            | "timestamp_ntz"
            | "timestamp_ltz"
            | "timestamp_tz"
            | "timestamptz"
            | "timestamp without time zone"
            | "timestamp with time zone" => DataType::Timestamp,

            "binary" | "varbinary" | "bytea" | "bytes" | "blob" => DataType::Binary,

            "json" | "jsonb" | "variant" | "object" | "super" => DataType::Json,

            "struct" | "record" => DataType::Struct,

            "array" => DataType::Array {
                element_type: Box::new(
                    element
                        .map(|e| self.resolve_type(&e))
                        .unwrap_or(DataType::Unknown),
                ),
            },

            _ => DataType::Unknown,
        }
    }
}
