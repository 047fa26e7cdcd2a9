//! Entity links
//!
//! A test case addresses the table or column it checks with a link string:
//! `<#E::table::{table_fqn}>` or `<#E::table::{table_fqn}::columns::{column}>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "<#E::table::";
const COLUMN_SEPARATOR: &str = "::columns::";

/// Synthetic address of a table or one of its columns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EntityLink {
    pub table_fqn: String,
    pub column: Option<String>,
}

impl EntityLink {
    pub fn table(table_fqn: impl Into<String>) -> Self {
        Self {
            table_fqn: table_fqn.into(),
            column: None,
        }
    }

    pub fn column(table_fqn: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table_fqn: table_fqn.into(),
            column: Some(column.into()),
        }
    }
}

impl fmt::Display for EntityLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}{}{}{}>", PREFIX, self.table_fqn, COLUMN_SEPARATOR, column),
            None => write!(f, "{}{}>", PREFIX, self.table_fqn),
        }
    }
}

/// Entity link parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid entity link: {0}")]
pub struct EntityLinkError(pub String);

impl FromStr for EntityLink {
    type Err = EntityLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix('>'))
            .filter(|body| !body.is_empty())
            .ok_or_else(|| EntityLinkError(s.to_string()))?;

        match body.split_once(COLUMN_SEPARATOR) {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Ok(Self::column(table, column))
            }
            Some(_) => Err(EntityLinkError(s.to_string())),
            None => Ok(Self::table(body)),
        }
    }
}

impl From<EntityLink> for String {
    fn from(link: EntityLink) -> Self {
        link.to_string()
    }
}

impl TryFrom<String> for EntityLink {
    type Error = EntityLinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
