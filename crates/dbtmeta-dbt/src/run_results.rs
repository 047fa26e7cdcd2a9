//! dbt run_results.json parsing

use crate::manifest::ManifestError;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Timing entry whose completion marks the end of a test execution
pub const EXECUTE_TIMING: &str = "execute";

/// dbt run_results.json structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    /// One raw record per executed node
    #[serde(default)]
    pub results: Vec<Value>,
}

impl RunResults {
    /// Load run results from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse run results from JSON string
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(json).map_err(|e| ManifestError::ParseError(e.to_string()))
    }

    /// Parse each record independently; the index identifies records that fail
    pub fn entries(&self) -> impl Iterator<Item = (usize, Result<RunResult, serde_json::Error>)> + '_ {
        self.results
            .iter()
            .enumerate()
            .map(|(index, value)| (index, serde_json::from_value(value.clone())))
    }
}

/// Execution outcome of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub unique_id: String,

    /// `success`, `failure`, `error`, `skipped`, `warn`, `pass`, `fail`, ...
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub timing: Vec<TimingEntry>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub failures: Option<i64>,

    #[serde(default)]
    pub execution_time: f64,
}

impl RunResult {
    /// Completion time of the last `execute` timing entry
    pub fn execute_completed_at(&self) -> Option<&str> {
        self.timing
            .iter()
            .filter(|t| t.name == EXECUTE_TIMING)
            .filter_map(|t| t.completed_at.as_deref())
            .last()
    }

    /// Completion time as epoch milliseconds; `None` without execute timing
    pub fn completed_at_millis(&self) -> Result<Option<i64>, TimestampError> {
        self.execute_completed_at().map(parse_timestamp_millis).transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEntry {
    pub name: String,

    #[serde(default)]
    pub started_at: Option<String>,

    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid timestamp '{0}'")]
pub struct TimestampError(pub String);

/// Convert a dbt timestamp (`2023-01-01T00:00:00.000000Z`) to epoch milliseconds
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_timestamp_millis(value: &str) -> Result<i64, TimestampError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.timestamp_millis());
    }

    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp_millis())
        .map_err(|_| TimestampError(value.to_string()))
}
