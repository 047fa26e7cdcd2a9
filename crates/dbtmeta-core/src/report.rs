//! Run report (stable v1)
//!
//! Summarises one ingestion run: how many records of each kind were emitted
//! and which entities were skipped. Breaking changes require a new version.

use crate::failure::{Failure, FailureKind};
use serde::{Deserialize, Serialize};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Emission counts for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub data_models: usize,
    pub lineage_edges: usize,
    pub test_suites: usize,
    pub test_definitions: usize,
    pub test_cases: usize,
    pub test_results: usize,

    /// Number of skipped entities
    pub failures: usize,
}

/// Ingestion run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub generated_at: String,

    /// Source qualifier the run ingested into
    pub service_name: String,

    pub summary: RunSummary,

    /// Every skipped entity, in the order it was encountered
    pub failures: Vec<Failure>,
}

impl RunReport {
    /// Create a new empty report
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            generated_at: chrono::Utc::now().to_rfc3339(),
            service_name: service_name.into(),
            summary: RunSummary::default(),
            failures: Vec::new(),
        }
    }

    /// Record a skipped entity
    pub fn record_failure(&mut self, failure: Failure) {
        self.summary.failures += 1;
        self.failures.push(failure);
    }

    /// Failures of one kind
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    /// Whether every entity made it through
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Stage;

    #[test]
    fn empty_report() {
        let report = RunReport::new("warehouse");
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary, RunSummary::default());
        assert!(report.is_complete());
    }

    #[test]
    fn report_with_failures() {
        let mut report = RunReport::new("warehouse");
        report.record_failure(Failure::shape(Stage::Merge, "model.p.bad", "missing field `name`"));
        report.record_failure(Failure::miss(Stage::Lineage, "warehouse.db.s.t", "table not found"));

        assert_eq!(report.summary.failures, 2);
        assert_eq!(report.failures_of(FailureKind::Shape).count(), 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn report_serialization() {
        let report = RunReport::new("warehouse");
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"failures\""));
        assert!(json.contains("\"warehouse\""));
    }

    #[test]
    fn report_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        RunReport::new("warehouse").save_to_file(&path).unwrap();

        let parsed: RunReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.service_name, "warehouse");
    }
}
