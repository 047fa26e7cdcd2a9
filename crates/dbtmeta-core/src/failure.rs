//! Per-entity failure records
//!
//! A failure never aborts an ingestion run: the entity it concerns is skipped
//! and the failure is logged and collected into the run report.
//! Failure codes are part of the report format - add new codes, never rename.

use serde::{Deserialize, Serialize};

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// An artifact entity is missing a field, has the wrong shape, or a
    /// referenced id does not exist
    Shape,

    /// A name did not resolve to a catalog entity
    ResolutionMiss,

    /// The catalog client returned an error
    ExternalCall,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shape => "SHAPE",
            Self::ResolutionMiss => "RESOLUTION_MISS",
            Self::ExternalCall => "EXTERNAL_CALL",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ingestion stage that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Merge,
    DataModel,
    Lineage,
    TestSetup,
    TestCase,
    TestResult,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Merge => "merge",
            Self::DataModel => "data_model",
            Self::Lineage => "lineage",
            Self::TestSetup => "test_setup",
            Self::TestCase => "test_case",
            Self::TestResult => "test_result",
        };
        write!(f, "{}", name)
    }
}

/// A skipped entity and the reason it was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub stage: Stage,

    pub kind: FailureKind,

    /// Node id, FQN or other key identifying the skipped entity
    pub subject: String,

    pub message: String,
}

impl Failure {
    pub fn new(stage: Stage, kind: FailureKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn shape(stage: Stage, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(stage, FailureKind::Shape, subject, message)
    }

    pub fn miss(stage: Stage, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(stage, FailureKind::ResolutionMiss, subject, message)
    }

    /// Wrap an error raised by the catalog client
    pub fn external(stage: Stage, subject: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::new(stage, FailureKind::ExternalCall, subject, error.to_string())
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} {}: {}", self.stage, self.kind, self.subject, self.message)
    }
}
