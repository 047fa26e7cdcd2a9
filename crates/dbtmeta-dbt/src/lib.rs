//! dbt artifact parsing
//!
//! This crate handles:
//! - Parsing manifest.json, catalog.json and run_results.json
//! - Merging manifest and catalog into one keyed entity map per artifact

pub mod catalog;
pub mod manifest;
pub mod merge;
pub mod run_results;

pub use catalog::{CatalogArtifact, CatalogColumn, CatalogNode, CatalogTableMetadata};
pub use manifest::{ColumnDefinition, DependsOn, Manifest, ManifestError, ManifestMetadata, ManifestNode, TestMetadata};
pub use merge::{ArtifactMerger, MergedArtifacts};
pub use run_results::{parse_timestamp_millis, RunResult, RunResults, TimestampError, TimingEntry, EXECUTE_TIMING};
