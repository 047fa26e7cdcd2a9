//! dbtmeta engine - dbt ingestion stages
//!
//! This crate turns merged dbt artifacts into catalog content:
//! - Data model resolution (columns, upstream tables, owner)
//! - Lineage edges between tables
//! - Test suites, definitions, cases and results
//!
//! Every stage isolates failures per entity; see [`drain`].

pub mod context;
pub mod drain;
pub mod lineage;
pub mod owner;
pub mod resolver;
pub mod run;
pub mod testing;

pub use context::IngestionContext;
pub use lineage::LineageEmitter;
pub use owner::{OwnerResolver, OwnerStrategy};
pub use resolver::{DataModelResolver, ResolvedModels};
pub use run::{EmittedRequests, IngestionRun, LoadedArtifacts};
pub use testing::{AttachSummary, TestCases, TestMappingEngine, TestSetupRequest, DEFAULT_TEST_SUITE};
