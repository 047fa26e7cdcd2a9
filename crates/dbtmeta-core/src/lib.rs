//! dbtmeta core
//!
//! Domain model shared by every dbtmeta crate: semantic column types, data
//! models, catalog entities and request payloads, fully qualified names,
//! failure records and the run report.
//! Failure codes and the report layout are part of the public API.

pub mod config;
pub mod entity;
pub mod entity_link;
pub mod failure;
pub mod fqn;
pub mod report;
pub mod requests;
pub mod type_parser;
pub mod types;

pub use config::{Config, ConfigError, DbtConfig, SERVICE_NAME_ENV};
pub use entity::{DataModel, Entity, EntityId, EntityKind, EntityReference, ModelType};
pub use entity_link::{EntityLink, EntityLinkError};
pub use failure::{Failure, FailureKind, Stage};
pub use fqn::{FqnRequest, TableIdentifier, DEFAULT_NAMESPACE};
pub use report::{ReportVersion, RunReport, RunSummary};
pub use requests::{
    AddLineageRequest, CreateTestCaseRequest, CreateTestDefinitionRequest, CreateTestSuiteRequest,
    EntitiesEdge, TestCaseParameterDefinition, TestCaseParameterValue, TestCaseResult,
    TestCaseStatus, TestEntityType, TestPlatform, TestResultValue,
};
pub use type_parser::{SqlTypeParser, TypeParser};
pub use types::{Column, DataType};
