//! Requests produced for the metadata catalog
//!
//! Payload shapes follow the catalog's JSON API (camelCase field names).

use crate::entity::EntityReference;
use crate::entity_link::EntityLink;
use serde::{Deserialize, Serialize};

/// Directed edge between two catalog entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitiesEdge {
    pub from_entity: EntityReference,
    pub to_entity: EntityReference,
}

/// Add one lineage edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineageRequest {
    pub edge: EntitiesEdge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTestSuiteRequest {
    pub name: String,
    pub description: String,
}

/// Entity type a test definition applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestEntityType {
    Table,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestPlatform {
    #[serde(rename = "DBT")]
    Dbt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseParameterDefinition {
    pub name: String,
    pub display_name: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestDefinitionRequest {
    pub name: String,
    pub description: String,
    pub entity_type: TestEntityType,
    pub test_platforms: Vec<TestPlatform>,
    pub parameter_definition: Vec<TestCaseParameterDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseParameterValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestCaseRequest {
    pub name: String,
    pub description: String,
    pub test_definition: EntityReference,
    pub entity_link: EntityLink,
    pub test_suite: EntityReference,
    pub parameter_values: Vec<TestCaseParameterValue>,
}

/// Outcome of a test execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestCaseStatus {
    Success,
    Failed,
    Aborted,
}

impl TestCaseStatus {
    /// Map a dbt run-result status; anything but `success`/`failure` is aborted
    pub fn from_run_status(status: &str) -> Self {
        match status {
            "success" => Self::Success,
            "failure" => Self::Failed,
            _ => Self::Aborted,
        }
    }

    /// Numeric result value recorded alongside the status
    pub fn value(&self) -> i32 {
        match self {
            Self::Success => 1,
            Self::Failed => 0,
            Self::Aborted => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    /// Completion time, epoch milliseconds
    pub timestamp: Option<i64>,
    pub test_case_status: TestCaseStatus,
    pub test_result_value: Vec<TestResultValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_total() {
        assert_eq!(TestCaseStatus::from_run_status("success"), TestCaseStatus::Success);
        assert_eq!(TestCaseStatus::from_run_status("failure"), TestCaseStatus::Failed);
        assert_eq!(TestCaseStatus::from_run_status("error"), TestCaseStatus::Aborted);
        assert_eq!(TestCaseStatus::from_run_status("skipped"), TestCaseStatus::Aborted);
        assert_eq!(TestCaseStatus::from_run_status(""), TestCaseStatus::Aborted);

        assert_eq!(TestCaseStatus::Success.value(), 1);
        assert_eq!(TestCaseStatus::Failed.value(), 0);
        assert_eq!(TestCaseStatus::Aborted.value(), -1);
    }

    #[test]
    fn definition_serialization() {
        let request = CreateTestDefinitionRequest {
            name: "unique_orders_id".to_string(),
            description: String::new(),
            entity_type: TestEntityType::Column,
            test_platforms: vec![TestPlatform::Dbt],
            parameter_definition: vec![TestCaseParameterDefinition {
                name: "unique".to_string(),
                display_name: "unique".to_string(),
                required: false,
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["entityType"], "COLUMN");
        assert_eq!(json["testPlatforms"][0], "DBT");
        assert_eq!(json["parameterDefinition"][0]["displayName"], "unique");
    }
}
