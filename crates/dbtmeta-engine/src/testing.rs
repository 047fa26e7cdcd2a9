//! Mapping dbt tests onto catalog test suites, definitions, cases and results
//!
//! Three stages run in order over the test nodes:
//!
//! 1. [`TestMappingEngine::emit_suite_and_definitions`] yields the suites and
//!    definitions the catalog does not know yet, each name at most once.
//! 2. [`TestMappingEngine::emit_test_cases`] yields one case per table the
//!    test depends on, then attaches run results once it is exhausted.
//! 3. [`TestMappingEngine::attach_results`] submits the latest run result to
//!    every case a test produced.
//!
//! The caller forwards each request into the catalog as it is pulled, so
//! stage 2 can look up the suites and definitions created in stage 1.

use crate::context::IngestionContext;
use dbtmeta_core::{
    CreateTestCaseRequest, CreateTestDefinitionRequest, CreateTestSuiteRequest, EntityKind,
    EntityLink, EntityReference, Failure, Stage, TestCaseParameterDefinition,
    TestCaseParameterValue, TestCaseResult, TestCaseStatus, TestEntityType, TestPlatform,
    TestResultValue,
};
use dbtmeta_dbt::{ManifestNode, MergedArtifacts, RunResult, RunResults, TestMetadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Suite used by tests that do not name one in their `meta` block
pub const DEFAULT_TEST_SUITE: &str = "DBT_TEST_SUITE";

const SUITE_NAME_KEY: &str = "test_suite_name";
const SUITE_DESCRIPTION_KEYS: [&str; 2] = ["test_suite_description", "test_suite_desciption"];

/// A request produced by [`TestMappingEngine::emit_suite_and_definitions`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum TestSetupRequest {
    Suite(CreateTestSuiteRequest),
    Definition(CreateTestDefinitionRequest),
}

/// Outcome of attaching run results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachSummary {
    /// Results accepted by the catalog, one per test case
    pub submitted: usize,

    pub failures: Vec<Failure>,
}

/// Maps dbt test nodes onto the catalog's test model
#[derive(Clone, Copy)]
pub struct TestMappingEngine<'a> {
    ctx: &'a IngestionContext<'a>,
    artifacts: &'a MergedArtifacts,
    test_nodes: &'a BTreeMap<String, ManifestNode>,
    run_results: Option<&'a RunResults>,
}

impl<'a> TestMappingEngine<'a> {
    pub fn new(
        ctx: &'a IngestionContext<'a>,
        artifacts: &'a MergedArtifacts,
        test_nodes: &'a BTreeMap<String, ManifestNode>,
        run_results: Option<&'a RunResults>,
    ) -> Self {
        Self {
            ctx,
            artifacts,
            test_nodes,
            run_results,
        }
    }

    /// Create requests for suites and definitions missing from the catalog
    ///
    /// Names already emitted during this pass are not checked or emitted
    /// again, even if the catalog has not caught up with the first request.
    pub fn emit_suite_and_definitions(
        &self,
    ) -> impl Iterator<Item = Result<TestSetupRequest, Failure>> + 'a {
        info!("Processing DBT Tests Suites and Test Definitions");
        let ctx = self.ctx;
        let mut seen_suites = HashSet::new();
        let mut seen_definitions = HashSet::new();

        self.test_nodes.iter().flat_map(move |(key, node)| {
            let mut requests = Vec::new();

            let suite = suite_name(node);
            if !seen_suites.contains(&suite) {
                match ctx.exists(EntityKind::TestSuite, &suite, Stage::TestSetup, key) {
                    Ok(true) => {
                        debug!(suite = %suite, "Test suite already exists");
                        seen_suites.insert(suite);
                    }
                    Ok(false) => {
                        seen_suites.insert(suite.clone());
                        requests.push(Ok(TestSetupRequest::Suite(CreateTestSuiteRequest {
                            name: suite,
                            description: suite_description(node),
                        })));
                    }
                    Err(failure) => requests.push(Err(failure)),
                }
            }

            if !seen_definitions.contains(&node.name) {
                let definition = ctx
                    .exists(EntityKind::TestDefinition, &node.name, Stage::TestSetup, key)
                    .and_then(|exists| {
                        if exists {
                            Ok(None)
                        } else {
                            test_definition(key, node).map(Some)
                        }
                    });
                match definition {
                    Ok(Some(request)) => {
                        seen_definitions.insert(node.name.clone());
                        requests.push(Ok(TestSetupRequest::Definition(request)));
                    }
                    Ok(None) => {
                        debug!(definition = %node.name, "Test definition already exists");
                        seen_definitions.insert(node.name.clone());
                    }
                    Err(failure) => requests.push(Err(failure)),
                }
            }

            requests
        })
    }

    /// Create requests for one test case per table each test depends on
    ///
    /// Run results are attached once the returned sequence is exhausted; see
    /// [`TestCases::attachment`].
    pub fn emit_test_cases(&self) -> TestCases<'a> {
        info!("Processing DBT Tests Cases");
        let ctx = self.ctx;
        let artifacts = self.artifacts;
        let cases = self.test_nodes.iter().flat_map(move |(key, node)| {
            match test_cases_for(ctx, artifacts, key, node) {
                Ok(cases) => cases,
                Err(failure) => vec![Err(failure)],
            }
        });

        TestCases {
            engine: *self,
            cases: Box::new(cases),
            attachment: None,
        }
    }

    /// Submit run results to the test cases they belong to
    ///
    /// Does nothing when no run results were loaded.
    pub fn attach_results(&self) -> AttachSummary {
        let mut summary = AttachSummary::default();
        let Some(run_results) = self.run_results else {
            return summary;
        };

        info!("Processing DBT Tests Results");
        for (index, entry) in run_results.entries() {
            let result = match entry {
                Ok(result) => result,
                Err(e) => {
                    summary.failures.push(Failure::shape(
                        Stage::TestResult,
                        format!("results[{}]", index),
                        e.to_string(),
                    ));
                    continue;
                }
            };

            match self.attach_result(&result) {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        match outcome {
                            Ok(fqn) => {
                                debug!(test_case = %fqn, status = %result.status, "Attached test result");
                                summary.submitted += 1;
                            }
                            Err(failure) => summary.failures.push(failure),
                        }
                    }
                }
                Err(failure) => summary.failures.push(failure),
            }
        }

        summary
    }

    fn attach_result(&self, result: &RunResult) -> Result<Vec<Result<String, Failure>>, Failure> {
        let subject = result.unique_id.as_str();
        let Some(test_node) = self.test_nodes.get(subject) else {
            // `dbt build` also reports models, seeds and snapshots
            if self.artifacts.manifest_node(subject).is_some() || !subject.starts_with("test.") {
                debug!(node = subject, "Skipping run result of a non-test node");
                return Ok(Vec::new());
            }
            return Err(Failure::miss(Stage::TestResult, subject, "no test node for this run result"));
        };

        let status = TestCaseStatus::from_run_status(&result.status);
        let timestamp = result
            .completed_at_millis()
            .map_err(|e| Failure::shape(Stage::TestResult, subject, e.to_string()))?;

        let test_case_result = TestCaseResult {
            timestamp,
            test_case_status: status,
            test_result_value: vec![TestResultValue {
                name: result.unique_id.clone(),
                value: status.value().to_string(),
            }],
        };

        Ok(test_node
            .depends_on
            .nodes
            .iter()
            .map(|dependency| {
                let table = dependency_node(self.artifacts, dependency, Stage::TestResult, subject)?;
                let request = table.table_identifier().test_case_request(
                    self.ctx.service_name,
                    test_node.declared_column(),
                    &test_node.name,
                );
                let fqn = self.ctx.require_fqn(&request, Stage::TestResult, subject)?;

                self.ctx
                    .catalog
                    .submit_test_result(&fqn, &test_case_result)
                    .map_err(|e| Failure::external(Stage::TestResult, fqn.as_str(), e))?;
                Ok(fqn)
            })
            .collect())
    }
}

/// Lazy sequence of test case requests
///
/// Once the last case has been pulled, run results are attached and the
/// outcome is available from [`attachment`](Self::attachment).
pub struct TestCases<'a> {
    engine: TestMappingEngine<'a>,
    cases: Box<dyn Iterator<Item = Result<CreateTestCaseRequest, Failure>> + 'a>,
    attachment: Option<AttachSummary>,
}

impl TestCases<'_> {
    /// Result attachment outcome, once the sequence is exhausted
    pub fn attachment(&self) -> Option<&AttachSummary> {
        self.attachment.as_ref()
    }

    pub fn into_attachment(self) -> Option<AttachSummary> {
        self.attachment
    }
}

impl Iterator for TestCases<'_> {
    type Item = Result<CreateTestCaseRequest, Failure>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(case) = self.cases.next() {
            return Some(case);
        }
        if self.attachment.is_none() {
            self.attachment = Some(self.engine.attach_results());
        }
        None
    }
}

fn suite_name(node: &ManifestNode) -> String {
    node.meta
        .get(SUITE_NAME_KEY)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_TEST_SUITE)
        .to_string()
}

fn suite_description(node: &ManifestNode) -> String {
    SUITE_DESCRIPTION_KEYS
        .iter()
        .find_map(|key| node.meta.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn test_metadata<'n>(key: &str, node: &'n ManifestNode, stage: Stage) -> Result<&'n TestMetadata, Failure> {
    node.test_metadata
        .as_ref()
        .ok_or_else(|| Failure::shape(stage, key, "test node has no test_metadata"))
}

fn test_definition(key: &str, node: &ManifestNode) -> Result<CreateTestDefinitionRequest, Failure> {
    let metadata = test_metadata(key, node, Stage::TestSetup)?;
    let entity_type = match node.declared_column() {
        Some(_) => TestEntityType::Column,
        None => TestEntityType::Table,
    };

    Ok(CreateTestDefinitionRequest {
        name: node.name.clone(),
        description: node.description.clone().unwrap_or_default(),
        entity_type,
        test_platforms: vec![TestPlatform::Dbt],
        parameter_definition: vec![TestCaseParameterDefinition {
            name: metadata.name.clone(),
            display_name: metadata.name.clone(),
            required: false,
        }],
    })
}

/// The `values` argument joined with commas, empty when absent
fn parameter_value(metadata: &TestMetadata) -> String {
    match metadata.kwargs.get("values") {
        None | Some(Value::Null) => String::new(),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn dependency_node<'n>(
    artifacts: &'n MergedArtifacts,
    dependency: &str,
    stage: Stage,
    subject: &str,
) -> Result<&'n ManifestNode, Failure> {
    artifacts.manifest_node(dependency).ok_or_else(|| {
        Failure::shape(
            stage,
            subject,
            format!("dependency '{}' not found in manifest", dependency),
        )
    })
}

fn reference(
    ctx: &IngestionContext<'_>,
    kind: EntityKind,
    name: &str,
    subject: &str,
) -> Result<EntityReference, Failure> {
    Ok(ctx.require_entity(kind, name, Stage::TestCase, subject)?.reference())
}

fn test_cases_for(
    ctx: &IngestionContext<'_>,
    artifacts: &MergedArtifacts,
    key: &str,
    node: &ManifestNode,
) -> Result<Vec<Result<CreateTestCaseRequest, Failure>>, Failure> {
    let metadata = test_metadata(key, node, Stage::TestCase)?;
    let test_definition = reference(ctx, EntityKind::TestDefinition, &node.name, key)?;
    let test_suite = reference(ctx, EntityKind::TestSuite, &suite_name(node), key)?;
    let parameter_values = vec![TestCaseParameterValue {
        name: metadata.name.clone(),
        value: parameter_value(metadata),
    }];

    Ok(node
        .depends_on
        .nodes
        .iter()
        .map(|dependency| {
            let table = dependency_node(artifacts, dependency, Stage::TestCase, key)?;
            let request = table.table_identifier().table_request(ctx.service_name);
            let table_fqn = ctx.require_fqn(&request, Stage::TestCase, key)?;
            let entity_link = match node.declared_column() {
                Some(column) => EntityLink::column(table_fqn, column),
                None => EntityLink::table(table_fqn),
            };

            Ok(CreateTestCaseRequest {
                name: node.name.clone(),
                description: node.description.clone().unwrap_or_default(),
                test_definition: test_definition.clone(),
                entity_link,
                test_suite: test_suite.clone(),
                parameter_values: parameter_values.clone(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: Value) -> ManifestNode {
        ManifestNode::from_value(value).unwrap()
    }

    #[test]
    fn test_suite_name_from_meta() {
        let named = node(json!({
            "name": "unique_orders_id",
            "resource_type": "test",
            "meta": {"test_suite_name": "orders_suite", "test_suite_description": "Order checks"}
        }));
        assert_eq!(suite_name(&named), "orders_suite");
        assert_eq!(suite_description(&named), "Order checks");

        let legacy = node(json!({
            "name": "unique_orders_id",
            "resource_type": "test",
            "meta": {"test_suite_desciption": "Old spelling"}
        }));
        assert_eq!(suite_name(&legacy), DEFAULT_TEST_SUITE);
        assert_eq!(suite_description(&legacy), "Old spelling");
    }

    #[test]
    fn test_parameter_value_joins_values() {
        let metadata: TestMetadata = serde_json::from_value(json!({
            "name": "accepted_values",
            "kwargs": {"values": ["placed", "shipped", 3]}
        }))
        .unwrap();
        assert_eq!(parameter_value(&metadata), "placed,shipped,3");

        let metadata: TestMetadata = serde_json::from_value(json!({"name": "not_null"})).unwrap();
        assert_eq!(parameter_value(&metadata), "");
    }

    #[test]
    fn test_definition_entity_type() {
        let column_test = node(json!({
            "name": "not_null_orders_id",
            "resource_type": "test",
            "column_name": "id",
            "description": "id is never null",
            "test_metadata": {"name": "not_null", "kwargs": {}}
        }));
        let definition = test_definition("test.shop.not_null_orders_id", &column_test).unwrap();
        assert_eq!(definition.entity_type, TestEntityType::Column);
        assert_eq!(definition.description, "id is never null");
        assert_eq!(definition.test_platforms, vec![TestPlatform::Dbt]);
        assert_eq!(definition.parameter_definition[0].name, "not_null");
        assert!(!definition.parameter_definition[0].required);

        let table_test = node(json!({
            "name": "orders_row_count",
            "resource_type": "test",
            "test_metadata": {"name": "row_count"}
        }));
        let definition = test_definition("test.shop.orders_row_count", &table_test).unwrap();
        assert_eq!(definition.entity_type, TestEntityType::Table);
    }

    #[test]
    fn test_singular_test_is_a_shape_failure() {
        let singular = node(json!({"name": "assert_positive_total", "resource_type": "test"}));
        let failure = test_definition("test.shop.assert_positive_total", &singular).unwrap_err();
        assert_eq!(failure.kind, dbtmeta_core::FailureKind::Shape);
        assert_eq!(failure.stage, Stage::TestSetup);
    }
}
