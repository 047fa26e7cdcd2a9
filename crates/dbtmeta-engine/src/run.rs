//! One dbt ingestion run
//!
//! An [`IngestionRun`] owns everything derived from one set of artifacts: the
//! merged entity maps, the resolved data models and the test nodes. Stages
//! borrow from it and nothing outlives it, so repeated or concurrent runs
//! never share state.

use crate::context::IngestionContext;
use crate::drain;
use crate::lineage::LineageEmitter;
use crate::resolver::{DataModelResolver, ResolvedModels};
use crate::testing::{TestMappingEngine, TestSetupRequest};
use dbtmeta_catalog::RequestSink;
use dbtmeta_core::{
    AddLineageRequest, Config, CreateTestCaseRequest, CreateTestDefinitionRequest,
    CreateTestSuiteRequest, DataModel, Failure, RunReport, Stage,
};
use dbtmeta_dbt::{ArtifactMerger, CatalogArtifact, Manifest, ManifestNode, MergedArtifacts, RunResults};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Artifacts as loaded from disk; any of them may be missing
#[derive(Debug, Clone, Default)]
pub struct LoadedArtifacts {
    pub manifest: Option<Manifest>,
    pub catalog: Option<CatalogArtifact>,
    pub run_results: Option<RunResults>,
}

impl LoadedArtifacts {
    /// Load the artifacts named by the `[dbt]` section
    ///
    /// A file that cannot be read or parsed is logged and left out.
    pub fn from_config(config: &Config) -> Self {
        let Some(dbt) = &config.dbt else {
            return Self::default();
        };

        let manifest = Manifest::from_file(&config.resolve(&dbt.manifest))
            .map_err(|e| warn!("Failed to load dbt manifest: {}", e))
            .ok();
        let catalog = CatalogArtifact::from_file(&config.resolve(&dbt.catalog))
            .map_err(|e| warn!("Failed to load dbt catalog: {}", e))
            .ok();
        let run_results = dbt.run_results.as_ref().and_then(|path| {
            RunResults::from_file(&config.resolve(path))
                .map_err(|e| warn!("Failed to load dbt run results: {}", e))
                .ok()
        });

        Self {
            manifest,
            catalog,
            run_results,
        }
    }
}

/// Every request a run forwarded to the catalog, in emission order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmittedRequests {
    pub lineage: Vec<AddLineageRequest>,
    pub test_suites: Vec<CreateTestSuiteRequest>,
    pub test_definitions: Vec<CreateTestDefinitionRequest>,
    pub test_cases: Vec<CreateTestCaseRequest>,
}

/// State of one ingestion run
#[derive(Debug)]
pub struct IngestionRun<'a> {
    ctx: IngestionContext<'a>,
    artifacts: MergedArtifacts,
    resolved: ResolvedModels,
    run_results: Option<RunResults>,
}

impl<'a> IngestionRun<'a> {
    /// Merge the artifacts and resolve data models
    ///
    /// Returns `None`, and nothing downstream runs, unless the configuration
    /// has a `[dbt]` section and both manifest and catalog were loaded.
    pub fn prepare(ctx: IngestionContext<'a>, config: &Config, loaded: LoadedArtifacts) -> Option<Self> {
        if config.dbt.is_none() {
            info!("No dbt configuration, skipping dbt ingestion");
            return None;
        }

        let (Some(manifest), Some(catalog)) = (loaded.manifest, loaded.catalog) else {
            warn!("dbt manifest or catalog not available, skipping dbt ingestion");
            return None;
        };

        let artifacts = ArtifactMerger::merge(manifest, catalog);
        let resolved = DataModelResolver::new(&ctx, &artifacts).resolve_all();

        Some(Self {
            ctx,
            artifacts,
            resolved,
            run_results: loaded.run_results,
        })
    }

    pub fn context(&self) -> &IngestionContext<'a> {
        &self.ctx
    }

    pub fn artifacts(&self) -> &MergedArtifacts {
        &self.artifacts
    }

    /// Resolved data models keyed by fully qualified model name
    pub fn data_models(&self) -> &BTreeMap<String, DataModel> {
        &self.resolved.data_models
    }

    /// The data model built for a table, by the table's fully qualified name
    pub fn data_model(&self, table_fqn: &str) -> Option<&DataModel> {
        self.resolved.data_models.get(table_fqn)
    }

    pub fn test_nodes(&self) -> &BTreeMap<String, ManifestNode> {
        &self.resolved.test_nodes
    }

    /// Failures from merging and data model resolution
    pub fn preparation_failures(&self) -> impl Iterator<Item = &Failure> {
        self.artifacts.failures.iter().chain(&self.resolved.failures)
    }

    pub fn lineage(&self) -> LineageEmitter<'_> {
        LineageEmitter::new(&self.ctx, &self.resolved.data_models)
    }

    pub fn tests(&self) -> TestMappingEngine<'_> {
        TestMappingEngine::new(
            &self.ctx,
            &self.artifacts,
            &self.resolved.test_nodes,
            self.run_results.as_ref(),
        )
    }

    /// Pull every stage to completion, forwarding each request into `sink`
    ///
    /// Failures of any stage, including rejected requests, are logged and
    /// recorded in `report` together with per-stage counts.
    pub fn execute(&self, sink: &dyn RequestSink, report: &mut RunReport) -> EmittedRequests {
        let mut emitted = EmittedRequests::default();

        report.summary.data_models = self.data_models().len();
        for failure in self.preparation_failures() {
            drain::record(report, failure.clone());
        }

        let lineage_edges = drain::forward(self.lineage().emit(), report, |request| {
            sink.add_lineage(&request).map_err(|e| {
                let subject = format!("{} -> {}", request.edge.from_entity.id, request.edge.to_entity.id);
                Failure::external(Stage::Lineage, subject, e)
            })?;
            emitted.lineage.push(request);
            Ok(())
        });
        report.summary.lineage_edges = lineage_edges;

        let tests = self.tests();
        drain::forward(tests.emit_suite_and_definitions(), report, |request| {
            match request {
                TestSetupRequest::Suite(suite) => {
                    sink.create_test_suite(&suite)
                        .map_err(|e| Failure::external(Stage::TestSetup, suite.name.as_str(), e))?;
                    emitted.test_suites.push(suite);
                }
                TestSetupRequest::Definition(definition) => {
                    sink.create_test_definition(&definition)
                        .map_err(|e| Failure::external(Stage::TestSetup, definition.name.as_str(), e))?;
                    emitted.test_definitions.push(definition);
                }
            }
            Ok(())
        });
        report.summary.test_suites = emitted.test_suites.len();
        report.summary.test_definitions = emitted.test_definitions.len();

        let mut cases = tests.emit_test_cases();
        let test_cases = drain::forward(&mut cases, report, |request| {
            sink.create_test_case(&request).map_err(|e| {
                Failure::external(Stage::TestCase, request.entity_link.to_string(), e)
            })?;
            emitted.test_cases.push(request);
            Ok(())
        });
        report.summary.test_cases = test_cases;

        if let Some(attachment) = cases.into_attachment() {
            report.summary.test_results = attachment.submitted;
            for failure in attachment.failures {
                drain::record(report, failure);
            }
        }

        info!(
            data_models = report.summary.data_models,
            lineage_edges = report.summary.lineage_edges,
            test_cases = report.summary.test_cases,
            test_results = report.summary.test_results,
            failures = report.summary.failures,
            "dbt ingestion finished"
        );
        emitted
    }
}
