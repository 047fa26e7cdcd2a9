//! Data model resolution
//!
//! Turns every non-test manifest node into a [`DataModel`] keyed by its fully
//! qualified name. Test nodes are routed aside for the test mapping stage.
//! A node that fails to resolve is skipped and reported; the batch continues.

use crate::context::IngestionContext;
use crate::owner::OwnerResolver;
use dbtmeta_core::{Column, DataModel, Failure, ModelType, Stage};
use dbtmeta_dbt::{CatalogNode, ManifestNode, MergedArtifacts};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Output of [`DataModelResolver::resolve_all`]
#[derive(Debug, Clone, Default)]
pub struct ResolvedModels {
    /// Data models keyed by fully qualified model name
    pub data_models: BTreeMap<String, DataModel>,

    /// Test nodes keyed by unique id
    pub test_nodes: BTreeMap<String, ManifestNode>,

    /// Nodes and dependencies that were skipped
    pub failures: Vec<Failure>,
}

/// Resolves manifest nodes into data models
pub struct DataModelResolver<'a> {
    ctx: &'a IngestionContext<'a>,
    artifacts: &'a MergedArtifacts,
    owners: OwnerResolver,
}

impl<'a> DataModelResolver<'a> {
    pub fn new(ctx: &'a IngestionContext<'a>, artifacts: &'a MergedArtifacts) -> Self {
        Self {
            ctx,
            artifacts,
            owners: OwnerResolver::default(),
        }
    }

    pub fn with_owner_resolver(mut self, owners: OwnerResolver) -> Self {
        self.owners = owners;
        self
    }

    /// Resolve every node of the merged manifest
    pub fn resolve_all(&self) -> ResolvedModels {
        info!("Parsing data models");
        let mut resolved = ResolvedModels::default();

        for (key, node) in &self.artifacts.manifest_entities {
            if node.is_test() {
                resolved.test_nodes.insert(key.clone(), node.clone());
                continue;
            }

            match self.resolve_node(key, node, &mut resolved.failures) {
                Ok((fqn, model)) => {
                    debug!(node = %key, fqn = %fqn, "Resolved data model");
                    resolved.data_models.insert(fqn, model);
                }
                Err(failure) => resolved.failures.push(failure),
            }
        }

        info!(
            data_models = resolved.data_models.len(),
            test_nodes = resolved.test_nodes.len(),
            "Data models resolved"
        );
        resolved
    }

    fn resolve_node(
        &self,
        key: &str,
        node: &ManifestNode,
        failures: &mut Vec<Failure>,
    ) -> Result<(String, DataModel), Failure> {
        let catalog_node = self.artifacts.catalog_node(key);
        let columns = self.resolve_columns(node, catalog_node, failures);

        let mut upstream = Vec::new();
        for dependency in self.resolve_upstream(node) {
            match dependency {
                Ok(fqn) => upstream.push(fqn),
                Err(failure) => failures.push(failure),
            }
        }

        let owner = catalog_node
            .and_then(|c| c.owner())
            .and_then(|owner| self.owners.resolve(self.ctx, owner));

        let raw_sql = node.raw_sql.clone().unwrap_or_default();
        let model = DataModel {
            model_type: ModelType::Dbt,
            description: node.description_text().map(str::to_string),
            path: node.source_path(),
            sql: node.compiled_sql.clone().unwrap_or_else(|| raw_sql.clone()),
            raw_sql,
            columns,
            upstream,
            owner,
        };

        let request = node.table_identifier().data_model_request(self.ctx.service_name);
        let fqn = self.ctx.require_fqn(&request, Stage::DataModel, key)?;

        Ok((fqn, model))
    }

    /// Join catalog columns with manifest documentation
    ///
    /// Columns come back in catalog index order with the index copied as the
    /// ordinal position. A node with no catalog counterpart has no columns.
    /// A catalog column that does not parse is left out and pushed onto
    /// `failures`.
    pub fn resolve_columns(
        &self,
        node: &ManifestNode,
        catalog_node: Option<&CatalogNode>,
        failures: &mut Vec<Failure>,
    ) -> Vec<Column> {
        let Some(catalog_node) = catalog_node else {
            return Vec::new();
        };

        let mut columns = Vec::with_capacity(catalog_node.columns.len());
        for (key, parsed) in catalog_node.parsed_columns() {
            let catalog_column = match parsed {
                Ok(column) => column,
                Err(e) => {
                    failures.push(Failure::shape(
                        Stage::DataModel,
                        format!("{}.{}", node.unique_id, key),
                        format!("malformed catalog column: {}", e),
                    ));
                    continue;
                }
            };

            let data_type = self.ctx.type_parser.resolve_type(&catalog_column.data_type);
            let description = node
                .column_description(&catalog_column.name)
                .or_else(|| catalog_column.comment.as_deref().filter(|c| !c.is_empty()))
                .map(str::to_string);

            columns.push(
                Column::new(&catalog_column.name, data_type, catalog_column.index)
                    .with_description(description),
            );
        }

        columns.sort_by_key(|c| c.ordinal_position);
        columns
    }

    /// Fully qualified table names of a node's dependencies, in declaration order
    ///
    /// Each dependency resolves independently; a missing one yields a failure
    /// without affecting the rest.
    pub fn resolve_upstream(&self, node: &ManifestNode) -> Vec<Result<String, Failure>> {
        node.depends_on
            .nodes
            .iter()
            .map(|dependency| {
                let upstream = self.artifacts.manifest_node(dependency).ok_or_else(|| {
                    Failure::shape(
                        Stage::DataModel,
                        dependency.as_str(),
                        format!("dependency of '{}' not found in manifest", node.unique_id),
                    )
                })?;

                let request = upstream.table_identifier().table_request(self.ctx.service_name);
                self.ctx.require_fqn(&request, Stage::DataModel, dependency)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtmeta_catalog::InMemoryCatalogBuilder;
    use dbtmeta_core::{DataType, FailureKind};
    use dbtmeta_dbt::{ArtifactMerger, CatalogArtifact, Manifest};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn merged(manifest: serde_json::Value, catalog: serde_json::Value) -> MergedArtifacts {
        let manifest = Manifest::from_str(&manifest.to_string()).unwrap();
        let catalog = CatalogArtifact::from_str(&catalog.to_string()).unwrap();
        ArtifactMerger::merge(manifest, catalog)
    }

    fn orders_artifacts() -> MergedArtifacts {
        merged(
            json!({
                "nodes": {
                    "model.shop.orders": {
                        "unique_id": "model.shop.orders",
                        "name": "orders",
                        "resource_type": "model",
                        "database": "analytics",
                        "schema": "marts",
                        "raw_sql": "select * from {{ ref('stg_orders') }}",
                        "description": "",
                        "root_path": "/repo",
                        "original_file_path": "models/orders.sql",
                        "depends_on": {"nodes": ["model.shop.stg_orders", "model.shop.missing"]},
                        "columns": {"id": {"name": "id", "description": "Primary key"}}
                    },
                    "model.shop.stg_orders": {
                        "unique_id": "model.shop.stg_orders",
                        "name": "stg_orders",
                        "alias": "orders_staging",
                        "resource_type": "model",
                        "original_file_path": "models/stg_orders.sql"
                    },
                    "test.shop.not_null_orders_id": {
                        "unique_id": "test.shop.not_null_orders_id",
                        "name": "not_null_orders_id",
                        "resource_type": "test",
                        "original_file_path": "models/schema.yml"
                    }
                },
                "sources": {}
            }),
            json!({
                "nodes": {
                    "model.shop.orders": {
                        "metadata": {"type": "table", "owner": "alice"},
                        "columns": {
                            "AMOUNT": {"name": "AMOUNT", "type": "NUMERIC(10,2)", "index": 2, "comment": "Order total"},
                            "ID": {"name": "ID", "type": "INTEGER", "index": 1, "comment": "catalog comment"}
                        }
                    }
                },
                "sources": {}
            }),
        )
    }

    #[test]
    fn test_resolve_all() {
        let catalog = InMemoryCatalogBuilder::new().with_user("alice").build();
        let ctx = IngestionContext::new("svc", &catalog, &catalog);
        let artifacts = orders_artifacts();

        let resolved = DataModelResolver::new(&ctx, &artifacts).resolve_all();

        assert_eq!(resolved.data_models.len(), 2);
        assert_eq!(resolved.test_nodes.len(), 1);
        assert!(resolved.test_nodes.contains_key("test.shop.not_null_orders_id"));

        let orders = &resolved.data_models["svc.analytics.marts.orders"];
        assert_eq!(orders.model_type, ModelType::Dbt);
        assert_eq!(orders.description, None);
        assert_eq!(orders.path, "/repo/models/orders.sql");
        assert_eq!(orders.sql, "select * from {{ ref('stg_orders') }}");
        assert_eq!(orders.upstream, vec!["svc.default.default.orders_staging".to_string()]);
        assert_eq!(orders.owner.as_ref().unwrap().entity_type, "user");

        // The missing dependency is reported but does not drop the node
        assert_eq!(resolved.failures.len(), 1);
        assert_eq!(resolved.failures[0].kind, FailureKind::Shape);
        assert_eq!(resolved.failures[0].subject, "model.shop.missing");

        let staging = &resolved.data_models["svc.default.default.orders_staging"];
        assert!(staging.columns.is_empty());
        assert!(staging.owner.is_none());
    }

    #[test]
    fn test_resolve_columns() {
        let catalog = InMemoryCatalogBuilder::new().build();
        let ctx = IngestionContext::new("svc", &catalog, &catalog);
        let artifacts = orders_artifacts();
        let resolver = DataModelResolver::new(&ctx, &artifacts);

        let node = artifacts.manifest_node("model.shop.orders").unwrap();
        let mut failures = Vec::new();
        let columns = resolver.resolve_columns(node, artifacts.catalog_node("model.shop.orders"), &mut failures);

        assert!(failures.is_empty());
        assert_eq!(columns.len(), 2);

        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].ordinal_position, 1);
        assert_eq!(columns[0].data_type, DataType::Int);
        assert_eq!(columns[0].description.as_deref(), Some("Primary key"));
        assert_eq!(columns[0].data_length, 1);

        assert_eq!(columns[1].name, "amount");
        assert_eq!(columns[1].ordinal_position, 2);
        assert_eq!(columns[1].data_type, DataType::Decimal { precision: Some(10), scale: Some(2) });
        assert_eq!(columns[1].description.as_deref(), Some("Order total"));
    }

    #[test]
    fn test_malformed_column_is_skipped() {
        let catalog = InMemoryCatalogBuilder::new().with_user("alice").build();
        let ctx = IngestionContext::new("svc", &catalog, &catalog);
        let artifacts = merged(
            json!({
                "nodes": {
                    "model.shop.orders": {
                        "unique_id": "model.shop.orders",
                        "name": "orders",
                        "resource_type": "model",
                        "database": "analytics",
                        "schema": "marts"
                    }
                },
                "sources": {}
            }),
            json!({
                "nodes": {
                    "model.shop.orders": {
                        "metadata": {"owner": "alice"},
                        "columns": {
                            "ID": {"name": "ID", "type": "INTEGER", "index": 1},
                            "BAD": {"name": "BAD", "type": null, "index": 2}
                        }
                    }
                },
                "sources": {}
            }),
        );

        let resolved = DataModelResolver::new(&ctx, &artifacts).resolve_all();

        assert!(artifacts.failures.is_empty());
        let orders = &resolved.data_models["svc.analytics.marts.orders"];
        assert_eq!(orders.columns.len(), 1);
        assert_eq!(orders.columns[0].name, "id");
        assert_eq!(orders.owner.as_ref().unwrap().entity_type, "user");

        assert_eq!(resolved.failures.len(), 1);
        assert_eq!(resolved.failures[0].kind, FailureKind::Shape);
        assert_eq!(resolved.failures[0].stage, Stage::DataModel);
        assert_eq!(resolved.failures[0].subject, "model.shop.orders.BAD");
    }

    #[test]
    fn test_missing_fqn_skips_node() {
        struct NoDataModels;

        impl dbtmeta_catalog::FqnBuilder for NoDataModels {
            fn build(
                &self,
                request: &dbtmeta_core::FqnRequest,
            ) -> Result<Option<String>, dbtmeta_catalog::CatalogError> {
                match request {
                    dbtmeta_core::FqnRequest::DataModel { model, .. } if model == "orders" => Ok(None),
                    other => Ok(other.hierarchy().map(|parts| dbtmeta_core::fqn::join(parts.as_slice()))),
                }
            }
        }

        let catalog = InMemoryCatalogBuilder::new().build();
        let builder = NoDataModels;
        let ctx = IngestionContext::new("svc", &catalog, &builder);
        let artifacts = orders_artifacts();

        let resolved = DataModelResolver::new(&ctx, &artifacts).resolve_all();

        assert_eq!(resolved.data_models.len(), 1);
        assert!(resolved
            .failures
            .iter()
            .any(|f| f.subject == "model.shop.orders" && f.kind == FailureKind::ResolutionMiss));
    }

    #[test]
    fn test_upstream_preserves_declaration_order() {
        let catalog = InMemoryCatalogBuilder::new().build();
        let ctx = IngestionContext::new("svc", &catalog, &catalog);
        let artifacts = orders_artifacts();
        let resolver = DataModelResolver::new(&ctx, &artifacts);

        let node = artifacts.manifest_node("model.shop.orders").unwrap();
        let upstream = resolver.resolve_upstream(node);

        assert_eq!(upstream.len(), node.depends_on.nodes.len());
        assert_eq!(upstream[0].as_ref().unwrap(), "svc.default.default.orders_staging");
        assert!(upstream[1].is_err());
    }
}
