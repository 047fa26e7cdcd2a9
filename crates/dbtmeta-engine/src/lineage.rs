//! Lineage edges between upstream tables and the models built from them

use crate::context::IngestionContext;
use dbtmeta_core::{
    AddLineageRequest, DataModel, EntitiesEdge, EntityKind, EntityReference, Failure, Stage,
};
use std::collections::BTreeMap;
use tracing::info;

/// Emits one lineage edge per (model, upstream table) pair
///
/// Emission is lazy and can be restarted: every call to [`emit`](Self::emit)
/// walks the data model map again and touches nothing but catalog lookups.
pub struct LineageEmitter<'a> {
    ctx: &'a IngestionContext<'a>,
    data_models: &'a BTreeMap<String, DataModel>,
}

impl<'a> LineageEmitter<'a> {
    pub fn new(ctx: &'a IngestionContext<'a>, data_models: &'a BTreeMap<String, DataModel>) -> Self {
        Self { ctx, data_models }
    }

    /// Lineage requests, with unresolvable endpoints reported per edge
    pub fn emit(&self) -> impl Iterator<Item = Result<AddLineageRequest, Failure>> + 'a {
        info!("Processing DBT lineage");
        let ctx = self.ctx;
        self.data_models.iter().flat_map(move |(model_fqn, model)| {
            model
                .upstream
                .iter()
                .map(move |upstream_fqn| lineage_edge(ctx, upstream_fqn, model_fqn))
        })
    }
}

fn lineage_edge(
    ctx: &IngestionContext<'_>,
    upstream_fqn: &str,
    model_fqn: &str,
) -> Result<AddLineageRequest, Failure> {
    let subject = format!("{} -> {}", upstream_fqn, model_fqn);
    let table = |fqn: &str| -> Result<EntityReference, Failure> {
        let entity = ctx.require_entity(EntityKind::Table, fqn, Stage::Lineage, &subject)?;
        Ok(EntityReference::new(entity.id, EntityKind::Table))
    };

    Ok(AddLineageRequest {
        edge: EntitiesEdge {
            from_entity: table(upstream_fqn)?,
            to_entity: table(model_fqn)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtmeta_catalog::{CatalogError, InMemoryCatalogBuilder, MetadataCatalog};
    use dbtmeta_core::{FailureKind, ModelType};

    fn model(upstream: &[&str]) -> DataModel {
        DataModel {
            model_type: ModelType::Dbt,
            description: None,
            path: String::new(),
            raw_sql: String::new(),
            sql: String::new(),
            columns: Vec::new(),
            upstream: upstream.iter().map(|u| u.to_string()).collect(),
            owner: None,
        }
    }

    #[test]
    fn test_emit_edges() {
        let catalog = InMemoryCatalogBuilder::new()
            .with_table("svc.db.s.t1")
            .with_table("svc.db.s.t2")
            .build();
        let ctx = IngestionContext::new("svc", &catalog, &catalog);

        let mut models = BTreeMap::new();
        models.insert("svc.db.s.t1".to_string(), model(&[]));
        models.insert("svc.db.s.t2".to_string(), model(&["svc.db.s.t1"]));

        let emitter = LineageEmitter::new(&ctx, &models);
        let edges: Vec<_> = emitter.emit().collect();

        assert_eq!(edges.len(), 1);
        let edge = &edges[0].as_ref().unwrap().edge;
        assert_eq!(edge.from_entity.entity_type, "table");
        assert_eq!(edge.to_entity.entity_type, "table");

        let t1 = catalog.get_by_name(EntityKind::Table, "svc.db.s.t1").unwrap().unwrap();
        assert_eq!(edge.from_entity.id, t1.id);

        // Restartable
        assert_eq!(emitter.emit().count(), 1);
    }

    #[test]
    fn test_missing_endpoint_skips_only_that_edge() {
        let catalog = InMemoryCatalogBuilder::new()
            .with_table("svc.db.s.t1")
            .with_table("svc.db.s.t3")
            .with_error("svc.db.s.t4", CatalogError::NetworkError("timeout".to_string()))
            .build();
        let ctx = IngestionContext::new("svc", &catalog, &catalog);

        let mut models = BTreeMap::new();
        models.insert("svc.db.s.t3".to_string(), model(&["svc.db.s.t1", "svc.db.s.gone", "svc.db.s.t4"]));

        let results: Vec<_> = LineageEmitter::new(&ctx, &models).emit().collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().kind, FailureKind::ResolutionMiss);
        assert_eq!(results[2].as_ref().unwrap_err().kind, FailureKind::ExternalCall);
    }
}
