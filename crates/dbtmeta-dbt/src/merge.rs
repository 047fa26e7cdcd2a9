//! Manifest and catalog merging
//!
//! Both artifacts split their entities into `nodes` and `sources`. The merger
//! overlays `sources` onto `nodes` for each artifact (a key present in both
//! resolves to the source) and then parses every entity on its own, so a
//! malformed entity is reported and dropped instead of failing the run.

use crate::catalog::{CatalogArtifact, CatalogNode};
use crate::manifest::{Manifest, ManifestNode};
use dbtmeta_core::{Failure, Stage};
use serde_json::Value;
use std::collections::BTreeMap;

/// Unified, per-entity view of manifest and catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedArtifacts {
    /// Manifest entities (models, seeds, snapshots, tests, sources) by unique_id
    pub manifest_entities: BTreeMap<String, ManifestNode>,

    /// Catalog entities by unique_id; tests have none
    pub catalog_entities: BTreeMap<String, CatalogNode>,

    /// Entities that failed to parse
    pub failures: Vec<Failure>,
}

impl MergedArtifacts {
    pub fn manifest_node(&self, unique_id: &str) -> Option<&ManifestNode> {
        self.manifest_entities.get(unique_id)
    }

    pub fn catalog_node(&self, unique_id: &str) -> Option<&CatalogNode> {
        self.catalog_entities.get(unique_id)
    }
}

/// Combines manifest and catalog into keyed entity maps
pub struct ArtifactMerger;

impl ArtifactMerger {
    /// Merge both artifacts
    pub fn merge(manifest: Manifest, catalog: CatalogArtifact) -> MergedArtifacts {
        let mut failures = Vec::new();

        let manifest_entities = Self::parse_all(
            Self::overlay(manifest.nodes, manifest.sources),
            ManifestNode::from_value,
            "manifest",
            &mut failures,
        );
        let catalog_entities = Self::parse_all(
            Self::overlay(catalog.nodes, catalog.sources),
            CatalogNode::from_value,
            "catalog",
            &mut failures,
        );

        tracing::debug!(
            manifest = manifest_entities.len(),
            catalog = catalog_entities.len(),
            skipped = failures.len(),
            "Merged dbt artifacts"
        );

        MergedArtifacts {
            manifest_entities,
            catalog_entities,
            failures,
        }
    }

    /// Overlay `sources` onto `nodes`; duplicate keys take the source entry
    fn overlay(
        mut nodes: BTreeMap<String, Value>,
        sources: BTreeMap<String, Value>,
    ) -> BTreeMap<String, Value> {
        nodes.extend(sources);
        nodes
    }

    fn parse_all<T>(
        raw: BTreeMap<String, Value>,
        parse: fn(Value) -> Result<T, serde_json::Error>,
        artifact: &str,
        failures: &mut Vec<Failure>,
    ) -> BTreeMap<String, T> {
        raw.into_iter()
            .filter_map(|(key, value)| match parse(value) {
                Ok(entity) => Some((key, entity)),
                Err(e) => {
                    failures.push(Failure::shape(
                        Stage::Merge,
                        key,
                        format!("malformed {} entity: {}", artifact, e),
                    ));
                    None
                }
            })
            .collect()
    }
}
