//! Test fixtures for ingestion tests
//!
//! A small dbt project: two models `t1` and `t2` in `db.schema`, where `t2`
//! selects from `t1`, plus generic tests on both. Builders return JSON so
//! individual tests can add or break nodes.

#![allow(dead_code)]

use dbtmeta_catalog::{InMemoryCatalog, InMemoryCatalogBuilder};
use dbtmeta_core::{Config, DbtConfig};
use dbtmeta_dbt::{CatalogArtifact, Manifest, RunResults};
use dbtmeta_engine::LoadedArtifacts;
use serde_json::{json, Value};

pub const SERVICE: &str = "svc";

pub const T1: &str = "model.shop.t1";
pub const T2: &str = "model.shop.t2";
pub const NOT_NULL_T1_ID: &str = "test.shop.not_null_t1_id";
pub const RELATIONSHIP_T2_T1: &str = "test.shop.relationships_t2_t1_id__id__ref_t1_";
pub const ACCEPTED_VALUES_T2_STATUS: &str = "test.shop.accepted_values_t2_status";

pub const T1_FQN: &str = "svc.db.schema.t1";
pub const T2_FQN: &str = "svc.db.schema.t2";

/// A model node in `db.schema`
pub fn model(name: &str, depends_on: &[&str]) -> Value {
    json!({
        "unique_id": format!("model.shop.{}", name),
        "name": name,
        "resource_type": "model",
        "database": "db",
        "schema": "schema",
        "raw_code": format!("select * from {}_source", name),
        "compiled_code": format!("select * from db.schema.{}_source", name),
        "description": format!("The {} model", name),
        "root_path": "/projects/shop",
        "original_file_path": format!("models/{}.sql", name),
        "depends_on": {"nodes": depends_on},
        "columns": {
            "id": {"name": "id", "description": "Primary key"}
        }
    })
}

/// A generic column test
pub fn column_test(
    unique_id: &str,
    name: &str,
    test_name: &str,
    column: &str,
    depends_on: &[&str],
    kwargs: Value,
) -> Value {
    json!({
        "unique_id": unique_id,
        "name": name,
        "resource_type": "test",
        "description": format!("{} on {}", test_name, column),
        "column_name": column,
        "original_file_path": "models/schema.yml",
        "depends_on": {"nodes": depends_on},
        "meta": {},
        "test_metadata": {"name": test_name, "kwargs": kwargs}
    })
}

pub fn not_null_t1_id() -> Value {
    column_test(
        NOT_NULL_T1_ID,
        "not_null_t1_id",
        "not_null",
        "id",
        &[T1],
        json!({"column_name": "id", "model": "{{ get_where_subquery(ref('t1')) }}"}),
    )
}

pub fn relationship_t2_t1() -> Value {
    column_test(
        RELATIONSHIP_T2_T1,
        "relationships_t2_t1_id__id__ref_t1_",
        "relationships",
        "t1_id",
        &[T1, T2],
        json!({"column_name": "t1_id", "field": "id", "to": "ref('t1')"}),
    )
}

pub fn accepted_values_t2_status() -> Value {
    column_test(
        ACCEPTED_VALUES_T2_STATUS,
        "accepted_values_t2_status",
        "accepted_values",
        "status",
        &[T2],
        json!({"column_name": "status", "values": ["placed", "shipped", "returned"]}),
    )
}

/// Manifest JSON with the given nodes and no sources
pub fn manifest_json(nodes: Vec<(&str, Value)>) -> Value {
    let nodes: serde_json::Map<String, Value> =
        nodes.into_iter().map(|(id, node)| (id.to_string(), node)).collect();
    json!({
        "metadata": {"dbt_version": "1.7.0", "project_name": "shop"},
        "nodes": nodes,
        "sources": {}
    })
}

/// The two models and all three tests
pub fn full_manifest_json() -> Value {
    manifest_json(vec![
        (T1, model("t1", &[])),
        (T2, model("t2", &[T1])),
        (NOT_NULL_T1_ID, not_null_t1_id()),
        (RELATIONSHIP_T2_T1, relationship_t2_t1()),
        (ACCEPTED_VALUES_T2_STATUS, accepted_values_t2_status()),
    ])
}

/// Catalog JSON for both models; `t1` is owned by `owner`
pub fn catalog_json(owner: &str) -> Value {
    json!({
        "nodes": {
            T1: {
                "metadata": {"type": "BASE TABLE", "database": "db", "schema": "schema", "name": "t1", "owner": owner},
                "columns": {
                    "ID": {"name": "ID", "type": "INTEGER", "index": 1, "comment": null},
                    "NAME": {"name": "NAME", "type": "VARCHAR(64)", "index": 2, "comment": "Display name"}
                }
            },
            T2: {
                "metadata": {"type": "BASE TABLE", "database": "db", "schema": "schema", "name": "t2"},
                "columns": {
                    "ID": {"name": "ID", "type": "BIGINT", "index": 1},
                    "T1_ID": {"name": "T1_ID", "type": "INTEGER", "index": 2},
                    "STATUS": {"name": "STATUS", "type": "TEXT", "index": 3}
                }
            }
        },
        "sources": {}
    })
}

/// A run result for a test
pub fn run_result(unique_id: &str, status: &str, completed_at: Option<&str>) -> Value {
    let timing = match completed_at {
        Some(completed_at) => json!([
            {"name": "compile", "started_at": "2022-12-31T23:59:58.000000Z", "completed_at": "2022-12-31T23:59:59.000000Z"},
            {"name": "execute", "started_at": "2022-12-31T23:59:59.000000Z", "completed_at": completed_at}
        ]),
        None => json!([]),
    };
    json!({
        "unique_id": unique_id,
        "status": status,
        "timing": timing,
        "message": null,
        "failures": 0,
        "execution_time": 0.05
    })
}

pub fn run_results_json(results: Vec<Value>) -> Value {
    json!({
        "metadata": {"dbt_schema_version": "https://schemas.getdbt.com/dbt/run-results/v4.json"},
        "results": results
    })
}

/// Configuration with a `[dbt]` section
pub fn dbt_config() -> Config {
    Config {
        service_name: SERVICE.to_string(),
        dbt: Some(DbtConfig::default()),
        ..Config::default()
    }
}

pub fn loaded(manifest: Value, catalog: Value, run_results: Option<Value>) -> LoadedArtifacts {
    LoadedArtifacts {
        manifest: Some(Manifest::from_str(&manifest.to_string()).unwrap()),
        catalog: Some(CatalogArtifact::from_str(&catalog.to_string()).unwrap()),
        run_results: run_results.map(|r| RunResults::from_str(&r.to_string()).unwrap()),
    }
}

/// Catalog that already knows both tables, one user and one team
pub fn seeded_catalog() -> InMemoryCatalog {
    InMemoryCatalogBuilder::new()
        .with_table(T1_FQN)
        .with_table(T2_FQN)
        .with_user("alice")
        .with_team("data-platform")
        .build()
}
