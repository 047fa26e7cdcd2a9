//! In-memory metadata catalog
//!
//! Holds entities, lineage edges and test results in memory without talking
//! to any server. It's useful for:
//! - Unit testing the ingestion stages
//! - Dry runs of the CLI against a catalog snapshot
//! - Simulating catalog errors for specific names
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbtmeta_catalog::{InMemoryCatalog, MetadataCatalog};
//! use dbtmeta_core::EntityKind;
//!
//! let catalog = InMemoryCatalogBuilder::new()
//!     .with_table("warehouse.analytics.marts.orders")
//!     .with_user("alice")
//!     .build();
//!
//! let table = catalog.get_by_name(EntityKind::Table, "warehouse.analytics.marts.orders")?;
//! ```

use crate::client::{CatalogError, FqnBuilder, MetadataCatalog, RequestSink};
use dbtmeta_core::{
    fqn, AddLineageRequest, CreateTestCaseRequest, CreateTestDefinitionRequest,
    CreateTestSuiteRequest, EntitiesEdge, Entity, EntityId, EntityKind, FqnRequest,
    TestCaseResult,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct CatalogState {
    entities: BTreeMap<(EntityKind, String), Entity>,
    lineage: Vec<EntitiesEdge>,
    test_results: BTreeMap<String, Vec<TestCaseResult>>,
}

/// In-memory metadata catalog
///
/// Clones share state, so a clone handed to the ingestion stages observes
/// every request applied through the original.
#[derive(Clone)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,

    /// Errors to return for specific fully qualified names
    errors: Arc<RwLock<HashMap<String, CatalogError>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(CatalogState::default())),
            errors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn injected_error(&self, fqn: &str) -> Option<CatalogError> {
        self.errors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(fqn)
            .cloned()
    }

    /// Register an entity, returning the existing one if the name is taken
    pub fn add_entity(&self, kind: EntityKind, fully_qualified_name: impl Into<String>) -> Entity {
        let fully_qualified_name = fully_qualified_name.into();
        let mut state = self.write();

        state
            .entities
            .entry((kind, fully_qualified_name.clone()))
            .or_insert_with(|| Entity {
                id: EntityId::new(uuid::Uuid::new_v4().to_string()),
                kind,
                name: entity_name(kind, &fully_qualified_name),
                fully_qualified_name,
            })
            .clone()
    }

    /// Configure an error to be returned for a specific name
    ///
    /// Affects lookups and result submission for that name.
    pub fn add_error_for(&self, fully_qualified_name: impl Into<String>, error: CatalogError) {
        self.errors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fully_qualified_name.into(), error);
    }

    /// Whether an entity of that kind and name exists
    pub fn contains(&self, kind: EntityKind, fully_qualified_name: &str) -> bool {
        self.read()
            .entities
            .contains_key(&(kind, fully_qualified_name.to_string()))
    }

    /// Names of all entities of a kind, sorted
    pub fn names(&self, kind: EntityKind) -> Vec<String> {
        self.read()
            .entities
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Number of entities of a kind
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.read().entities.keys().filter(|(k, _)| *k == kind).count()
    }

    /// All recorded lineage edges
    pub fn lineage_edges(&self) -> Vec<EntitiesEdge> {
        self.read().lineage.clone()
    }

    /// Results submitted for a test case, oldest first
    pub fn test_results(&self, test_case_fqn: &str) -> Vec<TestCaseResult> {
        self.read()
            .test_results
            .get(test_case_fqn)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCatalog for InMemoryCatalog {
    fn name(&self) -> &'static str {
        "InMemory"
    }

    fn get_by_name(&self, kind: EntityKind, fqn: &str) -> Result<Option<Entity>, CatalogError> {
        // Check for configured errors first
        if let Some(error) = self.injected_error(fqn) {
            return Err(error);
        }

        Ok(self.read().entities.get(&(kind, fqn.to_string())).cloned())
    }

    fn submit_test_result(&self, test_case_fqn: &str, result: &TestCaseResult) -> Result<(), CatalogError> {
        if let Some(error) = self.injected_error(test_case_fqn) {
            return Err(error);
        }

        let mut state = self.write();
        if !state
            .entities
            .contains_key(&(EntityKind::TestCase, test_case_fqn.to_string()))
        {
            return Err(CatalogError::NotFound(test_case_fqn.to_string()));
        }

        state
            .test_results
            .entry(test_case_fqn.to_string())
            .or_default()
            .push(result.clone());
        Ok(())
    }
}

impl RequestSink for InMemoryCatalog {
    /// Create a test suite unless one of that name exists
    fn create_test_suite(&self, request: &CreateTestSuiteRequest) -> Result<Entity, CatalogError> {
        if request.name.is_empty() {
            return Err(CatalogError::InvalidRequest("test suite name is empty".to_string()));
        }
        Ok(self.add_entity(EntityKind::TestSuite, request.name.clone()))
    }

    /// Create a test definition unless one of that name exists
    fn create_test_definition(
        &self,
        request: &CreateTestDefinitionRequest,
    ) -> Result<Entity, CatalogError> {
        if request.name.is_empty() {
            return Err(CatalogError::InvalidRequest("test definition name is empty".to_string()));
        }
        Ok(self.add_entity(EntityKind::TestDefinition, request.name.clone()))
    }

    /// Create a test case under the table its entity link points at
    ///
    /// The case is named `{table_fqn}[.{column}].{name}`.
    fn create_test_case(&self, request: &CreateTestCaseRequest) -> Result<Entity, CatalogError> {
        let link = &request.entity_link;
        if !self.contains(EntityKind::Table, &link.table_fqn) {
            return Err(CatalogError::NotFound(link.table_fqn.clone()));
        }

        let mut parts = vec![link.table_fqn.clone()];
        if let Some(column) = &link.column {
            parts.push(fqn::quote_name(column));
        }
        parts.push(fqn::quote_name(&request.name));

        Ok(self.add_entity(EntityKind::TestCase, parts.join(".")))
    }

    /// Record a lineage edge
    fn add_lineage(&self, request: &AddLineageRequest) -> Result<(), CatalogError> {
        let mut state = self.write();
        if !state.lineage.contains(&request.edge) {
            state.lineage.push(request.edge.clone());
        }
        Ok(())
    }
}

impl FqnBuilder for InMemoryCatalog {
    fn build(&self, request: &FqnRequest) -> Result<Option<String>, CatalogError> {
        if let Some(parts) = request.hierarchy() {
            return Ok(Some(fqn::join(parts.as_slice())));
        }

        let pattern = match request {
            FqnRequest::User { name } | FqnRequest::Team { name } => name,
            _ => return Ok(None),
        };

        let kind = request.entity_kind();
        Ok(self
            .read()
            .entities
            .values()
            .filter(|entity| entity.kind == kind)
            .find(|entity| wildcard_match(pattern, &entity.fully_qualified_name))
            .map(|entity| entity.fully_qualified_name.clone()))
    }
}

/// Builder for creating an InMemoryCatalog with predefined entities
///
/// # Example
///
/// ```rust,ignore
/// let catalog = InMemoryCatalogBuilder::new()
///     .with_table("warehouse.db.schema.customers")
///     .with_team("data-platform")
///     .with_error("warehouse.db.schema.locked", CatalogError::PermissionDenied("locked".into()))
///     .build();
/// ```
pub struct InMemoryCatalogBuilder {
    entities: Vec<(EntityKind, String)>,
    errors: Vec<(String, CatalogError)>,
}

impl InMemoryCatalogBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_entity(mut self, kind: EntityKind, fully_qualified_name: impl Into<String>) -> Self {
        self.entities.push((kind, fully_qualified_name.into()));
        self
    }

    pub fn with_table(self, fully_qualified_name: impl Into<String>) -> Self {
        self.with_entity(EntityKind::Table, fully_qualified_name)
    }

    pub fn with_user(self, name: impl Into<String>) -> Self {
        self.with_entity(EntityKind::User, name)
    }

    pub fn with_team(self, name: impl Into<String>) -> Self {
        self.with_entity(EntityKind::Team, name)
    }

    pub fn with_test_suite(self, name: impl Into<String>) -> Self {
        self.with_entity(EntityKind::TestSuite, name)
    }

    pub fn with_test_definition(self, name: impl Into<String>) -> Self {
        self.with_entity(EntityKind::TestDefinition, name)
    }

    /// Add an error for a specific name
    pub fn with_error(mut self, fully_qualified_name: impl Into<String>, error: CatalogError) -> Self {
        self.errors.push((fully_qualified_name.into(), error));
        self
    }

    /// Build the InMemoryCatalog
    pub fn build(self) -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        for (kind, name) in self.entities {
            catalog.add_entity(kind, name);
        }
        for (name, error) in self.errors {
            catalog.add_error_for(name, error);
        }
        catalog
    }
}

impl Default for InMemoryCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Display name of a new entity
///
/// Users and teams are not hierarchical, so their whole name is kept even when
/// it contains dots.
fn entity_name(kind: EntityKind, fully_qualified_name: &str) -> String {
    match kind {
        EntityKind::User | EntityKind::Team => fully_qualified_name.to_string(),
        _ => last_part(fully_qualified_name),
    }
}

/// Last part of an FQN with surrounding quotes removed
fn last_part(fully_qualified_name: &str) -> String {
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in fully_qualified_name.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => start = i + 1,
            _ => {}
        }
    }
    fully_qualified_name[start..].trim_matches('"').to_string()
}

/// Match `text` against a pattern where `*` stands for any run of characters
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == text;
    }

    let (first, rest) = (segments[0], &segments[1..]);
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };

    let (last, middle) = match rest.split_last() {
        Some((last, middle)) => (*last, middle),
        None => return true,
    };

    for segment in middle {
        match remaining.find(segment) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }

    remaining.len() >= last.len() && remaining.ends_with(last)
}
