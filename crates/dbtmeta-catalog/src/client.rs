//! Catalog client and FQN builder traits

use dbtmeta_core::{
    AddLineageRequest, CreateTestCaseRequest, CreateTestDefinitionRequest, CreateTestSuiteRequest,
    Entity, EntityKind, EntityReference, FqnRequest, TestCaseResult,
};

/// Errors raised by a catalog client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Read and result-submission surface of the metadata catalog
///
/// Calls are synchronous and may be network-backed; timeouts and retries are
/// the implementation's concern.
pub trait MetadataCatalog: Send + Sync {
    /// Get the client name (e.g., "InMemory")
    fn name(&self) -> &'static str;

    /// Look up an entity by fully qualified name
    fn get_by_name(&self, kind: EntityKind, fqn: &str) -> Result<Option<Entity>, CatalogError>;

    /// Look up a reference to an entity by fully qualified name
    fn get_entity_reference(
        &self,
        kind: EntityKind,
        fqn: &str,
    ) -> Result<Option<EntityReference>, CatalogError> {
        Ok(self.get_by_name(kind, fqn)?.map(|entity| entity.reference()))
    }

    /// Attach an execution result to the test case named `test_case_fqn`
    fn submit_test_result(&self, test_case_fqn: &str, result: &TestCaseResult) -> Result<(), CatalogError>;
}

/// The catalog's qualified-name allocation service
///
/// Returns `Ok(None)` when nothing matches, which callers treat as a signal to
/// fall back rather than as an error.
pub trait FqnBuilder: Send + Sync {
    fn build(&self, request: &FqnRequest) -> Result<Option<String>, CatalogError>;
}

/// Write surface of the metadata catalog
///
/// The ingestion stages only produce requests; the caller forwards each one
/// through a sink as it is pulled, so later stages observe earlier creations.
pub trait RequestSink: Send + Sync {
    fn add_lineage(&self, request: &AddLineageRequest) -> Result<(), CatalogError>;

    /// Create a test suite unless one of that name exists
    fn create_test_suite(&self, request: &CreateTestSuiteRequest) -> Result<Entity, CatalogError>;

    /// Create a test definition unless one of that name exists
    fn create_test_definition(&self, request: &CreateTestDefinitionRequest) -> Result<Entity, CatalogError>;

    fn create_test_case(&self, request: &CreateTestCaseRequest) -> Result<Entity, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtmeta_core::EntityId;

    struct Fixed;

    impl MetadataCatalog for Fixed {
        fn name(&self) -> &'static str {
            "Fixed"
        }

        fn get_by_name(&self, kind: EntityKind, fqn: &str) -> Result<Option<Entity>, CatalogError> {
            Ok((fqn == "svc.db.s.t").then(|| Entity {
                id: EntityId::new("1"),
                kind,
                name: "t".to_string(),
                fully_qualified_name: fqn.to_string(),
            }))
        }

        fn submit_test_result(&self, _: &str, _: &TestCaseResult) -> Result<(), CatalogError> {
            Ok(())
        }
    }

    #[test]
    fn default_entity_reference() {
        let reference = Fixed.get_entity_reference(EntityKind::Table, "svc.db.s.t").unwrap();
        assert_eq!(reference.unwrap().entity_type, "table");

        let missing = Fixed.get_entity_reference(EntityKind::Table, "svc.db.s.other").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn error_display() {
        let error = CatalogError::NotFound("svc.db.s.t".to_string());
        assert_eq!(error.to_string(), "Entity not found: svc.db.s.t");
    }
}
