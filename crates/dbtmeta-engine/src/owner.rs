//! Best-effort owner resolution
//!
//! A catalog owner string is wrapped as `*owner*` and tried against each
//! strategy in order; the first strategy that finds an entity wins. Nothing
//! resolving is not an error.

use crate::context::IngestionContext;
use dbtmeta_catalog::CatalogError;
use dbtmeta_core::{EntityKind, EntityReference, FqnRequest};
use tracing::{debug, warn};

/// One way of reading an owner name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerStrategy {
    User,
    Team,
}

impl OwnerStrategy {
    /// Users first, teams as fallback
    pub const DEFAULT_ORDER: [OwnerStrategy; 2] = [OwnerStrategy::User, OwnerStrategy::Team];

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User => EntityKind::User,
            Self::Team => EntityKind::Team,
        }
    }

    fn request(&self, pattern: String) -> FqnRequest {
        match self {
            Self::User => FqnRequest::User { name: pattern },
            Self::Team => FqnRequest::Team { name: pattern },
        }
    }

    /// Resolve `pattern` to a reference of this strategy's kind
    pub fn lookup(
        &self,
        ctx: &IngestionContext<'_>,
        pattern: &str,
    ) -> Result<Option<EntityReference>, CatalogError> {
        match ctx.fqn_builder.build(&self.request(pattern.to_string()))? {
            Some(fqn) => ctx.catalog.get_entity_reference(self.kind(), &fqn),
            None => Ok(None),
        }
    }
}

/// Ordered list of owner strategies
#[derive(Debug, Clone)]
pub struct OwnerResolver {
    strategies: Vec<OwnerStrategy>,
}

impl Default for OwnerResolver {
    fn default() -> Self {
        Self::new(OwnerStrategy::DEFAULT_ORDER.to_vec())
    }
}

impl OwnerResolver {
    pub fn new(strategies: Vec<OwnerStrategy>) -> Self {
        Self { strategies }
    }

    /// Resolve an owner name, or `None` when no strategy matches
    pub fn resolve(&self, ctx: &IngestionContext<'_>, owner: &str) -> Option<EntityReference> {
        let pattern = format!("*{}*", owner);

        for strategy in &self.strategies {
            match strategy.lookup(ctx, &pattern) {
                Ok(Some(reference)) => return Some(reference),
                Ok(None) => {}
                Err(e) => debug!(owner, strategy = ?strategy, "Owner lookup failed: {}", e),
            }
        }

        warn!(
            owner,
            "Unable to ingest owner from dbt since no user or team was found with this name"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtmeta_catalog::{InMemoryCatalog, InMemoryCatalogBuilder, MetadataCatalog};

    fn resolve(catalog: &InMemoryCatalog, owner: &str) -> Option<EntityReference> {
        let ctx = IngestionContext::new("svc", catalog, catalog);
        OwnerResolver::default().resolve(&ctx, owner)
    }

    #[test]
    fn test_user_is_preferred() {
        let catalog = InMemoryCatalogBuilder::new()
            .with_user("alice")
            .with_team("alice")
            .build();

        let owner = resolve(&catalog, "alice").unwrap();
        assert_eq!(owner.entity_type, "user");
    }

    #[test]
    fn test_dotted_user_name() {
        let catalog = InMemoryCatalogBuilder::new()
            .with_user("alice.smith")
            .with_team("data-platform")
            .build();
        let expected = catalog.get_by_name(EntityKind::User, "alice.smith").unwrap().unwrap();

        let owner = resolve(&catalog, "alice").unwrap();
        assert_eq!(owner.entity_type, "user");
        assert_eq!(owner.id, expected.id);
    }

    #[test]
    fn test_team_fallback() {
        let catalog = InMemoryCatalogBuilder::new().with_team("data-platform").build();

        let owner = resolve(&catalog, "platform").unwrap();
        assert_eq!(owner.entity_type, "team");
    }

    #[test]
    fn test_lookup_errors_are_not_fatal() {
        let catalog = InMemoryCatalogBuilder::new()
            .with_user("bob")
            .with_team("bob")
            .with_error("bob", CatalogError::PermissionDenied("users".to_string()))
            .build();

        // Users and teams share the name, so both lookups fail
        assert!(resolve(&catalog, "bob").is_none());
    }

    #[test]
    fn test_unknown_owner_is_none() {
        let catalog = InMemoryCatalogBuilder::new().with_user("alice").build();
        assert!(resolve(&catalog, "nobody").is_none());
    }
}
