//! Collaborators shared by every ingestion stage

use dbtmeta_catalog::{FqnBuilder, MetadataCatalog};
use dbtmeta_core::{Entity, EntityKind, Failure, FqnRequest, SqlTypeParser, Stage, TypeParser};

static SQL_TYPES: SqlTypeParser = SqlTypeParser;

/// Service name plus the catalog client, FQN builder and type parser
#[derive(Clone, Copy)]
pub struct IngestionContext<'a> {
    /// Source qualifier prefixed to every fully qualified name
    pub service_name: &'a str,

    pub catalog: &'a dyn MetadataCatalog,

    pub fqn_builder: &'a dyn FqnBuilder,

    pub type_parser: &'a dyn TypeParser,
}

impl<'a> IngestionContext<'a> {
    /// Context using the built-in SQL type parser
    pub fn new(
        service_name: &'a str,
        catalog: &'a dyn MetadataCatalog,
        fqn_builder: &'a dyn FqnBuilder,
    ) -> Self {
        Self {
            service_name,
            catalog,
            fqn_builder,
            type_parser: &SQL_TYPES,
        }
    }

    pub fn with_type_parser(mut self, type_parser: &'a dyn TypeParser) -> Self {
        self.type_parser = type_parser;
        self
    }

    /// Build a fully qualified name, turning "no match" into a resolution miss
    pub(crate) fn require_fqn(
        &self,
        request: &FqnRequest,
        stage: Stage,
        subject: &str,
    ) -> Result<String, Failure> {
        self.fqn_builder
            .build(request)
            .map_err(|e| Failure::external(stage, subject, e))?
            .ok_or_else(|| {
                Failure::miss(
                    stage,
                    subject,
                    format!("no fully qualified name for {:?}", request),
                )
            })
    }

    /// Look up an entity by name, turning "not found" into a resolution miss
    pub(crate) fn require_entity(
        &self,
        kind: EntityKind,
        fqn: &str,
        stage: Stage,
        subject: &str,
    ) -> Result<Entity, Failure> {
        self.catalog
            .get_by_name(kind, fqn)
            .map_err(|e| Failure::external(stage, subject, e))?
            .ok_or_else(|| Failure::miss(stage, subject, format!("{} '{}' not found", kind.as_str(), fqn)))
    }

    /// Whether an entity of that name exists
    pub(crate) fn exists(
        &self,
        kind: EntityKind,
        fqn: &str,
        stage: Stage,
        subject: &str,
    ) -> Result<bool, Failure> {
        self.catalog
            .get_by_name(kind, fqn)
            .map(|entity| entity.is_some())
            .map_err(|e| Failure::external(stage, subject, e))
    }
}

impl std::fmt::Debug for IngestionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionContext")
            .field("service_name", &self.service_name)
            .field("catalog", &self.catalog.name())
            .finish()
    }
}
