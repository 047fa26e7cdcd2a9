//! Metadata catalog collaborators
//!
//! The ingestion core talks to the metadata catalog only through the traits
//! in this crate:
//! - [`MetadataCatalog`] for entity lookups and test result submission
//! - [`FqnBuilder`] for qualified-name allocation
//!
//! [`InMemoryCatalog`] implements both and additionally applies the create
//! requests the core emits, which makes it suitable for tests and dry runs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbtmeta_catalog::{CatalogSnapshot, InMemoryCatalog};
//!
//! let snapshot = CatalogSnapshot::from_file(Path::new("catalog-snapshot.json"))?;
//! let catalog = InMemoryCatalog::from_snapshot(&snapshot);
//! ```

pub mod client;
pub mod memory;
pub mod snapshot;

pub use client::{CatalogError, FqnBuilder, MetadataCatalog, RequestSink};
pub use memory::{InMemoryCatalog, InMemoryCatalogBuilder};
pub use snapshot::{CatalogSnapshot, SnapshotError};
