//! Asset catalog persistence
//!
//! This module holds the asset catalog behind the two collaborator traits the
//! scheduling core depends on: a candidate repository for reads and a usage
//! recorder for placement writes. SQLite backs production runs; the in-memory
//! catalog backs tests.

pub mod error;
pub mod repository;

pub use error::{StorageError, StorageResult};
pub use repository::{
    create_sqlite_catalog, parse_catalog, CandidateRepository, CatalogEntry, CatalogStore,
    InMemoryCatalog, RecordedPlacement, SharedCatalog, SqliteCatalog, UsageRecorder,
};
