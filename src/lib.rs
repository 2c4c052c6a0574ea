//! Music catalog store.
//!
//! Artists, genres, songs, albums, users and ratings kept in SQLite, with
//! batch loaders that report rejected items and a handful of ranking queries.

pub mod catalog_store;
pub mod config;
pub mod ingestion;
pub mod query;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogError, CatalogResult, CatalogStore, SqliteCatalogStore};
pub use ingestion::IngestionService;
pub use query::{QueryService, YearRange};
