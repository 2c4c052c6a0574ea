mod error;
mod models;
mod schema;
mod store;
mod trait_def;

pub use error::{CatalogError, CatalogResult};
pub use models::*;
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use store::{CatalogBatch, ItemOutcome, SqliteCatalog, SqliteCatalogStore};
pub use trait_def::CatalogStore;
