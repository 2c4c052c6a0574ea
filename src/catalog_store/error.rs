//! Error taxonomy of the catalog.
//!
//! Business-rule violations (`DuplicateKey`, `OutOfRange`, `NotFound`) are
//! recovered by the ingestion layer as per-item rejections. `BackingStore`
//! is the only fatal variant and always reaches the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {key} already exists")]
    DuplicateKey { entity: &'static str, key: String },

    #[error("Rating value {value} is outside the range [1, 5]")]
    OutOfRange { value: i64 },

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Backing store failure: {0}")]
    BackingStore(#[from] rusqlite::Error),
}

impl CatalogError {
    /// Whether the error must abort the whole operation rather than reject a
    /// single item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::BackingStore(_))
    }

    pub(crate) fn duplicate(entity: &'static str, key: impl Into<String>) -> Self {
        CatalogError::DuplicateKey {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        CatalogError::NotFound {
            entity,
            key: key.into(),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
