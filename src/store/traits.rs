//! Store trait and error types
//!
//! This module defines the persistence interface the crawl engine writes
//! through, and the associated error types.

use crate::document::{DocumentRecord, PersistedDocument};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Corrupt persisted record for '{identifier}': {message}")]
    Corrupt { identifier: String, message: String },

    #[error("Record for '{identifier}' has no reference")]
    MissingReference { identifier: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence layer for crawled documents
///
/// The store exclusively owns the identifier→document mapping; writes are
/// keyed by identifier, so concurrent saves to different identifiers never
/// conflict. Since identifiers never repeat within one extraction pass, the
/// batch engine can write through a shared store without coordination.
pub trait DocumentStore: Send + Sync {
    /// Returns true if a document is already persisted under `identifier`
    fn exists(&self, identifier: &str) -> bool;

    /// Loads the persisted document for `identifier`
    ///
    /// Fails with `StoreError::NotFound` when no document is stored, and
    /// `StoreError::Corrupt` when the stored record cannot be parsed.
    fn load(&self, identifier: &str) -> StoreResult<PersistedDocument>;

    /// Persists a document under `identifier`, overwriting any prior version
    ///
    /// Idempotent: `createdAt` is set on the first write and preserved by
    /// later ones; `updatedAt` is refreshed on every write.
    fn save(
        &self,
        record: &DocumentRecord,
        identifier: &str,
        content: &[u8],
    ) -> StoreResult<PersistedDocument>;

    /// Compares freshly fetched content against the stored version
    ///
    /// Returns true only when a stored document exists and its content is
    /// byte-for-byte identical to `content`. Fails closed: a stored record
    /// that cannot be parsed is reported as changed (so it gets re-saved)
    /// with a diagnostic log, never an error.
    fn is_unchanged(&self, identifier: &str, content: &[u8]) -> bool;

    /// Persists a failure marker for a reference whose fetch was exhausted
    ///
    /// Marker presence signals that the reference needs manual re-attempt;
    /// the engine skips marked references on later runs.
    fn record_failure(&self, reference: &str, diagnostic: &str) -> StoreResult<()>;

    /// Returns true if a failure marker exists for `reference`
    fn failure_recorded(&self, reference: &str) -> bool;
}
