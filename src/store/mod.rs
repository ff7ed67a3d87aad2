//! Store module for persisting crawled documents
//!
//! This module owns the on-disk identifier→document mapping: write-once JSON
//! records keyed by identifier, existence checks, change detection against
//! stored content, and failure markers for references whose bounded retries
//! were exhausted.

mod json_dir;
mod traits;

pub use json_dir::JsonDirStore;
pub use traits::{DocumentStore, StoreError, StoreResult};

use crate::SayfaError;
use std::path::Path;

/// Opens a JSON-directory store rooted at `path`
///
/// # Arguments
///
/// * `path` - Output directory for this target's documents
///
/// # Returns
///
/// * `Ok(JsonDirStore)` - Successfully opened store
/// * `Err(SayfaError)` - The directory could not be created (fatal: nothing
///   can be durably recorded without it)
pub fn open_store(path: &Path) -> Result<JsonDirStore, SayfaError> {
    Ok(JsonDirStore::new(path)?)
}
