//! Document data model
//!
//! This module defines the records that flow through the crawl engine.
//!
//! # Components
//!
//! - `RawPage`: one paginated response unit as returned by a page source
//! - `DocumentRecord`: strategy-defined metadata for one document, carrying
//!   the reference used to fetch its content
//! - `PersistedDocument`: the durable, on-disk form of a fetched document

mod persisted;
mod record;

// Re-export main types
pub use persisted::{encode_content, PersistedDocument, RESERVED_FIELDS};
pub use record::{DocumentRecord, RawPage};
