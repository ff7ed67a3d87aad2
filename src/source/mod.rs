//! Page source and site strategy seams
//!
//! This module defines the two capabilities a site plugs into the crawl
//! engine:
//!
//! - `PageSource`: asks the remote registry for its total page count and
//!   fetches individual listing pages
//! - `SiteStrategy`: turns a raw page into ordered document records and
//!   derives the stable identifier a document is persisted under
//!
//! Both are injected into the engine at construction; the engine has no
//! knowledge of any site's payload shape.

use crate::document::{DocumentRecord, RawPage};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a single page source attempt
///
/// Every variant is transient from the engine's point of view: count and
/// page queries are retried without bound, because giving up on discovering
/// the result set is never correct.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
}

/// Errors from extracting documents out of a fetched page
///
/// An extraction error marks the page payload as malformed; the engine
/// treats it like a transient failure and refetches the page.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Malformed page {page}: {message}")]
    MalformedPage { page: u32, message: String },
}

/// Result type for page source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Produces the ordered, finite sequence of listing pages for one target
///
/// Implementations perform exactly one network attempt per call and report
/// failures through `SourceError`; all retry behavior lives in the engine so
/// the backoff rules are written once. Page requests reuse the same query
/// parameters except for the incrementing page/offset field.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// One attempt at the remote total-count query
    ///
    /// Returns the total number of listing pages. A response that lacks the
    /// count field, or whose count cannot be read, is a `Malformed` error.
    async fn total_pages(&self) -> SourceResult<u32>;

    /// One attempt at fetching listing page `number` (1-based)
    async fn fetch_page(&self, number: u32) -> SourceResult<RawPage>;
}

/// Per-site extraction and naming rules
///
/// Pure functions over page and record data: no I/O, no internal state.
/// The extraction order must match the page's natural document order, since
/// the engine's consecutive-unchanged early stop depends on that order
/// tracking recency.
pub trait SiteStrategy: Send + Sync {
    /// Extracts the ordered document records from a raw page
    ///
    /// Pages with zero documents (end of results) yield an empty vector
    /// rather than an error. An error means the payload shape is wrong and
    /// the page should be refetched.
    fn extract(&self, page: &RawPage) -> ExtractResult<Vec<DocumentRecord>>;

    /// Derives the stable identifier a record is persisted under
    ///
    /// Must be deterministic: the same strategy fields always produce the
    /// same identifier, and distinct documents within one crawl never
    /// collide. Returns `None` when the fields needed for naming are
    /// missing, in which case the engine skips the record with a log.
    fn document_name(&self, record: &DocumentRecord) -> Option<String>;
}
