//! Crawl engine module
//!
//! This module contains the core crawling logic, including:
//! - Document fetching with retry and backoff
//! - The unified retry policy (unbounded vs. bounded ceiling)
//! - Pagination traversal and the per-document decision
//! - The sequential and bounded-batch execution strategies

mod coordinator;
mod fetcher;
mod report;

pub use coordinator::{CrawlCursor, CrawlEngine, DocumentOutcome};
pub use fetcher::{
    build_http_client, DocumentFetcher, FetchError, FetchResult, RetryCeiling, RetryPolicy,
    RetryState,
};
pub use report::CrawlReport;
