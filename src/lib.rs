//! Sayfa: a resumable crawler for paginated document registries
//!
//! This crate implements an idempotent crawl engine for document sources that
//! expose only a paginated HTTP/HTML or JSON listing: it walks every result
//! page, extracts document references, fetches each document's raw content,
//! and persists it exactly once, skipping documents already captured and
//! re-capturing only those whose content changed.

pub mod config;
pub mod document;
pub mod engine;
pub mod sites;
pub mod source;
pub mod store;

use thiserror::Error;

/// Main error type for Sayfa operations
#[derive(Debug, Error)]
pub enum SayfaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Extraction error: {0}")]
    Extract(#[from] source::ExtractError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] engine::FetchError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Unknown target '{0}' (no such [[target]] in the configuration)")]
    UnknownTarget(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown site kind: {0}")]
    UnknownSite(String),
}

/// Result type alias for Sayfa operations
pub type Result<T> = std::result::Result<T, SayfaError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use document::{DocumentRecord, PersistedDocument, RawPage};
pub use engine::{CrawlEngine, CrawlReport, DocumentFetcher, RetryCeiling, RetryPolicy};
pub use source::{PageSource, SiteStrategy};
pub use store::{DocumentStore, JsonDirStore};
