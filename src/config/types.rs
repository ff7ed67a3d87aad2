use serde::Deserialize;

/// Main configuration structure for Sayfa
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
}

/// Execution strategy for a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlMode {
    /// One document fully processed before the next; supports early stop
    #[default]
    Sequential,

    /// All pages, then all documents, fetched under a bounded window
    Batch,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Execution strategy
    #[serde(default)]
    pub mode: CrawlMode,

    /// Number of entries requested per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// First page to crawl (1-based)
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Bounded window of in-flight requests in batch mode
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Consecutive-unchanged documents after which a sequential crawl stops
    ///
    /// Absent means never: full crawls run every page. Incremental re-crawls
    /// set a small finite value.
    #[serde(rename = "early-stop-threshold", default)]
    pub early_stop_threshold: Option<u32>,
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Base backoff wait for document fetches (grows linearly per attempt)
    #[serde(rename = "initial-error-wait-ms", default = "default_initial_error_wait_ms")]
    pub initial_error_wait_ms: u64,

    /// Fixed wait between count/page query retries (no growth)
    #[serde(rename = "page-retry-wait-ms", default = "default_page_retry_wait_ms")]
    pub page_retry_wait_ms: u64,

    /// Exclusive upper bound of the random jitter added to each backoff
    #[serde(rename = "jitter-cap-ms", default = "default_jitter_cap_ms")]
    pub jitter_cap_ms: u64,

    /// Attempt ceiling for document fetches
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Overall request timeout in seconds
    #[serde(rename = "timeout", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Skip TLS certificate verification (some registries serve broken chains)
    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory under which each target gets its own document directory
    #[serde(rename = "root-dir")]
    pub root_dir: String,
}

/// Site family a target's page source and strategy are built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteKind {
    /// Decision-search JSON APIs (aramalist endpoints)
    Decisions,

    /// Legislation datatable JSON API (mevzuat)
    Mevzuat,

    /// Jurisdictional-dispute decision HTML grid (uyusmazlik)
    Uyusmazlik,
}

/// One crawl target: a named registry endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Name of the target; also its output subdirectory
    pub name: String,

    /// Which site family this endpoint belongs to
    pub site: SiteKind,

    /// Base URL all page queries and relative references resolve against
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_error_wait_ms: default_initial_error_wait_ms(),
            page_retry_wait_ms: default_page_retry_wait_ms(),
            jitter_cap_ms: default_jitter_cap_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_start_page() -> u32 {
    1
}

fn default_concurrency() -> u32 {
    10
}

fn default_initial_error_wait_ms() -> u64 {
    15_000
}

fn default_page_retry_wait_ms() -> u64 {
    10_000
}

fn default_jitter_cap_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
