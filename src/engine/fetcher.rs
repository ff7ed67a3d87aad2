//! Document fetcher and retry policy
//!
//! This module handles all per-document HTTP traffic for the engine:
//! - Building the shared HTTP client
//! - Resolving references (relative path segments vs. absolute URLs)
//! - The single retry/backoff implementation used across the system
//!
//! # Retry model
//!
//! There is one policy type with an enumerated ceiling rather than separate
//! code paths for "retry forever" and "retry bounded":
//!
//! | Ceiling        | Used for            | On exhaustion                  |
//! |----------------|---------------------|--------------------------------|
//! | `Unbounded`    | count/page queries  | never happens                  |
//! | `Bounded(n)`   | document fetches    | `FetchError::Exhausted`        |
//!
//! Backoff before retry `n` is `base_wait * n + jitter`, with jitter drawn
//! uniformly from `[0, jitter_cap)`.

use crate::config::{HttpConfig, RetryConfig};
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a document fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Fetch exhausted for '{reference}' after {attempts} attempts: {last_error}")]
    Exhausted {
        reference: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Reference '{reference}' cannot be resolved to a URL: {source}")]
    InvalidReference {
        reference: String,
        #[source]
        source: url::ParseError,
    },
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Retry ceiling: how many failed attempts end the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCeiling {
    /// Retry forever; giving up is never correct (count/page queries)
    Unbounded,

    /// Stop after this many attempts and report exhaustion
    Bounded(u32),
}

/// Retry policy: backoff parameters plus the ceiling
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Base wait multiplied by the attempt number
    pub base_wait: Duration,

    /// Upper bound (exclusive) of the random jitter added to each wait
    pub jitter_cap: Duration,

    pub ceiling: RetryCeiling,
}

impl RetryPolicy {
    /// Document-fetch policy from the `[retry]` configuration (bounded)
    pub fn bounded(config: &RetryConfig) -> Self {
        Self {
            base_wait: Duration::from_millis(config.initial_error_wait_ms),
            jitter_cap: Duration::from_millis(config.jitter_cap_ms),
            ceiling: RetryCeiling::Bounded(config.max_attempts),
        }
    }

    /// Retry-forever policy from the `[retry]` configuration
    pub fn unbounded(config: &RetryConfig) -> Self {
        Self {
            base_wait: Duration::from_millis(config.initial_error_wait_ms),
            jitter_cap: Duration::from_millis(config.jitter_cap_ms),
            ceiling: RetryCeiling::Unbounded,
        }
    }

    /// Backoff delay before retrying after `attempt` consecutive failures
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_wait * attempt + random_jitter(self.jitter_cap)
    }
}

/// Consecutive-failure counter for one fetch call
///
/// Owned by a single call, never shared: constructed fresh per fetch,
/// discarded when the call returns or exhausts its ceiling.
#[derive(Debug)]
pub struct RetryState {
    attempts: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self { attempts: 0 }
    }

    /// Number of failed attempts recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records a failure, returning the delay before the next attempt
    ///
    /// Returns `None` once the policy's ceiling is reached, at which point
    /// the caller must stop retrying.
    pub fn record_failure(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        self.attempts += 1;

        if let RetryCeiling::Bounded(ceiling) = policy.ceiling {
            if self.attempts >= ceiling {
                return None;
            }
        }

        Some(policy.backoff_delay(self.attempts))
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

fn random_jitter(cap: Duration) -> Duration {
    let cap_ms = cap.as_millis() as u64;
    if cap_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..cap_ms))
}

/// Builds the HTTP client shared by page sources and the document fetcher
///
/// # Arguments
///
/// * `config` - The `[http]` section of the configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        // Some registries serve broken certificate chains; opt-in only.
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrieves raw document content over the network with bounded retry
///
/// Cheap to clone: the reqwest client is internally reference-counted, so
/// batch-mode tasks each carry their own copy.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: Client,
    base_url: Url,
    policy: RetryPolicy,
}

impl DocumentFetcher {
    pub fn new(client: Client, base_url: Url, policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url,
            policy,
        }
    }

    /// Resolves a reference against the target's base URL
    ///
    /// Fully-qualified references (the registries hand these out for binary
    /// attachments) pass through untouched; everything else is joined onto
    /// the base URL.
    pub fn resolve(&self, reference: &str) -> FetchResult<Url> {
        let result = if reference.starts_with("http://") || reference.starts_with("https://") {
            Url::parse(reference)
        } else {
            self.base_url.join(reference)
        };

        result.map_err(|source| FetchError::InvalidReference {
            reference: reference.to_string(),
            source,
        })
    }

    /// Fetches the raw content for one document reference
    ///
    /// Retries transient failures (non-2xx status, transport errors) under
    /// the configured policy. With a bounded ceiling the error carries the
    /// attempt count and last failure so the caller can persist a useful
    /// failure marker.
    pub async fn fetch(&self, reference: &str) -> FetchResult<Vec<u8>> {
        let url = self.resolve(reference)?;
        let mut retry = RetryState::new();

        loop {
            match self.attempt(&url).await {
                Ok(bytes) => return Ok(bytes),
                Err(message) => match retry.record_failure(&self.policy) {
                    Some(delay) => {
                        tracing::warn!(
                            "Fetch attempt {} for {} failed ({}); retrying in {:?}",
                            retry.attempts(),
                            url,
                            message,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        return Err(FetchError::Exhausted {
                            reference: reference.to_string(),
                            attempts: retry.attempts(),
                            last_error: message,
                        });
                    }
                },
            }
        }
    }

    /// One request attempt; any failure is reported as a transient message
    async fn attempt(&self, url: &Url) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}
