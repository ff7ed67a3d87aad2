//! Crawl engine - main crawl orchestration logic
//!
//! This module contains the engine that drives one crawl run over one
//! target, coordinating:
//! - Page-count discovery (retried until the source answers sensibly)
//! - Pagination traversal and document extraction
//! - The per-document skip/fetch/save decision
//! - The consecutive-unchanged early stop
//! - The two execution strategies (sequential and bounded-batch)
//!
//! The engine is deliberately ignorant of any site's payload shape: pages
//! come from an injected `PageSource`, records and names from an injected
//! `SiteStrategy`, and durable state lives behind `DocumentStore`.

use crate::config::{CrawlMode, CrawlerConfig, RetryConfig};
use crate::document::DocumentRecord;
use crate::engine::fetcher::DocumentFetcher;
use crate::engine::report::CrawlReport;
use crate::source::{PageSource, SiteStrategy};
use crate::store::DocumentStore;
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Position of a crawl within a target's result set
///
/// Derived fresh from the count query at every run start and never
/// persisted: restarts re-walk from the configured start page, and the
/// store's per-document existence/change checks are what make that cheap
/// to do safely.
#[derive(Debug, Clone, Copy)]
pub struct CrawlCursor {
    current: u32,
    total: u32,
}

impl CrawlCursor {
    /// Creates a cursor at `start` over `total` pages (both 1-based)
    pub fn new(start: u32, total: u32) -> Self {
        Self {
            current: start,
            total,
        }
    }

    /// The page the crawl is currently on
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Total page count reported by the source
    pub fn total(&self) -> u32 {
        self.total
    }

    /// True while the current page is within the result set
    pub fn has_more(&self) -> bool {
        self.current <= self.total
    }

    /// Advances past the current page
    pub fn advance(&mut self) {
        self.current += 1;
    }
}

/// What happened to one extracted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Persisted for the first time
    Saved,

    /// Stored content differed; overwritten
    Updated,

    /// Fetched but byte-identical to the stored version; no write
    Unchanged,

    /// Not fetched: missing reference, unnameable, or prior failure marker
    Skipped,

    /// Bounded fetch exhausted; failure marker written
    Failed,
}

/// Drives one crawl run over one target
pub struct CrawlEngine {
    target: String,
    source: Arc<dyn PageSource>,
    strategy: Arc<dyn SiteStrategy>,
    store: Arc<dyn DocumentStore>,
    fetcher: DocumentFetcher,
    crawler: CrawlerConfig,
    page_retry_wait: Duration,
}

impl CrawlEngine {
    /// Creates an engine for one target
    ///
    /// # Arguments
    ///
    /// * `target` - Target name, used for logging
    /// * `source` - Page source for the target's listing endpoint
    /// * `strategy` - Extraction and naming rules for the target's site
    /// * `store` - Persistence layer for the target's documents
    /// * `fetcher` - Document fetcher (carries the bounded retry policy)
    /// * `crawler` - Crawl behavior configuration
    /// * `retry` - Retry configuration (for the fixed page-retry wait)
    pub fn new(
        target: impl Into<String>,
        source: Arc<dyn PageSource>,
        strategy: Arc<dyn SiteStrategy>,
        store: Arc<dyn DocumentStore>,
        fetcher: DocumentFetcher,
        crawler: CrawlerConfig,
        retry: &RetryConfig,
    ) -> Self {
        Self {
            target: target.into(),
            source,
            strategy,
            store,
            fetcher,
            crawler,
            page_retry_wait: Duration::from_millis(retry.page_retry_wait_ms),
        }
    }

    /// Runs the crawl to completion and returns its summary
    ///
    /// State machine: Init (count discovery) → Paging → per-document
    /// Skip/Fetch&Save → Done, with the early-stop guard in sequential mode.
    pub async fn run(&self) -> Result<CrawlReport> {
        let total_pages = self.discover_page_count().await;
        tracing::info!("[{}] total page count: {}", self.target, total_pages);

        let report = match self.crawler.mode {
            CrawlMode::Sequential => self.run_sequential(total_pages).await?,
            CrawlMode::Batch => self.run_batch(total_pages).await?,
        };

        tracing::info!("[{}] crawl complete: {}", self.target, report);
        Ok(report)
    }

    /// Asks the source for its total page count until it answers
    ///
    /// Malformed responses and transport errors are both transient here:
    /// a crawl can never correctly decide to give up on learning how many
    /// pages exist. The wait is fixed; this loop runs once per crawl and
    /// does not need growing backoff.
    async fn discover_page_count(&self) -> u32 {
        loop {
            match self.source.total_pages().await {
                Ok(total) => return total,
                Err(e) => {
                    tracing::warn!(
                        "[{}] page count query failed ({}); retrying in {:?}",
                        self.target,
                        e,
                        self.page_retry_wait
                    );
                    tokio::time::sleep(self.page_retry_wait).await;
                }
            }
        }
    }

    /// Fetches and extracts one listing page, retrying without bound
    ///
    /// A payload the strategy cannot extract from is treated exactly like a
    /// failed transport: transient, refetched after the fixed wait.
    async fn load_page(&self, number: u32) -> Vec<DocumentRecord> {
        fetch_and_extract(
            Arc::clone(&self.source),
            Arc::clone(&self.strategy),
            number,
            self.page_retry_wait,
            &self.target,
        )
        .await
    }

    // ===== Sequential strategy =====

    /// Processes every page and document in order, one at a time
    ///
    /// The cursor and the consecutive-unchanged counter are plain loop
    /// values: nothing about the traversal hides in engine state.
    async fn run_sequential(&self, total_pages: u32) -> Result<CrawlReport> {
        let mut report = CrawlReport::new();
        let mut cursor = CrawlCursor::new(self.crawler.start_page, total_pages);
        let mut unchanged_run: u32 = 0;

        'paging: while cursor.has_more() {
            let records = self.load_page(cursor.current()).await;
            report.pages += 1;
            tracing::info!(
                "[{}] page {}/{}: {} documents",
                self.target,
                cursor.current(),
                cursor.total(),
                records.len()
            );

            for record in &records {
                let outcome = self.process_document(record).await?;
                count_outcome(&mut report, outcome);

                unchanged_run = match outcome {
                    DocumentOutcome::Unchanged => unchanged_run + 1,
                    DocumentOutcome::Saved | DocumentOutcome::Updated => 0,
                    DocumentOutcome::Skipped | DocumentOutcome::Failed => unchanged_run,
                };

                if let Some(threshold) = self.crawler.early_stop_threshold {
                    if unchanged_run >= threshold {
                        tracing::info!(
                            "[{}] up to date: {} consecutive unchanged documents",
                            self.target,
                            unchanged_run
                        );
                        report.early_stopped = true;
                        break 'paging;
                    }
                }
            }

            cursor.advance();
        }

        Ok(report)
    }

    /// Runs the full per-document decision for one record
    ///
    /// Existing documents are still fetched: freshness is decided by
    /// comparing content bytes, never assumed from listing metadata.
    async fn process_document(&self, record: &DocumentRecord) -> Result<DocumentOutcome> {
        let Some(reference) = record.reference() else {
            tracing::warn!("[{}] record without a reference; skipping", self.target);
            return Ok(DocumentOutcome::Skipped);
        };

        let Some(identifier) = self.strategy.document_name(record) else {
            tracing::warn!(
                "[{}] cannot derive a name for '{}'; skipping",
                self.target,
                reference
            );
            return Ok(DocumentOutcome::Skipped);
        };

        if self.store.failure_recorded(reference) {
            tracing::warn!(
                "[{}] '{}' has a failure marker; skipping until it is cleared",
                self.target,
                reference
            );
            return Ok(DocumentOutcome::Skipped);
        }

        let content = match self.fetcher.fetch(reference).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("[{}] giving up on '{}': {}", self.target, reference, e);
                self.store.record_failure(reference, &e.to_string())?;
                return Ok(DocumentOutcome::Failed);
            }
        };

        self.persist_document(record, &identifier, &content)
    }

    /// Applies the exists/compare/save decision for fetched content
    fn persist_document(
        &self,
        record: &DocumentRecord,
        identifier: &str,
        content: &[u8],
    ) -> Result<DocumentOutcome> {
        if !self.store.exists(identifier) {
            self.store.save(record, identifier, content)?;
            tracing::debug!("[{}] saved new document '{}'", self.target, identifier);
            return Ok(DocumentOutcome::Saved);
        }

        if self.store.is_unchanged(identifier, content) {
            tracing::debug!("[{}] '{}' unchanged", self.target, identifier);
            Ok(DocumentOutcome::Unchanged)
        } else {
            self.store.save(record, identifier, content)?;
            tracing::info!("[{}] updated '{}'", self.target, identifier);
            Ok(DocumentOutcome::Updated)
        }
    }

    // ===== Bounded-batch strategy =====

    /// Fetches all pages, then all documents, under a bounded window
    ///
    /// Two fan-out/fan-in phases with no interleaving: the full reference
    /// set is collected before the first document fetch, and every fetch
    /// completes before anything is persisted. The whole reference and
    /// content sets are held in memory for the run, and the early stop
    /// cannot apply (nothing is "consecutive" once everything is parallel).
    async fn run_batch(&self, total_pages: u32) -> Result<CrawlReport> {
        let mut report = CrawlReport::new();
        let semaphore = Arc::new(Semaphore::new(self.crawler.concurrency as usize));

        // Phase 1: all listing pages
        let mut page_tasks: JoinSet<(u32, Vec<DocumentRecord>)> = JoinSet::new();
        for number in self.crawler.start_page..=total_pages {
            let semaphore = Arc::clone(&semaphore);
            let source = Arc::clone(&self.source);
            let strategy = Arc::clone(&self.strategy);
            let wait = self.page_retry_wait;
            let target = self.target.clone();

            page_tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let records = fetch_and_extract(source, strategy, number, wait, &target).await;
                (number, records)
            });
        }

        // Collect the full reference set, keyed (and de-duplicated) by
        // reference, before any document fetch begins.
        let mut by_reference: BTreeMap<String, DocumentRecord> = BTreeMap::new();
        while let Some(joined) = page_tasks.join_next().await {
            let (number, records) = joined.expect("page task panicked");
            report.pages += 1;
            tracing::debug!(
                "[{}] collected page {} ({} documents)",
                self.target,
                number,
                records.len()
            );

            for record in records {
                match record.reference() {
                    Some(reference) => {
                        by_reference.entry(reference.to_string()).or_insert(record);
                    }
                    None => {
                        tracing::warn!("[{}] record without a reference; skipping", self.target);
                        count_outcome(&mut report, DocumentOutcome::Skipped);
                    }
                }
            }
        }

        tracing::info!(
            "[{}] collected {} document references from {} pages",
            self.target,
            by_reference.len(),
            report.pages
        );

        // Phase 2: all document contents
        let mut fetch_tasks: JoinSet<(String, DocumentRecord, FetchTaskResult)> = JoinSet::new();
        for (reference, record) in by_reference {
            if self.store.failure_recorded(&reference) {
                tracing::warn!(
                    "[{}] '{}' has a failure marker; skipping until it is cleared",
                    self.target,
                    reference
                );
                count_outcome(&mut report, DocumentOutcome::Skipped);
                continue;
            }

            let semaphore = Arc::clone(&semaphore);
            let fetcher = self.fetcher.clone();

            fetch_tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let result = fetcher.fetch(&reference).await;
                (reference, record, result)
            });
        }

        let mut fetched = Vec::new();
        while let Some(joined) = fetch_tasks.join_next().await {
            fetched.push(joined.expect("fetch task panicked"));
        }

        // Persist in reference order so runs are deterministic regardless of
        // fetch completion order.
        fetched.sort_by(|a, b| a.0.cmp(&b.0));

        for (reference, record, result) in fetched {
            match result {
                Ok(content) => {
                    let outcome = match self.strategy.document_name(&record) {
                        Some(identifier) => {
                            self.persist_document(&record, &identifier, &content)?
                        }
                        None => {
                            tracing::warn!(
                                "[{}] cannot derive a name for '{}'; skipping",
                                self.target,
                                reference
                            );
                            DocumentOutcome::Skipped
                        }
                    };
                    count_outcome(&mut report, outcome);
                }
                Err(e) => {
                    tracing::error!("[{}] giving up on '{}': {}", self.target, reference, e);
                    self.store.record_failure(&reference, &e.to_string())?;
                    count_outcome(&mut report, DocumentOutcome::Failed);
                }
            }
        }

        Ok(report)
    }
}

type FetchTaskResult = std::result::Result<Vec<u8>, crate::engine::fetcher::FetchError>;

/// Fetch-and-extract loop shared by both strategies
///
/// Free function (not a method) so batch tasks can own their captures.
async fn fetch_and_extract(
    source: Arc<dyn PageSource>,
    strategy: Arc<dyn SiteStrategy>,
    number: u32,
    retry_wait: Duration,
    target: &str,
) -> Vec<DocumentRecord> {
    loop {
        match source.fetch_page(number).await {
            Ok(page) => match strategy.extract(&page) {
                Ok(records) => return records,
                Err(e) => {
                    tracing::warn!("[{}] {}; refetching", target, e);
                }
            },
            Err(e) => {
                tracing::warn!("[{}] error at page {}: {}", target, number, e);
            }
        }

        tracing::info!(
            "[{}] retrying page {} in {:?}",
            target,
            number,
            retry_wait
        );
        tokio::time::sleep(retry_wait).await;
    }
}

fn count_outcome(report: &mut CrawlReport, outcome: DocumentOutcome) {
    match outcome {
        DocumentOutcome::Saved => report.new_documents += 1,
        DocumentOutcome::Updated => report.updated += 1,
        DocumentOutcome::Unchanged => report.unchanged += 1,
        DocumentOutcome::Skipped => report.skipped += 1,
        DocumentOutcome::Failed => report.failed += 1,
    }
}
