//! Crawl run summary
//!
//! This module defines the counters a crawl run reports when it finishes.

use std::fmt;

/// Summary of one crawl run over one target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Listing pages processed
    pub pages: u64,

    /// Documents persisted for the first time
    pub new_documents: u64,

    /// Documents whose stored content was overwritten
    pub updated: u64,

    /// Documents fetched but identical to the stored version (no write)
    pub unchanged: u64,

    /// Records skipped (missing reference, unnameable, prior failure marker)
    pub skipped: u64,

    /// Documents whose bounded fetch was exhausted (failure marker written)
    pub failed: u64,

    /// Whether the run halted on the consecutive-unchanged threshold
    pub early_stopped: bool,
}

impl CrawlReport {
    /// Creates a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Total documents that went through the per-document decision
    pub fn total_documents(&self) -> u64 {
        self.new_documents + self.updated + self.unchanged + self.skipped + self.failed
    }

    /// Total writes performed against the store
    pub fn total_writes(&self) -> u64 {
        self.new_documents + self.updated
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages, {} new, {} updated, {} unchanged, {} skipped, {} failed{}",
            self.pages,
            self.new_documents,
            self.updated,
            self.unchanged,
            self.skipped,
            self.failed,
            if self.early_stopped {
                " (stopped early: up to date)"
            } else {
                ""
            }
        )
    }
}
