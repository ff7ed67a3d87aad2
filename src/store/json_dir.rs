//! JSON-directory store backend
//!
//! One JSON file per document at `<root>/<identifier>.json`, plus one
//! `<root>/<sanitized_reference>_error_log.txt` marker per permanently
//! failed reference. The directory is the entire durable state of a crawl:
//! re-running from page 1 re-derives everything else.

use crate::document::{encode_content, DocumentRecord, PersistedDocument};
use crate::store::traits::{DocumentStore, StoreError, StoreResult};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Store backend writing one JSON document per identifier
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Opens a store rooted at `root`, creating the directory if needed
    ///
    /// Failure to create the directory is the one fatal error class in the
    /// system: no progress can be durably recorded without it, so the error
    /// propagates instead of being swallowed.
    pub fn new(root: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the store's root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, identifier: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", sanitize_component(identifier)))
    }

    fn marker_path(&self, reference: &str) -> PathBuf {
        self.root
            .join(format!("{}_error_log.txt", sanitize_component(reference)))
    }
}

impl DocumentStore for JsonDirStore {
    fn exists(&self, identifier: &str) -> bool {
        self.document_path(identifier).exists()
    }

    fn load(&self, identifier: &str) -> StoreResult<PersistedDocument> {
        let path = self.document_path(identifier);

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(identifier.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            identifier: identifier.to_string(),
            message: e.to_string(),
        })
    }

    fn save(
        &self,
        record: &DocumentRecord,
        identifier: &str,
        content: &[u8],
    ) -> StoreResult<PersistedDocument> {
        let reference = record
            .reference()
            .ok_or_else(|| StoreError::MissingReference {
                identifier: identifier.to_string(),
            })?;

        let now = Utc::now();

        // First write stamps createdAt; overwrites keep the original stamp.
        let created_at = match self.load(identifier) {
            Ok(previous) => previous.created_at,
            Err(_) => now,
        };

        let document = PersistedDocument::new(
            identifier,
            reference,
            record.fields().clone(),
            content,
            created_at,
            now,
        );

        let serialized = serde_json::to_string(&document)?;
        std::fs::write(self.document_path(identifier), serialized)?;

        Ok(document)
    }

    fn is_unchanged(&self, identifier: &str, content: &[u8]) -> bool {
        match self.load(identifier) {
            // Stored content is already in the fixed encoding; encoding the
            // candidate once makes the comparison byte-exact for binary and
            // text documents alike.
            Ok(previous) => previous.content == encode_content(content),
            Err(StoreError::NotFound(_)) => false,
            Err(e) => {
                tracing::warn!(
                    "Stored record for '{}' is unreadable ({}); treating as changed",
                    identifier,
                    e
                );
                false
            }
        }
    }

    fn record_failure(&self, reference: &str, diagnostic: &str) -> StoreResult<()> {
        std::fs::write(self.marker_path(reference), diagnostic)?;
        Ok(())
    }

    fn failure_recorded(&self, reference: &str) -> bool {
        self.marker_path(reference).exists()
    }
}

/// Maps an identifier or reference to a safe single filename component
///
/// Path separators and other filesystem-hostile characters become `_`;
/// alphanumerics, `-`, `.` and `_` pass through. The mapping is pure, so
/// identifier derivation stays deterministic through it.
fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
