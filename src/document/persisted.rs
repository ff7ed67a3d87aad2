//! Durable document form
//!
//! A `PersistedDocument` is the JSON object written to
//! `<output_dir>/<identifier>.json`. Content bytes are stored base64-encoded
//! so binary and text documents round-trip through the same field, and so
//! change detection can compare stored content byte-for-byte.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names reserved by the persisted layout
///
/// Strategy fields with these names are dropped before serialization so the
/// flattened metadata can never shadow the record's own bookkeeping.
pub const RESERVED_FIELDS: &[&str] = &[
    "identifier",
    "reference",
    "content",
    "createdAt",
    "updatedAt",
];

/// The durable, on-disk form of a fetched document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedDocument {
    /// Deterministic persistence key derived by the site strategy
    pub identifier: String,

    /// The fetch locator the content was retrieved from
    pub reference: String,

    /// Base64 encoding of the raw content bytes
    pub content: String,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,

    /// Strategy-defined metadata fields, flattened into the JSON object
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PersistedDocument {
    /// Builds a persisted document from its parts
    ///
    /// Reserved field names are stripped from the metadata map.
    pub fn new(
        identifier: impl Into<String>,
        reference: impl Into<String>,
        mut fields: Map<String, Value>,
        content: &[u8],
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        for key in RESERVED_FIELDS {
            fields.remove(*key);
        }

        Self {
            identifier: identifier.into(),
            reference: reference.into(),
            content: encode_content(content),
            created_at,
            updated_at,
            fields,
        }
    }

    /// Decodes the stored content back into raw bytes
    pub fn content_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.content)
    }
}

/// Encodes raw content bytes into the fixed text-safe storage encoding
///
/// The encoding is deterministic: identical bytes always yield an identical
/// string, which is what makes stored-content comparison a valid change
/// detector.
pub fn encode_content(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}
