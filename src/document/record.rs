//! In-flight document records
//!
//! A `DocumentRecord` is what a site strategy extracts from a listing page:
//! an open set of metadata fields plus the reference used to fetch the
//! document's content. Records are plain data; all I/O happens in the engine.

use serde_json::{Map, Value};

/// One paginated response unit from a remote listing endpoint
///
/// The body is kept as raw text; the site strategy decides whether it is
/// JSON, HTML, or something else entirely.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// 1-based page number this body was fetched for
    pub number: u32,

    /// Raw response body
    pub body: String,
}

impl RawPage {
    /// Creates a raw page from a page number and response body
    pub fn new(number: u32, body: impl Into<String>) -> Self {
        Self {
            number,
            body: body.into(),
        }
    }
}

/// Metadata for one document as extracted from a listing page
///
/// The `reference` is the opaque fetch locator (a path segment resolved
/// against the target's base URL, or a fully-qualified URL). A record
/// without a reference is invalid for persistence: the engine logs and
/// skips it without attempting a fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRecord {
    reference: Option<String>,
    fields: Map<String, Value>,
}

impl DocumentRecord {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record from an already-parsed JSON object
    ///
    /// All keys of the object become strategy fields; the reference is set
    /// separately by the extractor once it has derived the fetch locator.
    pub fn from_object(fields: Map<String, Value>) -> Self {
        Self {
            reference: None,
            fields,
        }
    }

    /// Sets the fetch reference
    pub fn set_reference(&mut self, reference: impl Into<String>) {
        self.reference = Some(reference.into());
    }

    /// Returns the fetch reference, treating an empty string as absent
    pub fn reference(&self) -> Option<&str> {
        match self.reference.as_deref() {
            Some("") | None => None,
            some => some,
        }
    }

    /// Inserts or replaces a strategy field
    pub fn insert_field(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Returns a strategy field by name
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a strategy field rendered as text
    ///
    /// Strings come back as-is; numbers are formatted. Registries are not
    /// consistent about whether e.g. a statute number is `"5237"` or `5237`,
    /// and name derivation must not care.
    pub fn field_text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns all strategy fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the record, returning its fields
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_reference_is_absent() {
        let mut record = DocumentRecord::new();
        assert_eq!(record.reference(), None);

        record.set_reference("");
        assert_eq!(record.reference(), None);

        record.set_reference("getDokuman?id=42");
        assert_eq!(record.reference(), Some("getDokuman?id=42"));
    }

    #[test]
    fn test_field_text_accepts_strings_and_numbers() {
        let mut record = DocumentRecord::new();
        record.insert_field("mevzuatNo", json!(5237));
        record.insert_field("mevzuatTur", json!("Kanun"));
        record.insert_field("parameters", json!({"nested": true}));

        assert_eq!(record.field_text("mevzuatNo"), Some("5237".to_string()));
        assert_eq!(record.field_text("mevzuatTur"), Some("Kanun".to_string()));
        assert_eq!(record.field_text("parameters"), None);
        assert_eq!(record.field_text("missing"), None);
    }

    #[test]
    fn test_from_object_keeps_all_fields() {
        let object = json!({"a": 1, "b": "two"});
        let Value::Object(map) = object else {
            unreachable!()
        };

        let record = DocumentRecord::from_object(map);
        assert_eq!(record.field("a"), Some(&json!(1)));
        assert_eq!(record.field("b"), Some(&json!("two")));
        assert_eq!(record.reference(), None);
    }
}
