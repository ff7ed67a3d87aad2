//! Decision-search JSON API site
//!
//! Several high-court registries share the same search backend: a POST
//! `aramalist` endpoint that takes a page number and page size inside a
//! wrapped JSON body and answers with `{"data": {"recordsFiltered": N,
//! "data": [entries...]}}`. Each entry carries the decision metadata plus an
//! `id` that the document viewer endpoint (`getDokuman?id=...`) accepts.

use crate::document::{DocumentRecord, RawPage};
use crate::sites::pages_for;
use crate::source::{
    ExtractError, ExtractResult, PageSource, SiteStrategy, SourceError, SourceResult,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

const SEARCH_PATH: &str = "aramalist";

/// Page source for the decision-search API
pub struct DecisionsSource {
    client: Client,
    base_url: Url,
    page_size: u32,
}

impl DecisionsSource {
    pub fn new(client: Client, base_url: Url, page_size: u32) -> Self {
        Self {
            client,
            base_url,
            page_size,
        }
    }

    /// The wrapped search body; only the page number varies between requests
    fn request_body(&self, number: u32) -> Value {
        json!({
            "data": {
                "aranan": "***",
                "arananKelime": "***",
                "pageSize": self.page_size,
                "pageNumber": number,
            }
        })
    }

    async fn post_search(&self, number: u32) -> SourceResult<String> {
        let url = self
            .base_url
            .join(SEARCH_PATH)
            .map_err(|e| SourceError::Malformed {
                url: self.base_url.to_string(),
                message: e.to_string(),
            })?;

        let response = self
            .client
            .post(url.clone())
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&self.request_body(number))
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PageSource for DecisionsSource {
    async fn total_pages(&self) -> SourceResult<u32> {
        let body = self.post_search(1).await?;

        let value: Value = serde_json::from_str(&body).map_err(|e| SourceError::Malformed {
            url: self.base_url.to_string(),
            message: e.to_string(),
        })?;

        let records = value
            .get("data")
            .and_then(|data| data.get("recordsFiltered"))
            .and_then(Value::as_u64)
            .ok_or_else(|| SourceError::Malformed {
                url: self.base_url.to_string(),
                message: "response has no data.recordsFiltered".to_string(),
            })?;

        Ok(pages_for(records, self.page_size))
    }

    async fn fetch_page(&self, number: u32) -> SourceResult<RawPage> {
        let body = self.post_search(number).await?;
        Ok(RawPage::new(number, body))
    }
}

/// Extraction and naming rules for decision-search entries
pub struct DecisionsStrategy;

impl SiteStrategy for DecisionsStrategy {
    fn extract(&self, page: &RawPage) -> ExtractResult<Vec<DocumentRecord>> {
        let value: Value =
            serde_json::from_str(&page.body).map_err(|e| ExtractError::MalformedPage {
                page: page.number,
                message: e.to_string(),
            })?;

        // The backend wraps results twice; a missing or null inner array is
        // how it reports trouble, not an empty result set.
        let entries = value
            .get("data")
            .and_then(|data| data.get("data"))
            .and_then(Value::as_array)
            .ok_or_else(|| ExtractError::MalformedPage {
                page: page.number,
                message: "response has no data.data array".to_string(),
            })?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let Value::Object(fields) = entry else {
                continue;
            };

            let mut record = DocumentRecord::from_object(fields.clone());
            if let Some(id) = record.field_text("id") {
                record.set_reference(format!("getDokuman?id={}", id));
            }
            records.push(record);
        }

        Ok(records)
    }

    fn document_name(&self, record: &DocumentRecord) -> Option<String> {
        match (record.field_text("esasNo"), record.field_text("kararNo")) {
            (Some(esas), Some(karar)) => Some(format!("{}_{}", esas, karar).replace('/', "-")),
            // Older entries carry no case numbers; the backend id is stable.
            _ => record.field_text("id"),
        }
    }
}
