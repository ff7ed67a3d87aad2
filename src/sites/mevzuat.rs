//! Legislation datatable JSON API site
//!
//! The legislation registry paginates through a DataTables-style endpoint:
//! POST `anasayfa/MevzuatDatatable` with `draw`/`start`/`length` advancing
//! per page, total count in `recordsTotal`, entries under `data`.
//!
//! Entries point at documents two different ways:
//! - binary attachments carry a fully-qualified `url` that is fetched as-is
//! - everything else carries a relative viewer URL whose query parameters
//!   identify the statute; the MS Word export endpoint
//!   `MevzuatMetin/<Tur>.<Tertip>.<No>.doc` serves the content directly and
//!   saves parsing the viewer page

use crate::document::{DocumentRecord, RawPage};
use crate::sites::pages_for;
use crate::source::{
    ExtractError, ExtractResult, PageSource, SiteStrategy, SourceError, SourceResult,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

const DATATABLE_PATH: &str = "anasayfa/MevzuatDatatable";

/// Page source for the legislation datatable API
pub struct MevzuatSource {
    client: Client,
    base_url: Url,
    page_size: u32,
}

impl MevzuatSource {
    pub fn new(client: Client, base_url: Url, page_size: u32) -> Self {
        Self {
            client,
            base_url,
            page_size,
        }
    }

    /// The DataTables request body; `draw` and `start` advance per page
    fn request_body(&self, number: u32) -> Value {
        let column = json!({
            "data": null,
            "name": "",
            "searchable": true,
            "orderable": false,
            "search": {"value": "", "regex": false},
        });

        json!({
            "draw": number,
            "columns": [column.clone(), column.clone(), column],
            "order": [],
            "start": (number - 1) * self.page_size,
            "length": self.page_size,
            "search": {"value": "", "regex": false},
            "parameters": {
                "AranacakIfade": "Kg==",
                "AranacakYer": "Baslik",
                "TamCumle": false,
                "MevzuatTur": 0,
                "GenelArama": true,
            }
        })
    }

    async fn post_datatable(&self, number: u32) -> SourceResult<String> {
        let url = self
            .base_url
            .join(DATATABLE_PATH)
            .map_err(|e| SourceError::Malformed {
                url: self.base_url.to_string(),
                message: e.to_string(),
            })?;

        let response = self
            .client
            .post(url.clone())
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
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
impl PageSource for MevzuatSource {
    async fn total_pages(&self) -> SourceResult<u32> {
        let body = self.post_datatable(1).await?;

        let value: Value = serde_json::from_str(&body).map_err(|e| SourceError::Malformed {
            url: self.base_url.to_string(),
            message: e.to_string(),
        })?;

        let records = value
            .get("recordsTotal")
            .and_then(Value::as_u64)
            .ok_or_else(|| SourceError::Malformed {
                url: self.base_url.to_string(),
                message: "response has no recordsTotal".to_string(),
            })?;

        Ok(pages_for(records, self.page_size))
    }

    async fn fetch_page(&self, number: u32) -> SourceResult<RawPage> {
        let body = self.post_datatable(number).await?;
        Ok(RawPage::new(number, body))
    }
}

/// Extraction and naming rules for legislation entries
pub struct MevzuatStrategy;

impl SiteStrategy for MevzuatStrategy {
    fn extract(&self, page: &RawPage) -> ExtractResult<Vec<DocumentRecord>> {
        let value: Value =
            serde_json::from_str(&page.body).map_err(|e| ExtractError::MalformedPage {
                page: page.number,
                message: e.to_string(),
            })?;

        let entries = value
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| ExtractError::MalformedPage {
                page: page.number,
                message: "response has no data array".to_string(),
            })?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let Value::Object(fields) = entry else {
                continue;
            };

            let mut record = DocumentRecord::from_object(fields.clone());
            if let Some(url_field) = record.field_text("url") {
                if url_field.starts_with("http") {
                    // Binary attachment; the url is the complete locator
                    record.set_reference(url_field);
                } else if let Some(reference) = word_export_reference(&url_field) {
                    record.set_reference(reference);
                }
            }
            records.push(record);
        }

        Ok(records)
    }

    fn document_name(&self, record: &DocumentRecord) -> Option<String> {
        let tur = record.field_text("mevzuatTur")?;
        let tertip = record.field_text("mevzuatTertip")?;
        let no = record.field_text("mevzuatNo")?;
        Some(format!("{}_{}_{}", tur, tertip, no))
    }
}

/// Rewrites a relative viewer URL into the Word-export reference
///
/// Viewer URLs look like `mevzuat?MevzuatNo=5237&MevzuatTur=1&MevzuatTertip=5`;
/// the export endpoint wants `MevzuatMetin/1.5.5237.doc`.
fn word_export_reference(url_field: &str) -> Option<String> {
    let (_, query) = url_field.split_once('?')?;

    let mut tur = None;
    let mut tertip = None;
    let mut no = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "MevzuatTur" => tur = Some(value.into_owned()),
            "MevzuatTertip" => tertip = Some(value.into_owned()),
            "MevzuatNo" => no = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(format!("MevzuatMetin/{}.{}.{}.doc", tur?, tertip?, no?))
}
