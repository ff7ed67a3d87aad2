//! Jurisdictional-dispute decision HTML grid site
//!
//! This registry has no JSON API at all: results come back as an HTML grid
//! fragment (`Arama/_Grid?...&page=N`), five cells per decision, and the
//! total page count is tucked into a `data-max` attribute on the pagination
//! input of the landing page.

use crate::document::{DocumentRecord, RawPage};
use crate::source::{
    ExtractError, ExtractResult, PageSource, SiteStrategy, SourceError, SourceResult,
};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

const GRID_PATH: &str =
    "Arama/_Grid?ExcludeGerekce=False&OrderCol=KararSayisi&OrderAsc=False&WordsOnly=False&page=";

/// The grid lays out each decision as five consecutive annotated cells
const CELLS_PER_DECISION: usize = 5;

/// Page source for the decision HTML grid
pub struct UyusmazlikSource {
    client: Client,
    base_url: Url,
}

impl UyusmazlikSource {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    async fn get_text(&self, url: Url) -> SourceResult<String> {
        let response = self
            .client
            .get(url.clone())
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
impl PageSource for UyusmazlikSource {
    /// Reads the total page count off the landing page's pagination input
    async fn total_pages(&self) -> SourceResult<u32> {
        let body = self.get_text(self.base_url.clone()).await?;
        let document = Html::parse_document(&body);

        let selector =
            Selector::parse("input.pageInput").map_err(|e| SourceError::Malformed {
                url: self.base_url.to_string(),
                message: format!("selector: {:?}", e),
            })?;

        document
            .select(&selector)
            .next()
            .and_then(|input| input.value().attr("data-max"))
            .and_then(|max| max.trim().parse::<u32>().ok())
            .ok_or_else(|| SourceError::Malformed {
                url: self.base_url.to_string(),
                message: "landing page has no readable input.pageInput[data-max]".to_string(),
            })
    }

    async fn fetch_page(&self, number: u32) -> SourceResult<RawPage> {
        let url = self
            .base_url
            .join(&format!("{}{}", GRID_PATH, number))
            .map_err(|e| SourceError::Malformed {
                url: self.base_url.to_string(),
                message: e.to_string(),
            })?;

        let body = self.get_text(url).await?;
        Ok(RawPage::new(number, body))
    }
}

/// Extraction and naming rules for the decision grid
pub struct UyusmazlikStrategy;

impl SiteStrategy for UyusmazlikStrategy {
    fn extract(&self, page: &RawPage) -> ExtractResult<Vec<DocumentRecord>> {
        let document = Html::parse_document(&page.body);

        let cell_selector =
            Selector::parse("div[data-content]").map_err(|e| ExtractError::MalformedPage {
                page: page.number,
                message: format!("selector: {:?}", e),
            })?;
        let anchor_selector =
            Selector::parse("a").map_err(|e| ExtractError::MalformedPage {
                page: page.number,
                message: format!("selector: {:?}", e),
            })?;

        let cells: Vec<ElementRef> = document.select(&cell_selector).collect();

        // A page past the end of the results simply has no cells; a page
        // with a dangling partial group is a truncated response.
        if cells.len() % CELLS_PER_DECISION != 0 {
            return Err(ExtractError::MalformedPage {
                page: page.number,
                message: format!(
                    "grid has {} cells, not a multiple of {}",
                    cells.len(),
                    CELLS_PER_DECISION
                ),
            });
        }

        let mut records = Vec::with_capacity(cells.len() / CELLS_PER_DECISION);
        for group in cells.chunks(CELLS_PER_DECISION) {
            let mut record = DocumentRecord::new();

            let lead = group[0];
            if let Some(content) = lead.value().attr("data-content") {
                record.insert_field("data_content", Value::String(content.trim().to_string()));
            }
            if let Some(anchor) = lead.select(&anchor_selector).next() {
                if let Some(href) = anchor.value().attr("href") {
                    record.set_reference(href);
                }
                record.insert_field("karar_sayisi", Value::String(anchor_text(&anchor)));
            }

            let remaining = ["esas_sayisi", "bolum", "uyusmazlik", "karar_sonucu"];
            for (cell, field) in group[1..].iter().zip(remaining) {
                if let Some(anchor) = cell.select(&anchor_selector).next() {
                    record.insert_field(field, Value::String(anchor_text(&anchor)));
                }
            }

            records.push(record);
        }

        Ok(records)
    }

    fn document_name(&self, record: &DocumentRecord) -> Option<String> {
        let karar = record.field_text("karar_sayisi")?;
        let esas = record.field_text("esas_sayisi")?;
        Some(format!("{}_{}", karar, esas).replace('/', "-"))
    }
}

fn anchor_text(anchor: &ElementRef) -> String {
    anchor.text().collect::<String>().trim().to_string()
}
