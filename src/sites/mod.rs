//! Site strategy implementations
//!
//! Each submodule pairs a `PageSource` with a `SiteStrategy` for one family
//! of registry endpoints:
//! - `decisions`: decision-search JSON APIs (aramalist endpoints)
//! - `mevzuat`: the legislation datatable JSON API
//! - `uyusmazlik`: the jurisdictional-dispute decision HTML grid
//!
//! The engine never sees these types directly; `build_site` hands back trait
//! objects selected by the configured site kind.

mod decisions;
mod mevzuat;
mod uyusmazlik;

pub use decisions::{DecisionsSource, DecisionsStrategy};
pub use mevzuat::{MevzuatSource, MevzuatStrategy};
pub use uyusmazlik::{UyusmazlikSource, UyusmazlikStrategy};

use crate::config::SiteKind;
use crate::source::{PageSource, SiteStrategy};
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Builds the page source and strategy pair for one configured target
///
/// # Arguments
///
/// * `kind` - Site family from the target configuration
/// * `client` - Shared HTTP client
/// * `base_url` - Target base URL (validated to end with `/`)
/// * `page_size` - Entries per listing page (ignored by sites whose page
///   size is fixed server-side)
pub fn build_site(
    kind: SiteKind,
    client: Client,
    base_url: Url,
    page_size: u32,
) -> (Arc<dyn PageSource>, Arc<dyn SiteStrategy>) {
    match kind {
        SiteKind::Decisions => (
            Arc::new(DecisionsSource::new(client, base_url, page_size)),
            Arc::new(DecisionsStrategy),
        ),
        SiteKind::Mevzuat => (
            Arc::new(MevzuatSource::new(client, base_url, page_size)),
            Arc::new(MevzuatStrategy),
        ),
        SiteKind::Uyusmazlik => (
            Arc::new(UyusmazlikSource::new(client, base_url)),
            Arc::new(UyusmazlikStrategy),
        ),
    }
}

/// Converts a total record count into a page count (final partial page
/// included)
pub(crate) fn pages_for(records: u64, page_size: u32) -> u32 {
    records.div_ceil(page_size as u64) as u32
}
