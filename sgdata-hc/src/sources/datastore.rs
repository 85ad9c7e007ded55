//! data.gov.sg datastore client for NEA hawker closure records
//!
//! The datastore API pages through a resource with `_links.next`. Paging
//! stops when the link is absent or a page yields no usable closures. A
//! failure after the first page ends paging with [`HcError::PartialFetch`],
//! which carries the pages read so far.

use crate::config::SourceConfig;
use crate::error::HcError;
use crate::extract::{extract_closures, SourceRecord};
use crate::models::ClosureFeed;
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One page of datastore records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatastorePage {
    pub records: Vec<SourceRecord>,
    /// Path (or absolute URL) of the following page
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatastoreResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    result: DatastoreResult,
}

#[derive(Debug, Default, Deserialize)]
struct DatastoreResult {
    #[serde(default)]
    records: Vec<SourceRecord>,
    #[serde(default, rename = "_links")]
    links: DatastoreLinks,
}

#[derive(Debug, Default, Deserialize)]
struct DatastoreLinks {
    #[serde(default)]
    next: Option<String>,
}

/// Decode a datastore response body
pub fn parse_page(body: &str) -> Result<DatastorePage, HcError> {
    let response: DatastoreResponse =
        serde_json::from_str(body).map_err(|e| HcError::Parse(e.to_string()))?;

    if response.success == Some(false) {
        return Err(HcError::Parse("datastore reported success=false".to_string()));
    }

    Ok(DatastorePage {
        records: response.result.records,
        next: response.result.links.next.filter(|n| !n.trim().is_empty()),
    })
}

/// Join a `next` link onto the API base URL
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Follow `next` links from `initial`, extracting closures from each page
///
/// `fetch_page` receives the path of each page in turn.
pub async fn paginate<F, Fut>(initial: String, max_pages: usize, mut fetch_page: F) -> Result<ClosureFeed, HcError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<DatastorePage, HcError>>,
{
    let mut feed = ClosureFeed::default();
    let mut seen = HashSet::new();
    let mut next = Some(initial);
    let mut pages = 0usize;

    while let Some(path) = next.take() {
        if pages >= max_pages {
            return Err(HcError::PartialFetch {
                feed,
                pages,
                reason: format!("page limit of {} reached", max_pages),
            });
        }
        if !seen.insert(path.clone()) {
            warn!(path = %path, "Datastore returned a link that was already fetched, stopping");
            break;
        }

        let page = match fetch_page(path).await {
            Ok(page) => page,
            Err(e) if pages == 0 => return Err(e),
            Err(e) => {
                return Err(HcError::PartialFetch {
                    feed,
                    pages,
                    reason: e.to_string(),
                })
            }
        };
        pages += 1;

        let extracted = extract_closures(&page.records);
        debug!(
            page = pages,
            records = page.records.len(),
            closures = extracted.entries.len(),
            skipped = extracted.skipped.len(),
            "Extracted datastore page"
        );
        feed.skipped.extend(extracted.skipped);

        if extracted.entries.is_empty() {
            break;
        }
        feed.entries.extend(extracted.entries);
        next = page.next;
    }

    info!(pages, closures = feed.entries.len(), "Fetched hawker closures");
    Ok(feed)
}

/// HTTP client for the closure dataset
pub struct DatastoreClient {
    http: reqwest::Client,
    base_url: String,
    dataset_id: String,
    page_limit: u32,
    max_pages: usize,
}

impl DatastoreClient {
    pub fn new(config: &SourceConfig) -> Result<Self, HcError> {
        Ok(Self {
            http: super::http_client(Duration::from_secs(config.timeout_secs))?,
            base_url: config.base_url.clone(),
            dataset_id: config.dataset_id.clone(),
            page_limit: config.page_limit,
            max_pages: config.max_pages,
        })
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Path of the first page
    pub fn initial_path(&self) -> String {
        format!(
            "/api/action/datastore_search?resource_id={}&limit={}",
            self.dataset_id, self.page_limit
        )
    }

    /// Fetch every page of the dataset
    pub async fn fetch_all_closures(&self) -> Result<ClosureFeed, HcError> {
        let client = self;
        paginate(self.initial_path(), self.max_pages, move |path| client.fetch_page(path)).await
    }

    async fn fetch_page(&self, path: String) -> Result<DatastorePage, HcError> {
        let url = resolve_url(&self.base_url, &path);
        info!(url = %url, "Fetching datastore page");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Datastore request failed");
            return Err(HcError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        parse_page(&body)
    }
}
