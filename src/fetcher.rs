//! Exhaustive retrieval of cursor-paginated list endpoints.
//!
//! The Atlas Admin API paginates list responses with `pageNum` /
//! `itemsPerPage` query parameters and signals continuation through a
//! `links` entry with `"rel": "next"`. A handful of older endpoints return
//! a bare JSON array instead of the envelope; both shapes are accepted.

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::client::AtlasClient;
use crate::outcome::RequestOutcome;

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Default hard ceiling on pages fetched from a single endpoint.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Pagination parameters for a fetch.
#[derive(Debug, Clone, Copy)]
pub struct PageQuery {
    /// Items requested per page.
    pub page_size: u32,
    /// Hard page-count ceiling; bounds worst-case work against a server
    /// that keeps advertising a next page.
    pub max_pages: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Walks a paginated list endpoint and accumulates every item.
pub struct PagedFetcher<'a> {
    client: &'a AtlasClient,
}

impl<'a> PagedFetcher<'a> {
    /// Create a fetcher over the given client.
    #[must_use]
    pub fn new(client: &'a AtlasClient) -> Self {
        Self { client }
    }

    /// Fetch all items from `path`, page by page, in page order.
    ///
    /// Best-effort: a page-level failure stops the walk and returns what was
    /// accumulated so far, so callers must treat a short result as partial
    /// rather than authoritative. An empty first page yields an empty vec.
    /// Hitting the page ceiling terminates with a warning (the server may
    /// hold more data).
    pub async fn fetch_all(&self, path: &str, query: &PageQuery) -> Vec<Value> {
        let mut items: Vec<Value> = Vec::new();
        let mut page: u32 = 1;

        loop {
            if page > query.max_pages {
                warn!(
                    path = %path,
                    max_pages = query.max_pages,
                    fetched = items.len(),
                    "Page ceiling reached, result may be truncated"
                );
                break;
            }

            let separator = if path.contains('?') { '&' } else { '?' };
            let paged_path = format!(
                "{path}{separator}pageNum={page}&itemsPerPage={}",
                query.page_size
            );

            let outcome = self
                .client
                .execute_with_retry(Method::GET, &paged_path, None)
                .await;

            let payload = match outcome {
                RequestOutcome::Success(Some(payload)) => payload,
                RequestOutcome::Success(None) => break,
                other => {
                    warn!(
                        path = %path,
                        page = page,
                        fetched = items.len(),
                        reason = ?other.failure_reason(),
                        "Page fetch failed, returning partial result"
                    );
                    break;
                }
            };

            match payload {
                // Bare array: the whole listing in one response.
                Value::Array(batch) => {
                    items.extend(batch);
                    break;
                }
                Value::Object(mut envelope) => {
                    let has_next = has_next_link(&envelope);
                    match envelope.remove("results") {
                        Some(Value::Array(batch)) if !batch.is_empty() => {
                            debug!(path = %path, page = page, count = batch.len(), "Fetched page");
                            items.extend(batch);
                            if !has_next {
                                break;
                            }
                        }
                        // Empty page or missing envelope field: exhausted.
                        _ => break,
                    }
                }
                _ => break,
            }

            page += 1;
        }

        items
    }
}

fn has_next_link(envelope: &Map<String, Value>) -> bool {
    envelope
        .get("links")
        .and_then(Value::as_array)
        .is_some_and(|links| {
            links
                .iter()
                .any(|link| link.get("rel").and_then(Value::as_str) == Some("next"))
        })
}
