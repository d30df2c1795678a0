//! Generic pagination-and-filter loop.
//!
//! Every upstream provider is an implementation of [`PageFetcher`]; the loop
//! in [`collect`] is the only place that walks cursors, applies the inter-page
//! delay, filters, and decides when to stop.
//!
//! ## Termination
//!
//! | Condition                              | [`Termination`]        |
//! |----------------------------------------|------------------------|
//! | fetcher reports no next cursor         | `Exhausted`            |
//! | fetcher returns zero items             | `EmptyPage`            |
//! | `max_pages` fetches already made       | `PageLimit`            |
//! | fetch error                            | `FetchFailed`          |
//! | upstream task never became ready       | `StillPending`         |
//!
//! Records accumulated before an early stop are always kept.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use revscrape_core::{
    matched_keywords, matches, CollectionResult, FilterCriteria, Platform, ReviewRecord,
    Termination,
};

use crate::error::ScraperError;

/// One batch of raw upstream items plus the cursor for the next batch.
///
/// `next == None` means the upstream has no further pages.
#[derive(Debug)]
pub struct Page<C, T> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl<C, T> Page<C, T> {
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::last(Vec::new())
    }
}

/// Source-specific capability driven by [`collect`].
///
/// Implementations own their HTTP client and any resolved upstream handles
/// (place IDs, task IDs). They are constructed per run by the caller and
/// dropped when the run ends.
pub trait PageFetcher {
    /// Pagination state: a page number, continuation token, or task handle.
    type Cursor: Clone + Debug + Send;
    /// Raw upstream payload for one review.
    type Item: Send;

    fn platform(&self) -> Platform;

    fn first_cursor(&self) -> Self::Cursor;

    /// Fetches the page at `cursor`.
    fn fetch_page(
        &mut self,
        cursor: &Self::Cursor,
    ) -> impl Future<Output = Result<Page<Self::Cursor, Self::Item>, ScraperError>> + Send;

    /// Maps one raw payload to the canonical record.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Normalization`] when the payload lacks the
    /// fields needed to make a useful record. The collector skips such items.
    fn normalize(&self, item: Self::Item) -> Result<ReviewRecord, ScraperError>;
}

/// Loop limits for one collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOptions {
    /// Flat sleep between successive fetches. Not applied before the first.
    pub inter_page_delay: Duration,
    /// Maximum number of fetches; guards against cycling cursors.
    pub max_pages: usize,
}

impl CollectOptions {
    #[must_use]
    pub fn new(inter_page_delay_ms: u64, max_pages: usize) -> Self {
        Self {
            inter_page_delay: Duration::from_millis(inter_page_delay_ms),
            max_pages,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &revscrape_core::AppConfig) -> Self {
        Self::new(config.inter_page_delay_ms, config.max_pages)
    }
}

/// Walks `fetcher` page by page, keeping the records that pass `filter`.
///
/// Never fails: fetch errors end the run early and are reported through
/// [`CollectionResult::termination`], with everything collected so far kept.
/// Items that fail normalization are counted in
/// [`CollectionResult::skipped`] and the run continues.
pub async fn collect<F>(
    fetcher: &mut F,
    filter: &FilterCriteria,
    options: CollectOptions,
) -> CollectionResult
where
    F: PageFetcher + Send,
{
    let platform = fetcher.platform();
    let mut result = CollectionResult::new(platform);
    let mut cursor = fetcher.first_cursor();

    let termination = loop {
        if result.pages_fetched() >= options.max_pages {
            tracing::warn!(
                platform = platform.as_str(),
                max_pages = options.max_pages,
                "page limit reached, stopping collection"
            );
            break Termination::PageLimit {
                max_pages: options.max_pages,
            };
        }

        if result.pages_fetched() > 0 && !options.inter_page_delay.is_zero() {
            tokio::time::sleep(options.inter_page_delay).await;
        }

        let page_number = result.pages_fetched() + 1;
        tracing::debug!(platform = platform.as_str(), page = page_number, cursor = ?cursor, "fetching page");

        let page = match fetcher.fetch_page(&cursor).await {
            Ok(page) => page,
            Err(ScraperError::StillPending { task_id, attempts }) => {
                tracing::warn!(
                    platform = platform.as_str(),
                    task_id,
                    attempts,
                    "upstream task still pending, stopping collection"
                );
                break Termination::StillPending { attempts };
            }
            Err(e) => {
                tracing::warn!(
                    platform = platform.as_str(),
                    page = page_number,
                    error = %e,
                    collected = result.len(),
                    "page fetch failed, returning partial results"
                );
                break Termination::FetchFailed {
                    page: page_number,
                    reason: e.to_string(),
                };
            }
        };
        result.record_page();

        if page.items.is_empty() {
            tracing::debug!(
                platform = platform.as_str(),
                page = page_number,
                "empty page, end of stream"
            );
            break Termination::EmptyPage;
        }

        let item_count = page.items.len();
        for item in page.items {
            match fetcher.normalize(item) {
                Ok(record) => {
                    if matches(&record, filter) {
                        let keywords = matched_keywords(&record, filter);
                        result.push(record, keywords);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        platform = platform.as_str(),
                        page = page_number,
                        error = %e,
                        "skipping review that failed normalization"
                    );
                    result.record_skipped();
                }
            }
        }
        tracing::info!(
            platform = platform.as_str(),
            page = page_number,
            items = item_count,
            collected = result.len(),
            "page processed"
        );

        match page.next {
            Some(next) => cursor = next,
            None => break Termination::Exhausted,
        }
    };

    result.finish(termination)
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
