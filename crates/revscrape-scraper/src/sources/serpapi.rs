//! Google Maps reviews through `SerpAPI`.
//!
//! Two-step: an `engine=google_maps` search resolves the business to a
//! `data_id`, then `engine=google_maps_reviews` is paged with
//! `next_page_token`.

use revscrape_core::{Platform, ReviewRecord};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{HttpClient, HttpConfig};
use crate::collector::{Page, PageFetcher};
use crate::error::ScraperError;

use super::{decode_item, lenient_number, lenient_text};

const DEFAULT_BASE_URL: &str = "https://serpapi.com";
const PROVIDER: &str = "serpapi";
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    error: Option<String>,
    place_results: Option<DataIdHolder>,
    #[serde(default)]
    local_results: Vec<DataIdHolder>,
}

#[derive(Debug, Deserialize)]
struct DataIdHolder {
    data_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewsResponse {
    error: Option<String>,
    /// Left untyped so one odd review cannot sink the page.
    #[serde(default)]
    reviews: Vec<Value>,
    serpapi_pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next_page_token: Option<String>,
}

/// One entry of `reviews[]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SerpApiReview {
    pub review_id: Option<String>,
    pub user: Option<SerpApiUser>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    pub snippet: Option<String>,
    pub extracted_snippet: Option<ExtractedSnippet>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub iso_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SerpApiUser {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedSnippet {
    pub original: Option<String>,
}

pub struct SerpApiFetcher {
    http: HttpClient,
    base_url: String,
    api_key: String,
    query: String,
    /// Resolved on the first fetch.
    data_id: Option<String>,
}

impl SerpApiFetcher {
    /// `query` is a business name or address; `location`, when present, is
    /// appended to it to disambiguate.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(
        api_key: &str,
        query: &str,
        location: Option<&str>,
        config: &HttpConfig,
    ) -> Result<Self, ScraperError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, query, location, config)
    }

    /// Same as [`Self::new`] against a custom base URL (mock servers).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        query: &str,
        location: Option<&str>,
        config: &HttpConfig,
    ) -> Result<Self, ScraperError> {
        let query = match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(location) => format!("{} {location}", query.trim()),
            None => query.trim().to_owned(),
        };
        Ok(Self {
            http: HttpClient::new(config)?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            query,
            data_id: None,
        })
    }

    fn search_url(&self, params: &[(&str, &str)]) -> Result<String, ScraperError> {
        let mut url = reqwest::Url::parse(&format!("{}/search.json", self.base_url)).map_err(
            |e| ScraperError::InvalidSource {
                source_handle: self.base_url.clone(),
                reason: e.to_string(),
            },
        )?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("api_key", &self.api_key);
        Ok(url.into())
    }

    /// Returns `None` when the search has no match.
    async fn resolve_data_id(&self) -> Result<Option<String>, ScraperError> {
        let url = self.search_url(&[
            ("engine", "google_maps"),
            ("type", "search"),
            ("q", self.query.as_str()),
            ("hl", "en"),
        ])?;
        let response: SearchResponse = self
            .http
            .get_json(&url, None, "serpapi google_maps search")
            .await?;

        if let Some(message) = response.error {
            return api_error_or_empty(message);
        }
        let data_id = response
            .place_results
            .and_then(|p| p.data_id)
            .or_else(|| response.local_results.into_iter().find_map(|r| r.data_id));
        tracing::debug!(query = %self.query, data_id = ?data_id, "resolved serpapi data_id");
        Ok(data_id)
    }
}

fn api_error_or_empty<T>(message: String) -> Result<Option<T>, ScraperError> {
    if message.contains(NO_RESULTS_MARKER) {
        Ok(None)
    } else {
        Err(ScraperError::Api {
            provider: PROVIDER,
            message,
        })
    }
}

impl PageFetcher for SerpApiFetcher {
    /// `next_page_token`; `None` for the first page.
    type Cursor = Option<String>;
    /// One raw `reviews[]` entry; decoded into [`SerpApiReview`] by
    /// `normalize`.
    type Item = Value;

    fn platform(&self) -> Platform {
        Platform::Google
    }

    fn first_cursor(&self) -> Option<String> {
        None
    }

    async fn fetch_page(
        &mut self,
        token: &Option<String>,
    ) -> Result<Page<Option<String>, Value>, ScraperError> {
        let data_id = match &self.data_id {
            Some(id) => id.clone(),
            None => match self.resolve_data_id().await? {
                Some(id) => {
                    self.data_id = Some(id.clone());
                    id
                }
                None => {
                    tracing::info!(query = %self.query, "no google maps place matched query");
                    return Ok(Page::empty());
                }
            },
        };

        let mut params = vec![
            ("engine", "google_maps_reviews"),
            ("data_id", data_id.as_str()),
            ("hl", "en"),
        ];
        if let Some(token) = token {
            params.push(("next_page_token", token.as_str()));
        }
        let url = self.search_url(&params)?;
        let response: ReviewsResponse = self
            .http
            .get_json(&url, None, "serpapi google_maps_reviews")
            .await?;

        if let Some(message) = response.error {
            return api_error_or_empty(message).map(|_: Option<()>| Page::empty());
        }

        let next = response
            .serpapi_pagination
            .and_then(|p| p.next_page_token)
            .filter(|t| !t.is_empty())
            .map(Some);
        Ok(Page {
            items: response.reviews,
            next,
        })
    }

    fn normalize(&self, item: Value) -> Result<ReviewRecord, ScraperError> {
        let review: SerpApiReview = decode_item(item, &["review_id", "link"])?;
        let text = review
            .snippet
            .filter(|s| !s.trim().is_empty())
            .or_else(|| review.extracted_snippet.and_then(|e| e.original))
            .unwrap_or_default();
        let rating = review.rating.and_then(ReviewRecord::rating_from_float);

        if rating.is_none() && text.is_empty() {
            return Err(ScraperError::Normalization {
                source_id: review
                    .review_id
                    .or(review.link)
                    .unwrap_or_else(|| "<unknown>".to_owned()),
                reason: "review has neither text nor rating".to_owned(),
            });
        }

        Ok(ReviewRecord {
            reviewer_name: review.user.and_then(|u| u.name).unwrap_or_default(),
            rating,
            text,
            date: review.iso_date.or(review.date).unwrap_or_default(),
            source_link: review.link,
            platform: Platform::Google,
        })
    }
}
