//! Google reviews through the official Places API.
//!
//! The details endpoint returns at most five reviews and no pagination, so
//! this fetcher yields a single page.

use revscrape_core::{Platform, ReviewRecord};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{HttpClient, HttpConfig};
use crate::collector::{Page, PageFetcher};
use crate::error::ScraperError;

use super::{decode_item, lenient_number, lenient_text};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const PROVIDER: &str = "google_places";

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    error_message: Option<String>,
    result: Option<DetailsResult>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    #[serde(default)]
    reviews: Vec<Value>,
}

/// One entry of `result.reviews[]`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesReview {
    pub author_name: Option<String>,
    /// Documented as an integer; fractional values are rounded.
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub relative_time_description: Option<String>,
    pub author_url: Option<String>,
}

pub struct PlacesFetcher {
    http: HttpClient,
    base_url: String,
    api_key: String,
    query: String,
}

impl PlacesFetcher {
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
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<String, ScraperError> {
        let mut url =
            reqwest::Url::parse(&format!("{}/{path}", self.base_url)).map_err(|e| {
                ScraperError::InvalidSource {
                    source_handle: self.base_url.clone(),
                    reason: e.to_string(),
                }
            })?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);
        Ok(url.into())
    }

    async fn find_place_id(&self) -> Result<Option<String>, ScraperError> {
        let url = self.endpoint(
            "findplacefromtext/json",
            &[
                ("input", self.query.as_str()),
                ("inputtype", "textquery"),
                ("fields", "place_id"),
            ],
        )?;
        let response: FindPlaceResponse = self
            .http
            .get_json(&url, None, "places findplacefromtext")
            .await?;
        check_status(&response.status, response.error_message)?;
        Ok(response.candidates.into_iter().find_map(|c| c.place_id))
    }
}

/// `Ok(false)` for `ZERO_RESULTS`, `Ok(true)` for `OK`.
fn check_status(status: &str, error_message: Option<String>) -> Result<bool, ScraperError> {
    match status {
        "OK" => Ok(true),
        "ZERO_RESULTS" => Ok(false),
        other => Err(ScraperError::Api {
            provider: PROVIDER,
            message: match error_message {
                Some(detail) => format!("{other}: {detail}"),
                None => other.to_owned(),
            },
        }),
    }
}

impl PageFetcher for PlacesFetcher {
    type Cursor = ();
    /// Raw `result.reviews[]` entry, decoded into [`PlacesReview`].
    type Item = Value;

    fn platform(&self) -> Platform {
        Platform::Google
    }

    fn first_cursor(&self) {}

    async fn fetch_page(&mut self, _cursor: &()) -> Result<Page<(), Value>, ScraperError> {
        let Some(place_id) = self.find_place_id().await? else {
            tracing::info!(query = %self.query, "no place matched query");
            return Ok(Page::empty());
        };
        tracing::debug!(place_id, "resolved google place");

        let url = self.endpoint(
            "details/json",
            &[("place_id", place_id.as_str()), ("fields", "reviews")],
        )?;
        let response: DetailsResponse = self
            .http
            .get_json(&url, None, "places details")
            .await?;
        if !check_status(&response.status, response.error_message)? {
            return Ok(Page::empty());
        }
        Ok(Page::last(
            response.result.map(|r| r.reviews).unwrap_or_default(),
        ))
    }

    fn normalize(&self, item: Value) -> Result<ReviewRecord, ScraperError> {
        let review: PlacesReview = decode_item(item, &["author_url", "author_name"])?;
        let rating = review.rating.and_then(ReviewRecord::rating_from_float);
        let text = review.text.unwrap_or_default().trim().to_owned();

        if rating.is_none() && text.is_empty() {
            return Err(ScraperError::Normalization {
                source_id: review
                    .author_url
                    .unwrap_or_else(|| "<unknown>".to_owned()),
                reason: "review has neither text nor rating".to_owned(),
            });
        }

        Ok(ReviewRecord {
            reviewer_name: review.author_name.unwrap_or_default(),
            rating,
            text,
            date: review.relative_time_description.unwrap_or_default(),
            source_link: review.author_url,
            platform: Platform::Google,
        })
    }
}
