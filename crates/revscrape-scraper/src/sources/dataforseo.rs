//! Google reviews through the `DataForSEO` business data API.
//!
//! The API is task based: `task_post` enqueues a job and `task_get` is polled
//! until the job is done. The whole review set arrives at once, so this
//! fetcher always yields a single page.

use revscrape_core::{Platform, ReviewRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{HttpClient, HttpConfig};
use crate::collector::{Page, PageFetcher};
use crate::error::ScraperError;
use crate::poll::{PollOutcome, PollPolicy};

use super::{decode_item, lenient_number, lenient_text};

const DEFAULT_BASE_URL: &str = "https://api.dataforseo.com";
const PROVIDER: &str = "dataforseo";
const DEFAULT_LOCATION: &str = "United States";
const LANGUAGE: &str = "English";

const STATUS_OK: i64 = 20000;
const STATUS_TASK_CREATED: i64 = 20100;
const STATUS_TASK_HANDED: i64 = 40601;
const STATUS_TASK_IN_QUEUE: i64 = 40602;

#[derive(Debug, Serialize)]
struct TaskPost<'a> {
    keyword: &'a str,
    location_name: &'a str,
    language_name: &'a str,
    depth: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status_code: i64,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct Task {
    id: Option<String>,
    status_code: i64,
    #[serde(default)]
    status_message: String,
    result: Option<Vec<TaskResult>>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    #[serde(default)]
    items: Option<Vec<Value>>,
}

/// One entry of `result[0].items[]`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataForSeoReview {
    pub review_id: Option<String>,
    pub profile_name: Option<String>,
    pub rating: Option<DataForSeoRating>,
    pub review_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    pub review_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataForSeoRating {
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
}

pub struct DataForSeoFetcher {
    http: HttpClient,
    base_url: String,
    login: String,
    password: String,
    keyword: String,
    location_name: String,
    depth: u32,
    poll: PollPolicy,
}

impl DataForSeoFetcher {
    /// `location` defaults to `"United States"` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(
        credentials: (&str, &str),
        keyword: &str,
        location: Option<&str>,
        depth: u32,
        poll: PollPolicy,
        config: &HttpConfig,
    ) -> Result<Self, ScraperError> {
        Self::with_base_url(
            DEFAULT_BASE_URL,
            credentials,
            keyword,
            location,
            depth,
            poll,
            config,
        )
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: &str,
        (login, password): (&str, &str),
        keyword: &str,
        location: Option<&str>,
        depth: u32,
        poll: PollPolicy,
        config: &HttpConfig,
    ) -> Result<Self, ScraperError> {
        Ok(Self {
            http: HttpClient::new(config)?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            login: login.to_owned(),
            password: password.to_owned(),
            keyword: keyword.trim().to_owned(),
            location_name: location
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .unwrap_or(DEFAULT_LOCATION)
                .to_owned(),
            depth,
            poll,
        })
    }

    fn auth(&self) -> Option<(&str, &str)> {
        Some((self.login.as_str(), self.password.as_str()))
    }

    async fn post_task(&self) -> Result<String, ScraperError> {
        let url = format!(
            "{}/v3/business_data/google/reviews/task_post",
            self.base_url
        );
        let payload = [TaskPost {
            keyword: &self.keyword,
            location_name: &self.location_name,
            language_name: LANGUAGE,
            depth: self.depth,
        }];
        let envelope: Envelope = self
            .http
            .post_json(&url, &payload, self.auth(), "dataforseo task_post")
            .await?;
        let task = first_task(envelope)?;

        if task.status_code != STATUS_TASK_CREATED && task.status_code != STATUS_OK {
            return Err(api_error(task.status_code, &task.status_message));
        }
        task.id.ok_or_else(|| ScraperError::Api {
            provider: PROVIDER,
            message: "task_post response carried no task id".to_owned(),
        })
    }

    /// `Ok(None)` while the task is still queued.
    async fn get_task(
        &self,
        task_id: &str,
    ) -> Result<Option<Vec<Value>>, ScraperError> {
        let url = format!(
            "{}/v3/business_data/google/reviews/task_get/{task_id}",
            self.base_url
        );
        let envelope: Envelope = self
            .http
            .get_json(&url, self.auth(), "dataforseo task_get")
            .await?;
        let task = first_task(envelope)?;

        match task.status_code {
            STATUS_OK => Ok(Some(
                task.result
                    .and_then(|results| results.into_iter().next())
                    .and_then(|r| r.items)
                    .unwrap_or_default(),
            )),
            STATUS_TASK_HANDED | STATUS_TASK_IN_QUEUE => Ok(None),
            code => Err(api_error(code, &task.status_message)),
        }
    }
}

fn first_task(envelope: Envelope) -> Result<Task, ScraperError> {
    if envelope.status_code != STATUS_OK {
        return Err(api_error(envelope.status_code, &envelope.status_message));
    }
    envelope
        .tasks
        .into_iter()
        .next()
        .ok_or_else(|| ScraperError::Api {
            provider: PROVIDER,
            message: "response carried no tasks".to_owned(),
        })
}

fn api_error(code: i64, message: &str) -> ScraperError {
    ScraperError::Api {
        provider: PROVIDER,
        message: format!("status {code}: {message}"),
    }
}

impl PageFetcher for DataForSeoFetcher {
    type Cursor = ();
    /// Raw `items[]` entry, decoded into [`DataForSeoReview`].
    type Item = Value;

    fn platform(&self) -> Platform {
        Platform::Google
    }

    fn first_cursor(&self) {}

    async fn fetch_page(
        &mut self,
        _cursor: &(),
    ) -> Result<Page<(), Value>, ScraperError> {
        let task_id = self.post_task().await?;
        tracing::info!(task_id, keyword = %self.keyword, "dataforseo task posted");

        let this = &*self;
        let outcome = this.poll.poll(|_| this.get_task(&task_id)).await?;
        match outcome {
            PollOutcome::Ready(items) => Ok(Page::last(items)),
            PollOutcome::Pending { attempts, .. } => Err(ScraperError::StillPending {
                task_id,
                attempts,
            }),
        }
    }

    fn normalize(&self, item: Value) -> Result<ReviewRecord, ScraperError> {
        let review: DataForSeoReview = decode_item(item, &["review_id", "review_url"])?;
        let rating = review
            .rating
            .and_then(|r| r.value)
            .and_then(ReviewRecord::rating_from_float);
        let text = review.review_text.unwrap_or_default().trim().to_owned();

        if rating.is_none() && text.is_empty() {
            return Err(ScraperError::Normalization {
                source_id: review
                    .review_id
                    .or(review.review_url)
                    .unwrap_or_else(|| "<unknown>".to_owned()),
                reason: "review has neither text nor rating".to_owned(),
            });
        }

        Ok(ReviewRecord {
            reviewer_name: review.profile_name.unwrap_or_default(),
            rating,
            text,
            date: review.timestamp.unwrap_or_default(),
            source_link: review.review_url,
            platform: Platform::Google,
        })
    }
}
