//! Shared HTTP plumbing for the review source adapters.

mod origin;

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

pub use origin::{absolutize, extract_domain, extract_origin};

/// Connection settings every adapter is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Maximum number of retry attempts after the first failure.
    pub max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    pub backoff_base_secs: u64,
}

impl HttpConfig {
    #[must_use]
    pub fn from_app_config(config: &revscrape_core::AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
        }
    }
}

/// `reqwest::Client` plus the retry policy.
///
/// Status handling is uniform across adapters: 429 becomes
/// [`ScraperError::RateLimited`], 404 becomes [`ScraperError::NotFound`], any
/// other non-2xx becomes [`ScraperError::UnexpectedStatus`]. Transient errors
/// are retried with exponential backoff.
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(config: &HttpConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff_base_secs: config.backoff_base_secs,
        })
    }

    /// GETs `url` and returns the body as text.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries exhausted.
    /// - [`ScraperError::NotFound`]: HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status (5xx retried, 4xx not).
    /// - [`ScraperError::Http`]: network or TLS failure after all retries exhausted.
    pub async fn get_text(&self, url: &str) -> Result<String, ScraperError> {
        self.send(url, || {
            self.client
                .get(url)
                .header(
                    reqwest::header::ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        })
        .await
    }

    /// GETs `url` and deserializes the JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_text`], plus [`ScraperError::Deserialize`] if the
    /// body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        basic_auth: Option<(&str, &str)>,
        context: &str,
    ) -> Result<T, ScraperError> {
        let body = self
            .send(url, || {
                let request = self
                    .client
                    .get(url)
                    .header(reqwest::header::ACCEPT, "application/json");
                with_basic_auth(request, basic_auth)
            })
            .await?;
        parse_json(&body, context)
    }

    /// POSTs `payload` as JSON to `url` and deserializes the JSON response.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_json`].
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        payload: &B,
        basic_auth: Option<(&str, &str)>,
        context: &str,
    ) -> Result<T, ScraperError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = self
            .send(url, || {
                let request = self
                    .client
                    .post(url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .json(payload);
                with_basic_auth(request, basic_auth)
            })
            .await?;
        parse_json(&body, context)
    }

    async fn send<F>(&self, url: &str, build: F) -> Result<String, ScraperError>
    where
        F: Fn() -> RequestBuilder,
    {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let request = build();
            async move {
                let response = request.send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScraperError::RateLimited {
                        domain: extract_domain(url),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ScraperError::NotFound {
                        url: url.to_owned(),
                    });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_owned(),
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }
}

fn with_basic_auth(request: RequestBuilder, basic_auth: Option<(&str, &str)>) -> RequestBuilder {
    match basic_auth {
        Some((login, password)) => request.basic_auth(login, Some(password)),
        None => request,
    }
}

fn parse_json<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, ScraperError> {
    serde_json::from_str::<T>(body).map_err(|e| ScraperError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
