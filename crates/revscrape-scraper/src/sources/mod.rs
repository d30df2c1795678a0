//! Upstream review providers, one [`crate::PageFetcher`] each.

pub mod dataforseo;
pub mod places;
pub mod serpapi;
pub mod trustpilot;
mod trustpilot_parse;

use std::time::Duration;

use revscrape_core::{AppConfig, CollectionResult, FilterCriteria, GoogleProvider};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::client::HttpConfig;
use crate::collector::{collect, CollectOptions};
use crate::error::ScraperError;
use crate::poll::PollPolicy;

pub use dataforseo::DataForSeoFetcher;
pub use places::PlacesFetcher;
pub use serpapi::SerpApiFetcher;
pub use trustpilot::TrustpilotFetcher;
pub use trustpilot_parse::TrustpilotCard;

/// A Google review fetcher for whichever provider is configured.
///
/// The providers page differently, so this is a closed set dispatched by
/// `match` rather than a trait object.
pub enum GoogleFetcher {
    SerpApi(SerpApiFetcher),
    DataForSeo(DataForSeoFetcher),
    Places(PlacesFetcher),
}

impl GoogleFetcher {
    /// Builds the fetcher for `provider` from the application config.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Config`] when the provider's credentials are
    /// not configured, or [`ScraperError::Http`] if the HTTP client cannot be
    /// built.
    pub fn from_app_config(
        config: &AppConfig,
        provider: GoogleProvider,
        query: &str,
        location: Option<&str>,
    ) -> Result<Self, ScraperError> {
        let http = HttpConfig::from_app_config(config);
        Ok(match provider {
            GoogleProvider::SerpApi => Self::SerpApi(SerpApiFetcher::new(
                config.require_serpapi_key()?,
                query,
                location,
                &http,
            )?),
            GoogleProvider::DataForSeo => Self::DataForSeo(DataForSeoFetcher::new(
                config.require_dataforseo_credentials()?,
                query,
                location,
                config.review_depth,
                poll_policy(config),
                &http,
            )?),
            GoogleProvider::Places => Self::Places(PlacesFetcher::new(
                config.require_google_places_key()?,
                query,
                location,
                &http,
            )?),
        })
    }

    #[must_use]
    pub fn provider(&self) -> GoogleProvider {
        match self {
            Self::SerpApi(_) => GoogleProvider::SerpApi,
            Self::DataForSeo(_) => GoogleProvider::DataForSeo,
            Self::Places(_) => GoogleProvider::Places,
        }
    }

    /// Runs [`collect`] with the wrapped fetcher. Consumes the fetcher.
    pub async fn collect(
        self,
        filter: &FilterCriteria,
        options: CollectOptions,
    ) -> CollectionResult {
        match self {
            Self::SerpApi(mut f) => collect(&mut f, filter, options).await,
            Self::DataForSeo(mut f) => collect(&mut f, filter, options).await,
            Self::Places(mut f) => collect(&mut f, filter, options).await,
        }
    }
}

/// Polling limits for task-based providers.
#[must_use]
pub fn poll_policy(config: &AppConfig) -> PollPolicy {
    PollPolicy::new(
        Duration::from_secs(config.poll_interval_secs),
        config.poll_max_attempts,
        Duration::from_secs(config.poll_budget_secs),
    )
}

/// Decodes one raw review object into its typed shape.
///
/// JSON providers hand the collector untyped items so that one malformed
/// review fails its own normalization instead of the whole page. `id_fields`
/// are tried in order to label the item in the error.
pub(crate) fn decode_item<T: DeserializeOwned>(
    item: Value,
    id_fields: &[&str],
) -> Result<T, ScraperError> {
    let source_id = id_fields
        .iter()
        .find_map(|field| item.get(field).and_then(Value::as_str))
        .unwrap_or("<unknown>")
        .to_owned();
    serde_json::from_value(item).map_err(|e| ScraperError::Normalization {
        source_id,
        reason: e.to_string(),
    })
}

/// A number sent either as a JSON number or as a numeric string.
/// Anything else reads as absent.
pub(crate) fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Date-like text. Epoch numbers are rendered as their decimal string.
pub(crate) fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
