use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("normalization error for review {source_id}: {reason}")]
    Normalization { source_id: String, reason: String },

    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("task {task_id} still pending after {attempts} poll attempts")]
    StillPending { task_id: String, attempts: u32 },

    #[error(transparent)]
    Config(#[from] revscrape_core::ConfigError),

    #[error("invalid review source \"{source_handle}\": {reason}")]
    InvalidSource {
        source_handle: String,
        reason: String,
    },
}
