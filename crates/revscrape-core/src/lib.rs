pub mod app_config;
pub mod config;
pub mod filter;
pub mod reviews;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, GoogleProvider};
pub use config::{load_app_config, load_app_config_from_env};
pub use filter::{matched_keywords, matches, FilterCriteria, FilterError};
pub use reviews::{
    CollectionOutcome, CollectionResult, Platform, ReviewMatch, ReviewRecord, Termination,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
