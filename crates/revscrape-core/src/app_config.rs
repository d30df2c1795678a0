use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which upstream API serves Google reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoogleProvider {
    SerpApi,
    DataForSeo,
    Places,
}

impl std::fmt::Display for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoogleProvider::SerpApi => write!(f, "serpapi"),
            GoogleProvider::DataForSeo => write!(f, "dataforseo"),
            GoogleProvider::Places => write!(f, "places"),
        }
    }
}

impl std::str::FromStr for GoogleProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serpapi" => Ok(GoogleProvider::SerpApi),
            "dataforseo" => Ok(GoogleProvider::DataForSeo),
            "places" => Ok(GoogleProvider::Places),
            other => Err(format!(
                "unknown provider \"{other}\" (expected serpapi, dataforseo, or places)"
            )),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub export_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub inter_page_delay_ms: u64,
    pub max_pages: usize,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub google_provider: GoogleProvider,
    pub serpapi_api_key: Option<String>,
    pub dataforseo_login: Option<String>,
    pub dataforseo_password: Option<String>,
    pub google_places_api_key: Option<String>,
    pub review_depth: u32,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub poll_budget_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("export_dir", &self.export_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("inter_page_delay_ms", &self.inter_page_delay_ms)
            .field("max_pages", &self.max_pages)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("google_provider", &self.google_provider)
            .field(
                "serpapi_api_key",
                &self.serpapi_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("dataforseo_login", &self.dataforseo_login)
            .field(
                "dataforseo_password",
                &self.dataforseo_password.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "google_places_api_key",
                &self.google_places_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("review_depth", &self.review_depth)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("poll_budget_secs", &self.poll_budget_secs)
            .finish()
    }
}
