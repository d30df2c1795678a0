use crate::app_config::{AppConfig, Environment, GoogleProvider};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files, for tests
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Provider credentials are optional here; they are demanded only when a run
/// actually needs them (see [`AppConfig::require_serpapi_key`] and friends).
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("REVSCRAPE_ENV", "development"))?;

    let bind_addr = or_default("REVSCRAPE_BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("REVSCRAPE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("REVSCRAPE_LOG_LEVEL", "info");
    let export_dir = PathBuf::from(or_default("REVSCRAPE_EXPORT_DIR", "./exports"));

    let request_timeout_secs = parse_u64("REVSCRAPE_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("REVSCRAPE_USER_AGENT", DEFAULT_USER_AGENT);
    let inter_page_delay_ms = parse_u64("REVSCRAPE_INTER_PAGE_DELAY_MS", "2000")?;
    let max_pages = parse_usize("REVSCRAPE_MAX_PAGES", "200")?;
    if max_pages == 0 {
        return Err(invalid("REVSCRAPE_MAX_PAGES", "must be at least 1".into()));
    }
    let max_retries = parse_u32("REVSCRAPE_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("REVSCRAPE_RETRY_BACKOFF_BASE_SECS", "2")?;

    let google_provider = or_default("REVSCRAPE_GOOGLE_PROVIDER", "serpapi")
        .parse::<GoogleProvider>()
        .map_err(|reason| invalid("REVSCRAPE_GOOGLE_PROVIDER", reason))?;

    let review_depth = parse_u32("REVSCRAPE_REVIEW_DEPTH", "100")?;
    let poll_interval_secs = parse_u64("REVSCRAPE_POLL_INTERVAL_SECS", "5")?;
    let poll_max_attempts = parse_u32("REVSCRAPE_POLL_MAX_ATTEMPTS", "24")?;
    let poll_budget_secs = parse_u64("REVSCRAPE_POLL_BUDGET_SECS", "120")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        export_dir,
        request_timeout_secs,
        user_agent,
        inter_page_delay_ms,
        max_pages,
        max_retries,
        retry_backoff_base_secs,
        google_provider,
        serpapi_api_key: optional("SERPAPI_API_KEY"),
        dataforseo_login: optional("DATAFORSEO_LOGIN"),
        dataforseo_password: optional("DATAFORSEO_PASSWORD"),
        google_places_api_key: optional("GOOGLE_PLACES_API_KEY"),
        review_depth,
        poll_interval_secs,
        poll_max_attempts,
        poll_budget_secs,
    })
}

/// Trustpilot serves a stripped page to obvious bots, so the default looks
/// like a desktop browser.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "REVSCRAPE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `SERPAPI_API_KEY` is unset.
    pub fn require_serpapi_key(&self) -> Result<&str, ConfigError> {
        require(self.serpapi_api_key.as_deref(), "SERPAPI_API_KEY")
    }

    /// Returns `(login, password)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when either credential is unset.
    pub fn require_dataforseo_credentials(&self) -> Result<(&str, &str), ConfigError> {
        Ok((
            require(self.dataforseo_login.as_deref(), "DATAFORSEO_LOGIN")?,
            require(self.dataforseo_password.as_deref(), "DATAFORSEO_PASSWORD")?,
        ))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `GOOGLE_PLACES_API_KEY` is unset.
    pub fn require_google_places_key(&self) -> Result<&str, ConfigError> {
        require(
            self.google_places_api_key.as_deref(),
            "GOOGLE_PLACES_API_KEY",
        )
    }
}

fn require<'a>(value: Option<&'a str>, var: &str) -> Result<&'a str, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
