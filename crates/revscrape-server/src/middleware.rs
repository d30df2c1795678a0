use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, ErrorCode};

const API_KEYS_VAR: &str = "REVSCRAPE_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID, stored as a request extension and echoed on the response.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Which caller a request belongs to, for per-client rate limiting.
///
/// Keys are identified by their slot in the configured list so the limiter
/// never holds the token itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientId {
    Anonymous,
    Key(u32),
}

/// Bearer-token auth settings.
#[derive(Clone)]
pub struct AuthState {
    api_keys: Arc<[String]>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("key_count", &self.api_keys.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl AuthState {
    /// Reads comma-separated bearer tokens from `REVSCRAPE_API_KEYS`.
    ///
    /// With no keys, auth is disabled in development and startup fails
    /// everywhere else.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        Self::from_keys(
            &std::env::var(API_KEYS_VAR).unwrap_or_default(),
            is_development,
        )
    }

    /// Same as [`Self::from_env`] with the raw variable value supplied.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        keys.sort();
        keys.dedup();

        match (keys.is_empty(), is_development) {
            (false, _) => Ok(Self {
                api_keys: keys.into(),
                enabled: true,
            }),
            (true, true) => {
                tracing::warn!("{API_KEYS_VAR} not set; bearer auth disabled for development");
                Ok(Self::disabled())
            }
            (true, false) => anyhow::bail!(
                "{API_KEYS_VAR} is required outside development (comma-separated bearer tokens)"
            ),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            api_keys: Arc::from(Vec::new()),
            enabled: false,
        }
    }

    /// Slot of the key equal to `token`. Every key is compared, so timing
    /// does not depend on which one matched.
    fn client_slot(&self, token: &str) -> Option<u32> {
        let mut found = Choice::from(0);
        let mut slot = 0u32;
        for (index, key) in self.api_keys.iter().enumerate() {
            let hit = key.as_bytes().ct_eq(token.as_bytes());
            slot.conditional_assign(&u32::try_from(index).unwrap_or(u32::MAX), hit);
            found |= hit;
        }
        bool::from(found).then_some(slot)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request budget, tracked separately for each [`ClientId`].
///
/// Collection runs hold upstream connections for many seconds, so one caller
/// hammering the server must not starve the others.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<ClientId, Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `client`. On rejection returns how long until
    /// its window resets.
    async fn admit(&self, client: ClientId) -> Result<(), Duration> {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let window = clients.entry(client).or_insert(Window {
            started_at: now,
            count: 0,
        });

        let elapsed = now.duration_since(window.started_at);
        if elapsed >= self.window {
            *window = Window {
                started_at: now,
                count: 0,
            };
        } else if window.count >= self.max_requests {
            return Err(self.window - elapsed);
        }
        window.count += 1;
        Ok(())
    }
}

fn rejection(req: &Request, code: ErrorCode, message: &'static str) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    ApiError::new(request_id, code, message).into_response()
}

/// Accepts a caller-supplied `x-request-id` when it is short and printable,
/// otherwise mints a `UUIDv4`. The ID is stored as a [`RequestId`] extension
/// and set on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| is_acceptable_request_id(v))
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

fn is_acceptable_request_id(value: &str) -> bool {
    (1..=MAX_REQUEST_ID_LEN).contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Rejects requests without a configured bearer token and tags the rest with
/// their [`ClientId`].
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let client = if auth.enabled {
        match extract_bearer_token(req.headers().get(AUTHORIZATION))
            .and_then(|token| auth.client_slot(token))
        {
            Some(slot) => ClientId::Key(slot),
            None => {
                return rejection(
                    &req,
                    ErrorCode::Unauthorized,
                    "missing or invalid bearer token",
                )
            }
        }
    } else {
        ClientId::Anonymous
    };

    req.extensions_mut().insert(client);
    next.run(req).await
}

/// Applies the per-client window. Must run inside [`require_bearer_auth`].
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = req
        .extensions()
        .get::<ClientId>()
        .copied()
        .unwrap_or(ClientId::Anonymous);

    match rate_limit.admit(client).await {
        Ok(()) => next.run(req).await,
        Err(retry_in) => {
            tracing::warn!(?client, "rate limit exceeded");
            let mut res = rejection(&req, ErrorCode::RateLimited, "rate limit exceeded");
            let secs = retry_in.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                res.headers_mut().insert(RETRY_AFTER, value);
            }
            res
        }
    }
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
