use axum::{
    extract::{Query, State},
    Extension, Json,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use revscrape_core::{CollectionResult, FilterCriteria, FilterError, Termination};
use revscrape_export::{default_file_name, export_xlsx};
use revscrape_scraper::{
    collect, CollectOptions, GoogleFetcher, HttpConfig, ScraperError, TrustpilotFetcher,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ErrorCode, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct TrustpilotRequest {
    company_url: String,
    #[serde(default)]
    ratings: Vec<i64>,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GoogleRequest {
    query: String,
    location: Option<String>,
    #[serde(default)]
    ratings: Vec<i64>,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Query string of the original single-endpoint API. Ratings and keywords
/// arrive comma-joined.
#[derive(Debug, Deserialize)]
pub(super) struct ProcessQuery {
    company_url: String,
    #[serde(default)]
    keywords: String,
    #[serde(default)]
    include_ratings: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ExportData {
    file_name: String,
    download_url: String,
    record_count: usize,
    pages_fetched: usize,
    skipped: usize,
    termination: Termination,
    terminated_early: bool,
}

type ExportResponse = Result<Json<ApiResponse<ExportData>>, ApiError>;

pub(super) async fn collect_trustpilot(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<TrustpilotRequest>,
) -> ExportResponse {
    let filter = FilterCriteria::new(body.ratings, &body.keywords)
        .map_err(|e| map_filter_error(req_id.0.clone(), &e))?;
    run_trustpilot(&state, req_id, &body.company_url, &filter).await
}

pub(super) async fn legacy_process(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProcessQuery>,
) -> ExportResponse {
    let filter = FilterCriteria::parse(&query.include_ratings, &query.keywords)
        .map_err(|e| map_filter_error(req_id.0.clone(), &e))?;
    run_trustpilot(&state, req_id, &query.company_url, &filter).await
}

pub(super) async fn collect_google(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GoogleRequest>,
) -> ExportResponse {
    if body.query.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::ValidationError,
            "query must not be empty",
        ));
    }
    let filter = FilterCriteria::new(body.ratings, &body.keywords)
        .map_err(|e| map_filter_error(req_id.0.clone(), &e))?;

    let fetcher = GoogleFetcher::from_app_config(
        &state.config,
        state.config.google_provider,
        &body.query,
        body.location.as_deref(),
    )
    .map_err(|e| map_scraper_error(req_id.0.clone(), &e))?;

    tracing::info!(
        provider = %fetcher.provider(),
        query = %body.query,
        "starting google review collection"
    );
    let result = fetcher
        .collect(&filter, CollectOptions::from_app_config(&state.config))
        .await;
    export_response(&state, req_id, result).await
}

async fn run_trustpilot(
    state: &AppState,
    req_id: RequestId,
    company_url: &str,
    filter: &FilterCriteria,
) -> ExportResponse {
    let http = HttpConfig::from_app_config(&state.config);
    let mut fetcher = TrustpilotFetcher::new(company_url, &http)
        .map_err(|e| map_scraper_error(req_id.0.clone(), &e))?;

    tracing::info!(company_url, "starting trustpilot review collection");
    let result = collect(
        &mut fetcher,
        filter,
        CollectOptions::from_app_config(&state.config),
    )
    .await;
    drop(fetcher);
    export_response(state, req_id, result).await
}

/// Writes the spreadsheet and builds the success body, or reports that
/// nothing matched.
pub(super) async fn export_response(
    state: &AppState,
    req_id: RequestId,
    result: CollectionResult,
) -> ExportResponse {
    if result.is_empty() {
        tracing::info!(termination = ?result.termination(), "no matching reviews");
        let message = match result.termination() {
            Termination::FetchFailed { reason, .. } => {
                format!("no matching reviews found (upstream fetch failed: {reason})")
            }
            Termination::StillPending { .. } => {
                "no matching reviews found (upstream task still pending)".to_owned()
            }
            _ => "no matching reviews found".to_owned(),
        };
        return Err(ApiError::new(req_id.0, ErrorCode::NoResults, message));
    }

    let base_name = default_file_name(result.platform());
    let dir = state.config.export_dir.clone();
    let summary = ExportSummary::from(&result);

    let path = tokio::task::spawn_blocking(move || export_xlsx(&result, &dir, base_name))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "export task panicked");
            ApiError::new(req_id.0.clone(), ErrorCode::ExportFailed, "export task failed")
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "spreadsheet export failed");
            ApiError::new(req_id.0.clone(), ErrorCode::ExportFailed, e.to_string())
        })?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(base_name)
        .to_owned();
    let download_url = format!(
        "/api/v1/exports/{}",
        utf8_percent_encode(&file_name, NON_ALPHANUMERIC)
    );

    Ok(Json(ApiResponse {
        data: ExportData {
            file_name,
            download_url,
            record_count: summary.record_count,
            pages_fetched: summary.pages_fetched,
            skipped: summary.skipped,
            termination: summary.termination,
            terminated_early: summary.terminated_early,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Counters copied out before the result moves to the blocking pool.
struct ExportSummary {
    record_count: usize,
    pages_fetched: usize,
    skipped: usize,
    termination: Termination,
    terminated_early: bool,
}

impl From<&CollectionResult> for ExportSummary {
    fn from(result: &CollectionResult) -> Self {
        Self {
            record_count: result.len(),
            pages_fetched: result.pages_fetched(),
            skipped: result.skipped(),
            termination: result.termination().clone(),
            terminated_early: result.terminated_early(),
        }
    }
}

fn map_filter_error(request_id: String, error: &FilterError) -> ApiError {
    ApiError::new(request_id, ErrorCode::ValidationError, error.to_string())
}

fn map_scraper_error(request_id: String, error: &ScraperError) -> ApiError {
    match error {
        ScraperError::InvalidSource { .. } => {
            ApiError::new(request_id, ErrorCode::ValidationError, error.to_string())
        }
        ScraperError::Config(_) => {
            tracing::warn!(error = %error, "review provider not configured");
            ApiError::new(request_id, ErrorCode::NotConfigured, error.to_string())
        }
        _ => {
            tracing::error!(error = %error, "failed to prepare review fetcher");
            ApiError::new(request_id, ErrorCode::UpstreamError, error.to_string())
        }
    }
}
