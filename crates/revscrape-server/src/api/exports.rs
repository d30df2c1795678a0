use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension,
};

use crate::middleware::RequestId;

use super::{ApiError, AppState, ErrorCode};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Serves a previously exported spreadsheet from the export directory.
pub(super) async fn download_export(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    if !is_bare_file_name(&file_name) {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::ValidationError,
            "file name must not contain path components",
        ));
    }

    let path = state.config.export_dir.join(&file_name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::new(req_id.0, ErrorCode::NotFound, "export not found"));
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read export");
            return Err(ApiError::new(
                req_id.0,
                ErrorCode::InternalError,
                "failed to read export",
            ));
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// A single path segment that cannot escape the export directory or break
/// the `Content-Disposition` header.
fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '"' | '\0') || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_suffixed_names() {
        assert!(is_bare_file_name("trustpilot_reviews.xlsx"));
        assert!(is_bare_file_name("trustpilot_reviews (2).xlsx"));
    }

    #[test]
    fn rejects_traversal_and_separators() {
        assert!(!is_bare_file_name(""));
        assert!(!is_bare_file_name(".."));
        assert!(!is_bare_file_name("../secret.xlsx"));
        assert!(!is_bare_file_name("a/b.xlsx"));
        assert!(!is_bare_file_name("a\\b.xlsx"));
        assert!(!is_bare_file_name(".env"));
        assert!(!is_bare_file_name("quote\".xlsx"));
    }
}
