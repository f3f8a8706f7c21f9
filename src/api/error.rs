use crate::services::archive::ArchiveError;
use crate::services::disk::DiskError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Listing unavailable: {0}")]
    ListingUnavailable(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Empty archive: {0}")]
    EmptyArchive(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<DiskError> for AppError {
    fn from(e: DiskError) -> Self {
        match e {
            DiskError::ListingUnavailable(reason) => AppError::ListingUnavailable(reason),
            err @ DiskError::Download { .. } => AppError::DownloadFailed(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_values()
            .flat_map(|errs| errs.iter())
            .filter_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .collect::<Vec<_>>()
            .join("; ");
        AppError::Validation(if message.is_empty() {
            errors.to_string()
        } else {
            message
        })
    }
}

impl From<ArchiveError> for AppError {
    fn from(e: ArchiveError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ListingUnavailable(reason) => {
                tracing::warn!("Listing unavailable: {}", reason);
                (
                    StatusCode::BAD_REQUEST,
                    "Failed to fetch file list".to_string(),
                )
            }
            AppError::DownloadFailed(reason) => {
                tracing::error!("Download failed: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to download file".to_string(),
                )
            }
            AppError::EmptyArchive(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_errors_map_to_statuses() {
        let listing: AppError = DiskError::ListingUnavailable("503".to_string()).into();
        assert_eq!(listing.into_response().status(), StatusCode::BAD_REQUEST);

        let download: AppError = DiskError::download("/a.pdf", "gone").into();
        assert_eq!(
            download.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_empty_archive_is_bad_gateway() {
        let err = AppError::EmptyArchive("nothing fetched".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
