use crate::AppState;
use crate::api::error::AppError;
use crate::config::EmptyArchivePolicy;
use crate::models::{Category, Entry, FileTypeFilter};
use crate::services::resolver::RemotePath;
use axum::{
    Form, Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::Local;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const ARCHIVE_ENTRIES_HEADER: &str = "x-archive-entries";
pub const ARCHIVE_FAILED_HEADER: &str = "x-archive-failed";

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRequest {
    /// Public key (or public URL) of the shared folder
    #[serde(rename = "publicKey", alias = "public_key")]
    pub public_key: Option<String>,
    /// `all`, `documents` or `images`
    #[serde(rename = "fileType", alias = "file_type")]
    pub file_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListedEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub category: Category,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub public_key: Option<String>,
    pub file_type: FileTypeFilter,
    pub items: Vec<ListedEntry>,
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    #[serde(rename = "publicKey", alias = "public_key", default)]
    #[validate(length(min = 1, message = "publicKey is required"))]
    pub public_key: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
}

/// Batch download form: `publicKey` plus one `files` field per path.
#[derive(Debug, Default, Validate)]
pub struct BatchRequest {
    #[validate(length(min = 1, message = "publicKey is required"))]
    pub public_key: String,
    #[validate(length(min = 1, message = "No files selected"))]
    pub files: Vec<String>,
}

impl BatchRequest {
    /// `Form` cannot collect repeated keys, so the body is read as raw pairs.
    pub fn from_form(body: &[u8]) -> Result<Self, AppError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| AppError::BadRequest(format!("Malformed form body: {}", e)))?;

        let mut request = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "publicKey" | "public_key" => request.public_key = value.trim().to_string(),
                "files" | "files[]" if !value.trim().is_empty() => request.files.push(value),
                _ => {}
            }
        }
        Ok(request)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `attachment` disposition with an ASCII fallback name and the RFC 5987
/// UTF-8 form.
pub fn attachment_disposition(filename: &str) -> String {
    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback_filename = if ascii_filename.trim().is_empty() {
        "file"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}

async fn list_share(
    state: &AppState,
    public_key: String,
    file_type: Option<&str>,
) -> Result<ListingResponse, AppError> {
    let entries = match state.listing_cache.get(&public_key) {
        Some(entries) => {
            tracing::debug!("Listing cache hit ({} entries)", entries.len());
            entries
        }
        None => {
            let entries = state.disk.list(&public_key).await?;
            state
                .listing_cache
                .put(&public_key, entries.clone(), state.config.listing_ttl());
            entries
        }
    };

    let filter = FileTypeFilter::parse(file_type);
    let items = state
        .classifier
        .filter_by_category(&entries, filter)
        .into_iter()
        .map(|entry| ListedEntry {
            category: state.classifier.classify(&entry.name),
            entry: entry.clone(),
        })
        .collect();

    Ok(ListingResponse {
        public_key: Some(public_key),
        file_type: filter,
        items,
    })
}

#[utoipa::path(
    get,
    path = "/",
    params(ListRequest),
    responses(
        (status = 200, description = "Files of the share matching the filter", body = ListingResponse),
        (status = 400, description = "Listing could not be fetched")
    ),
    tag = "files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    Query(request): Query<ListRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    let Some(public_key) = non_blank(request.public_key) else {
        return Ok(Json(ListingResponse {
            public_key: None,
            file_type: FileTypeFilter::parse(request.file_type.as_deref()),
            items: Vec::new(),
        }));
    };

    list_share(&state, public_key, request.file_type.as_deref())
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/",
    request_body(content = ListRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Files of the share matching the filter", body = ListingResponse),
        (status = 400, description = "Missing key or listing could not be fetched")
    ),
    tag = "files"
)]
pub async fn list_files_form(
    State(state): State<AppState>,
    Form(request): Form<ListRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    let public_key = non_blank(request.public_key)
        .ok_or_else(|| AppError::BadRequest("publicKey is required".to_string()))?;

    list_share(&state, public_key, request.file_type.as_deref())
        .await
        .map(Json)
}

#[utoipa::path(
    get,
    path = "/download/",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Raw file content"),
        (status = 400, description = "Missing publicKey or path"),
        (status = 500, description = "File could not be downloaded")
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    query.validate()?;

    let file = state
        .resolver
        .resolve(&query.public_key, &RemotePath::new(&query.path))
        .await?;

    tracing::info!("📥 Serving {} ({} bytes)", file.path, file.content.len());

    let content_type = state.classifier.content_type_for(&file.name);
    let content_disposition = attachment_disposition(&file.name);

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        file.content,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/download_multiple/",
    request_body(
        content = String,
        description = "`publicKey` and one `files` field per path",
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "Zip archive of every file that could be fetched"),
        (status = 400, description = "No files selected"),
        (status = 502, description = "No file could be fetched and empty archives are rejected")
    ),
    tag = "files"
)]
pub async fn download_multiple(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request = BatchRequest::from_form(&body)?;
    request.validate()?;

    let outcome = state
        .archive
        .build(&request.public_key, &request.files)
        .await?;

    if !outcome.diagnostics.is_empty() {
        tracing::warn!(
            "🧩 {} of {} requested files were left out of the archive",
            outcome.diagnostics.len(),
            request.files.len()
        );
    }

    if outcome.is_empty() && state.config.empty_archive_policy == EmptyArchivePolicy::Reject {
        return Err(AppError::EmptyArchive(
            "None of the selected files could be downloaded".to_string(),
        ));
    }

    let filename = format!("{}.zip", Local::now().format("%Y%m%d_%H%M%S"));
    let entries = outcome.entries.len();
    let failed = outcome.diagnostics.len();

    let mut response = (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        outcome.bytes,
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(ARCHIVE_ENTRIES_HEADER, HeaderValue::from(entries));
    headers.insert(ARCHIVE_FAILED_HEADER, HeaderValue::from(failed));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_form_collects_repeated_files() {
        let body = b"publicKey=https%3A%2F%2Fyadi.sk%2Fd%2Fabc&files=%2Fa.pdf&files=%2Fb+c.png&files=";
        let request = BatchRequest::from_form(body).unwrap();
        assert_eq!(request.public_key, "https://yadi.sk/d/abc");
        assert_eq!(request.files, vec!["/a.pdf", "/b c.png"]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_batch_form_without_files_fails_validation() {
        let request = BatchRequest::from_form(b"public_key=tok").unwrap();
        assert_eq!(request.public_key, "tok");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report%2Epdf"
        );

        let cyrillic = attachment_disposition("отчёт.pdf");
        assert!(cyrillic.starts_with("attachment; filename=\".pdf\";"));
        assert!(cyrillic.contains("filename*=UTF-8''%D0%BE"));

        let only_unicode = attachment_disposition("отчёт");
        assert!(only_unicode.starts_with("attachment; filename=\"file\";"));
    }
}
