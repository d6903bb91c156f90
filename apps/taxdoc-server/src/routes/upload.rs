//! Upload Routes
//!
//! Endpoints:
//! - POST /upload - Extract a single document (field `file`)
//! - POST /upload-multi - Extract a batch of documents (field `files`)
//! - GET /download - Spreadsheet of the last batch

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::document::UploadedFile;
use crate::error::{AppError, Result};
use crate::export::{self, TableRow, XLSX_CONTENT_TYPE, XLSX_FILE_NAME};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub table: Vec<TableRow>,
    pub previews: Vec<String>,
    pub refresh: bool,
}

pub fn router(max_request_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_single))
        .route("/upload-multi", post(upload_multi))
        .route("/download", get(download))
        .layer(DefaultBodyLimit::max(max_request_bytes))
}

async fn upload_single(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut files = read_files(multipart, "file").await?;
    // A single-file upload uses only the first file
    files.truncate(1);
    process(&state, files).await
}

async fn upload_multi(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let files = read_files(multipart, "files").await?;
    process(&state, files).await
}

async fn process(state: &AppState, files: Vec<UploadedFile>) -> Result<Json<UploadResponse>> {
    let outcome = state.documents().upload(files).await?;

    Ok(Json(UploadResponse {
        table: export::table_rows(&outcome.documents),
        previews: outcome.previews,
        refresh: true,
    }))
}

/// Collect every file sent under `field_name`
async fn read_files(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    field_name: &str,
) -> Result<Vec<UploadedFile>> {
    let mut multipart = multipart.map_err(|e| {
        AppError::Validation(format!("Expected a multipart upload: {}", e.body_text()))
    })?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::from(e)
    })? {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());

        tracing::debug!(
            field = %name,
            file_name = ?file_name,
            content_type = ?content_type,
            "Received multipart field"
        );

        if name != field_name {
            continue;
        }

        let data = field.bytes().await?;
        files.push(UploadedFile::new(file_name, content_type, data));
    }

    if files.is_empty() {
        tracing::warn!(field = %field_name, "No file field found in multipart upload");
        return Err(AppError::Validation(format!(
            "No files provided. Use field name '{}'",
            field_name
        )));
    }

    Ok(files)
}

async fn download(State(state): State<AppState>) -> Result<Response> {
    let Some(bytes) = state.documents().spreadsheet().await? else {
        return Err(AppError::NotFound(
            "No documents available for download".to_string(),
        ));
    };

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", XLSX_FILE_NAME),
        ),
    ];
    Ok((headers, bytes).into_response())
}
