use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::error::{BatchErrorReport, ErrorReport};
use crate::middleware::upload_form::{BatchUploadForm, UploadForm};
use crate::router::AppState;
use crate::types::drive::{BatchUploadResponse, FileListResponse, UploadResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub folder_id: Option<String>,
}

/// GET /drive?folderId=...
pub async fn list_files_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FileListResponse>, ErrorReport> {
    let files = state
        .gateway
        .list_files(query.folder_id.as_deref())
        .await
        .map_err(|e| e.report(state.environment))?;
    Ok(Json(FileListResponse { files }))
}

/// POST /drive
pub async fn upload_file_handler(
    State(state): State<AppState>,
    UploadForm(upload): UploadForm,
) -> Result<Json<UploadResponse>, ErrorReport> {
    let file = state
        .gateway
        .upload_file(upload)
        .await
        .map_err(|e| e.report(state.environment))?;
    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file,
    }))
}

/// POST /drive/batch
pub async fn upload_batch_handler(
    State(state): State<AppState>,
    BatchUploadForm(batch): BatchUploadForm,
) -> Result<Json<BatchUploadResponse>, BatchErrorReport> {
    let files = state
        .gateway
        .upload_batch(batch.into_requests())
        .await
        .map_err(|error| BatchErrorReport {
            error,
            environment: state.environment,
        })?;
    Ok(Json(BatchUploadResponse {
        message: format!("{} files uploaded successfully", files.len()),
        files,
    }))
}
