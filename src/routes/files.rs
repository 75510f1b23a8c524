//! File routes
//!
//! Endpoints:
//! - POST /upload_file/:user_id - Commit file metadata (quota checked)
//! - GET /files/:user_id - List a user's files
//! - DELETE /file/:file_id - Delete a file and its staged chunks

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use super::JsonBody;
use crate::auth::Authenticated;
use crate::error::Result;
use crate::state::AppState;
use crate::upload::{parse_id, FileRecord, NewFile, UploadError, UserFiles};

/// Create the files router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload_file/:user_id", post(upload_file))
        .route("/files/:user_id", get(files_by_user))
        .route("/file/:file_id", delete(delete_file))
}

/// POST /upload_file/:user_id
async fn upload_file(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<NewFile>,
) -> Result<(StatusCode, Json<FileRecord>)> {
    caller.ensure_user(&user_id)?;

    let record = state.orchestrator().commit_file(&user_id, request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /files/:user_id
async fn files_by_user(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(user_id): Path<String>,
) -> Result<Json<UserFiles>> {
    caller.ensure_user(&user_id)?;

    let files = state
        .metadata()
        .files_by_user(&user_id)
        .await
        .map_err(UploadError::from)?;
    Ok(Json(files))
}

/// DELETE /file/:file_id
///
/// Succeeds once the file's metadata is erased, even if some staged chunks
/// could not be removed.
async fn delete_file(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(file_id): Path<String>,
) -> Result<StatusCode> {
    let file_id = parse_id(&file_id)?;

    let report = state.deletion().delete_file(file_id).await?;
    if !report.is_clean() {
        tracing::warn!(
            file_id = %file_id,
            failures = ?report.failures,
            "File deleted with staged chunks left behind"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}
