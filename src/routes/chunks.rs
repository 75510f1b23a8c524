//! Chunk routes
//!
//! Endpoints:
//! - POST /upload_chunks - Stage one chunk (multipart: file_id, chunk_number, chunk)
//! - GET /chunks/:file_id - List a file's chunk records
//! - GET /download/:chunk_name - Stream a staged chunk back

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tokio_util::io::ReaderStream;

use crate::auth::Authenticated;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::{parse_id, ArtifactName, ArtifactReader, ChunkRecord, UploadError};

/// Room for multipart framing and the text fields around a chunk
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the chunks router
pub fn router(max_chunk_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload_chunks",
            post(upload_chunks)
                .layer(DefaultBodyLimit::max(max_chunk_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/chunks/:file_id", get(chunks_by_file))
        .route("/download/:chunk_name", get(download_chunk))
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.to_string())
}

/// POST /upload_chunks
///
/// The `chunk` part is streamed straight to staging, so `file_id` and
/// `chunk_number` must come before it.
async fn upload_chunks(
    State(state): State<AppState>,
    _caller: Authenticated,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ChunkRecord>)> {
    let mut file_id: Option<String> = None;
    let mut order: Option<u32> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some("file_id") => {
                file_id = Some(field.text().await.map_err(bad_multipart)?);
            }
            Some("chunk_number") => {
                let raw = field.text().await.map_err(bad_multipart)?;
                let parsed = raw.trim().parse::<u32>().map_err(|_| {
                    AppError::BadRequest(format!(
                        "chunk_number must be a non-negative integer, got {:?}",
                        raw
                    ))
                })?;
                order = Some(parsed);
            }
            Some("chunk") => {
                let file_ref = file_id.as_deref().ok_or_else(|| {
                    AppError::BadRequest("file_id must be sent before chunk".to_string())
                })?;
                let order = order.ok_or_else(|| {
                    AppError::BadRequest("chunk_number must be sent before chunk".to_string())
                })?;

                let record = state
                    .orchestrator()
                    .stage_chunk(file_ref, order, field)
                    .await?;
                return Ok((StatusCode::CREATED, Json(record)));
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    Err(AppError::BadRequest("missing chunk field".to_string()))
}

/// GET /chunks/:file_id
async fn chunks_by_file(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(file_id): Path<String>,
) -> Result<Json<Vec<ChunkRecord>>> {
    let file_id = parse_id(&file_id)?;
    tracing::debug!(file_id = %file_id, "Querying chunks");

    let chunks = state
        .metadata()
        .chunks_by_file(file_id)
        .await
        .map_err(UploadError::from)?;

    if chunks.is_empty() {
        return Err(AppError::NotFound(format!("no chunks for file {}", file_id)));
    }

    Ok(Json(chunks))
}

/// GET /download/:chunk_name
async fn download_chunk(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(chunk_name): Path<String>,
) -> Result<Response> {
    let name: ArtifactName = chunk_name.parse()?;

    let ArtifactReader { file, size } = state
        .chunk_store()
        .open_for_read(&name)
        .await
        .map_err(UploadError::from)?;

    tracing::debug!(artifact = %name, size = size, "Serving chunk");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", name),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(e.to_string()))
}
