//! Route modules for the upload orchestrator

pub mod chunks;
pub mod files;
pub mod users;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// `Json` whose rejection is reported in the API's error envelope
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_chunk_bytes = state.config().storage.max_chunk_bytes;

    Router::new()
        .route("/health", get(health_check))
        .merge(users::router())
        .merge(files::router())
        .merge(chunks::router(max_chunk_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderValue, Request, StatusCode};
    use axum_test::TestServer;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::auth::StaticIdentityProvider;
    use crate::config::Config;
    use crate::metadata::InMemoryMetadataStore;
    use crate::upload::{compute_hash, ChunkRecord, ChunkStore, FileRecord, UserFiles};

    const BOUNDARY: &str = "chunk-boundary-7MA4YWxkTrZu0gW";

    struct Harness {
        dir: TempDir,
        app: Router,
    }

    async fn harness(allotment: u64) -> Harness {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.staging_dir = dir.path().to_path_buf();
        config.quota.default_allotment = allotment;

        let state = AppState::new(
            config,
            ChunkStore::new(dir.path().to_path_buf()),
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(StaticIdentityProvider),
        );

        Harness {
            dir,
            app: app(state),
        }
    }

    fn bearer(user: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", user)).unwrap()
    }

    fn multipart(fields: &[(&str, &[u8])]) -> Body {
        let mut body = Vec::new();
        for (name, value) in fields {
            let disposition = if *name == "chunk" {
                format!("form-data; name=\"{}\"; filename=\"blob\"", name)
            } else {
                format!("form-data; name=\"{}\"", name)
            };
            body.extend_from_slice(
                format!("--{}\r\nContent-Disposition: {}\r\n\r\n", BOUNDARY, disposition).as_bytes(),
            );
            body.extend_from_slice(value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Body::from(body)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn commit(app: &Router, user: &str, size: u64) -> (StatusCode, Vec<u8>) {
        let request = Request::post(format!("/upload_file/{}", user))
            .header(header::AUTHORIZATION, bearer(user))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"meta_data": {"name": "book.epub", "file_size": size}, "total_chunks": 2})
                    .to_string(),
            ))
            .unwrap();
        send(app, request).await
    }

    async fn upload_chunk(app: &Router, fields: &[(&str, &[u8])]) -> (StatusCode, Vec<u8>) {
        let request = Request::post("/upload_chunks")
            .header(header::AUTHORIZATION, bearer("u1"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(multipart(fields))
            .unwrap();
        send(app, request).await
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(1000).await;
        let server = TestServer::new(h.app.clone()).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_requests_without_token_are_rejected() {
        let h = harness(1000).await;
        let server = TestServer::new(h.app.clone()).unwrap();

        let response = server
            .post("/upload_file/u1")
            .json(&json!({"meta_data": {"name": "a", "file_size": 1}, "total_chunks": 1}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server.delete(&format!("/file/{}", uuid::Uuid::new_v4())).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unauthenticated_chunk_is_not_staged() {
        let h = harness(1000).await;
        let file_id = uuid::Uuid::new_v4().to_string();

        let request = Request::post("/upload_chunks")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(multipart(&[
                ("file_id", file_id.as_bytes()),
                ("chunk_number", b"0"),
                ("chunk", b"hello"),
            ]))
            .unwrap();
        let (status, body) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "UNAUTHORIZED");
        assert_eq!(std::fs::read_dir(h.dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_file_metadata_uses_error_envelope() {
        let h = harness(1000).await;

        for body in [
            r#"{"meta_data": {"name": "a", "file_size": -5}, "total_chunks": 1}"#,
            r#"{"meta_data": "#,
        ] {
            let request = Request::post("/upload_file/u1")
                .header(header::AUTHORIZATION, bearer("u1"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap();
            let (status, response) = send(&h.app, request).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
            let error: serde_json::Value = serde_json::from_slice(&response).unwrap();
            assert_eq!(error["error"], "BAD_REQUEST");
        }
    }

    #[tokio::test]
    async fn test_cannot_upload_for_another_user() {
        let h = harness(1000).await;
        let server = TestServer::new(h.app.clone()).unwrap();

        let response = server
            .post("/upload_file/u2")
            .add_header(header::AUTHORIZATION, bearer("u1"))
            .json(&json!({"meta_data": {"name": "a", "file_size": 1}, "total_chunks": 1}))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_quota_rejection_over_http() {
        let h = harness(1000).await;

        let (status, body) = commit(&h.app, "u1", 400).await;
        assert_eq!(status, StatusCode::CREATED);
        let record: FileRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(record.user_id, "u1");

        let (status, body) = commit(&h.app, "u1", 700).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "QUOTA_EXCEEDED");
        assert_eq!(
            error["message"],
            "Quota exceeded for u1: 400 + 700 bytes exceeds allotment of 1000"
        );

        let server = TestServer::new(h.app.clone()).unwrap();
        let files: UserFiles = server
            .get("/files/u1")
            .add_header(header::AUTHORIZATION, bearer("u1"))
            .await
            .json();
        assert_eq!(files.files.len(), 1);
        assert_eq!(files.used_size, 400);
    }

    #[tokio::test]
    async fn test_chunk_upload_download_and_delete() {
        let h = harness(1000).await;
        let (_, body) = commit(&h.app, "u1", 10).await;
        let file: FileRecord = serde_json::from_slice(&body).unwrap();
        let file_id = file.id.to_string();

        let (status, body) = upload_chunk(
            &h.app,
            &[
                ("file_id", file_id.as_bytes()),
                ("chunk_number", b"0"),
                ("chunk", b"hello"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let chunk: ChunkRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(chunk.file_id, file.id);
        assert_eq!(chunk.checksum, compute_hash(b"hello"));

        let server = TestServer::new(h.app.clone()).unwrap();
        let listed: Vec<ChunkRecord> = server
            .get(&format!("/chunks/{}", file_id))
            .add_header(header::AUTHORIZATION, bearer("u1"))
            .await
            .json();
        assert_eq!(listed, vec![chunk.clone()]);

        let download = format!("/download/{}", chunk.artifact_name());
        let request = Request::get(&download)
            .header(header::AUTHORIZATION, bearer("u1"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"hello");

        server
            .delete(&format!("/file/{}", file_id))
            .add_header(header::AUTHORIZATION, bearer("u1"))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let request = Request::get(&download)
            .header(header::AUTHORIZATION, bearer("u1"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chunk_upload_validation() {
        let h = harness(1000).await;

        let (status, body) = upload_chunk(
            &h.app,
            &[
                ("file_id", b"not-a-uuid"),
                ("chunk_number", b"0"),
                ("chunk", b"x"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "INVALID_REFERENCE");

        let file_id = uuid::Uuid::new_v4().to_string();
        let (status, _) = upload_chunk(
            &h.app,
            &[
                ("file_id", file_id.as_bytes()),
                ("chunk_number", b"-1"),
                ("chunk", b"x"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = upload_chunk(&h.app, &[("chunk", b"x")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_rejects_traversal() {
        let h = harness(1000).await;

        let request = Request::get("/download/..%2F..%2Fetc%2Fpasswd")
            .header(header::AUTHORIZATION, bearer("u1"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_user() {
        let h = harness(5000).await;
        let server = TestServer::new(h.app.clone()).unwrap();

        let profile: serde_json::Value = server
            .post("/user")
            .add_header(header::AUTHORIZATION, bearer("u9"))
            .await
            .json();
        assert_eq!(profile["sub"], "u9");
        assert_eq!(profile["alloted_size"], 5000);

        let (status, _) = commit(&h.app, "u9", 5001).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
