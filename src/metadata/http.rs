//! HTTP client for the data service

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{MetadataError, MetadataStore, UserRecord};
use crate::upload::{ChunkRecord, FileRecord, UserFiles};

/// Metadata store backed by the remote data service
#[derive(Clone)]
pub struct HttpMetadataStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataStore {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Fail unless the response carries one of the `expected` statuses
fn expect_status(
    response: &Response,
    endpoint: &str,
    expected: &[StatusCode],
) -> Result<(), MetadataError> {
    let status = response.status();
    if expected.contains(&status) {
        return Ok(());
    }

    tracing::error!(endpoint = %endpoint, status = status.as_u16(), "Unexpected data service status");
    Err(MetadataError::UnexpectedStatus {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
    })
}

/// Decode a JSON body, reporting schema mismatches instead of defaulting
async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T, MetadataError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| {
        tracing::error!(endpoint = %endpoint, error = %source, "Malformed data service response");
        MetadataError::Decode {
            endpoint: endpoint.to_string(),
            source,
        }
    })
}

#[async_trait]
impl MetadataStore for HttpMetadataStore {
    async fn create_file(&self, record: &FileRecord) -> Result<(), MetadataError> {
        let endpoint = self.endpoint("/upload_file");
        tracing::debug!(endpoint = %endpoint, file_id = %record.id, "Registering file");

        let response = self.client.post(&endpoint).json(record).send().await?;
        expect_status(&response, &endpoint, &[StatusCode::CREATED])
    }

    async fn create_chunk(&self, record: &ChunkRecord) -> Result<(), MetadataError> {
        let endpoint = self.endpoint("/upload_chunks");
        tracing::debug!(endpoint = %endpoint, chunk_id = %record.id, "Registering chunk");

        let response = self.client.post(&endpoint).json(record).send().await?;
        expect_status(&response, &endpoint, &[StatusCode::CREATED])
    }

    async fn files_by_user(&self, user_id: &str) -> Result<UserFiles, MetadataError> {
        let endpoint = self.endpoint(&format!("/files/{}", urlencoding::encode(user_id)));

        let response = self.client.get(&endpoint).send().await?;
        expect_status(&response, &endpoint, &[StatusCode::OK])?;
        decode(response, &endpoint).await
    }

    async fn chunks_by_file(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>, MetadataError> {
        let endpoint = self.endpoint(&format!("/chunks/{}", file_id));

        let response = self.client.get(&endpoint).send().await?;
        expect_status(&response, &endpoint, &[StatusCode::OK])?;
        decode(response, &endpoint).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, MetadataError> {
        let endpoint = self.endpoint(&format!("/user/{}", urlencoding::encode(user_id)));

        let response = self.client.get(&endpoint).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        expect_status(&response, &endpoint, &[StatusCode::OK])?;
        decode(response, &endpoint).await.map(Some)
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), MetadataError> {
        let endpoint = self.endpoint("/user");

        let response = self.client.post(&endpoint).json(user).send().await?;
        expect_status(&response, &endpoint, &[StatusCode::CREATED])
    }

    async fn delete_file(&self, file_id: Uuid) -> Result<(), MetadataError> {
        let endpoint = self.endpoint(&format!("/file/{}", file_id));

        let response = self.client.delete(&endpoint).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound(format!("file {}", file_id)));
        }
        expect_status(&response, &endpoint, &[StatusCode::OK, StatusCode::NO_CONTENT])
    }
}
