//! Remote metadata store
//!
//! The metadata store is the system of record for files, chunks and users.
//! This module defines the seam the upload engine talks through, an HTTP
//! client for the real data service, and an in-process store used for
//! development and tests.

mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::upload::{ChunkRecord, FileRecord, UserFiles};

pub use http::HttpMetadataStore;
pub use memory::InMemoryMetadataStore;

/// A user known to the metadata store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "user_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub alloted_size: u64,
}

/// Metadata store errors
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("not found: {0}")]
    NotFound(String),
}

/// Operations the upload engine needs from the metadata store.
///
/// Every call is attempted exactly once.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Record a committed file
    async fn create_file(&self, record: &FileRecord) -> Result<(), MetadataError>;

    /// Record a staged chunk
    async fn create_chunk(&self, record: &ChunkRecord) -> Result<(), MetadataError>;

    /// A user's files with precomputed usage
    async fn files_by_user(&self, user_id: &str) -> Result<UserFiles, MetadataError>;

    /// All chunk records of a file
    async fn chunks_by_file(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>, MetadataError>;

    /// Look up a user, `None` if unknown
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, MetadataError>;

    /// Register a new user
    async fn create_user(&self, user: &UserRecord) -> Result<(), MetadataError>;

    /// Erase a file record and its chunk records
    async fn delete_file(&self, file_id: Uuid) -> Result<(), MetadataError>;
}
