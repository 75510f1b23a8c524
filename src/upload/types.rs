//! Upload types: file and chunk records, artifact names, errors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::MetadataError;

// ============================================================================
// File Records
// ============================================================================

/// Client-visible file metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Original file name
    pub name: String,

    /// Size in bytes, as declared by the uploading client
    #[serde(rename = "file_size")]
    pub size: u64,
}

/// File metadata submitted by a client.
///
/// Identity and creation time are never accepted from the client; any such
/// fields in the request body are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    pub meta_data: FileMeta,
    pub total_chunks: u32,
}

/// One committed logical file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "file_id")]
    pub id: Uuid,

    /// Owner
    pub user_id: String,

    #[serde(rename = "meta_data")]
    pub meta: FileMeta,

    pub total_chunks: u32,

    /// UTC unix timestamp (seconds)
    pub created_at: i64,
}

impl FileRecord {
    /// Declared size in bytes
    pub fn declared_size(&self) -> u64 {
        self.meta.size
    }
}

/// A user's files as reported by the metadata store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFiles {
    pub files: Vec<FileRecord>,

    /// Usage total precomputed by the metadata store
    pub used_size: u64,

    /// Allotment, when the store knows the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alloted_size: Option<u64>,
}

// ============================================================================
// Chunk Records
// ============================================================================

/// One staged slice of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    #[serde(rename = "chunk_id")]
    pub id: Uuid,

    pub file_id: Uuid,

    /// Hex-encoded SHA-256 of the chunk bytes
    #[serde(rename = "check_sum")]
    pub checksum: String,

    /// Position within the file, as supplied by the client
    pub order: u32,
}

impl ChunkRecord {
    /// Name of the staged artifact holding this chunk's bytes
    pub fn artifact_name(&self) -> ArtifactName {
        ArtifactName::new(self.file_id, self.id)
    }
}

// ============================================================================
// Artifact Names
// ============================================================================

/// Name of a staged chunk artifact: `{file_id}_{chunk_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactName {
    pub file_id: Uuid,
    pub chunk_id: Uuid,
}

impl ArtifactName {
    pub fn new(file_id: Uuid, chunk_id: Uuid) -> Self {
        Self { file_id, chunk_id }
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.file_id, self.chunk_id)
    }
}

impl FromStr for ArtifactName {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UploadError::InvalidReference(s.to_string());

        let (file_id, chunk_id) = s.split_once('_').ok_or_else(invalid)?;
        Ok(Self {
            file_id: parse_id(file_id).map_err(|_| invalid())?,
            chunk_id: parse_id(chunk_id).map_err(|_| invalid())?,
        })
    }
}

/// Parse a client-supplied identifier
pub fn parse_id(raw: &str) -> Result<Uuid, UploadError> {
    Uuid::parse_str(raw.trim()).map_err(|_| UploadError::InvalidReference(raw.to_string()))
}

// ============================================================================
// Error Types
// ============================================================================

/// Chunk Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Failed to read upload body: {0}")]
    Source(String),
}

impl StoreError {
    pub(crate) fn from_io(err: std::io::Error, name: &ArtifactName) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(name.to_string())
        } else {
            Self::Io(err)
        }
    }
}

/// Upload error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Quota exceeded for {user_id}: {used} + {requested} bytes exceeds allotment of {allotment}")]
    QuotaExceeded {
        user_id: String,
        used: u64,
        requested: u64,
        allotment: u64,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Metadata store error: {0}")]
    Upstream(#[from] MetadataError),
}

impl UploadError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidReference(_) => StatusCode::BAD_REQUEST,
            Self::QuotaExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Storage(StoreError::Source(_)) => StatusCode::BAD_REQUEST,
            Self::Storage(StoreError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(MetadataError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidReference(_) => "INVALID_REFERENCE",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::Storage(StoreError::NotFound(_)) => "NOT_FOUND",
            Self::Storage(StoreError::Source(_)) => "BAD_UPLOAD_BODY",
            Self::Storage(StoreError::Io(_)) => "STORAGE_ERROR",
            Self::Upstream(MetadataError::NotFound(_)) => "NOT_FOUND",
            Self::Upstream(_) => "UPSTREAM_ERROR",
        }
    }
}
