//! Upload Orchestrator
//!
//! Commits file metadata after a quota check and stages chunk bytes,
//! forwarding every committed record to the metadata store.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use uuid::Uuid;

use super::chunk_store::ChunkStore;
use super::quota::QuotaState;
use super::types::{parse_id, ChunkRecord, FileRecord, NewFile, UploadError};
use crate::metadata::MetadataStore;

/// Coordinates file commits and chunk staging
#[derive(Clone)]
pub struct UploadOrchestrator {
    chunk_store: ChunkStore,
    metadata: Arc<dyn MetadataStore>,
    default_allotment: u64,
}

impl UploadOrchestrator {
    pub fn new(
        chunk_store: ChunkStore,
        metadata: Arc<dyn MetadataStore>,
        default_allotment: u64,
    ) -> Self {
        Self {
            chunk_store,
            metadata,
            default_allotment,
        }
    }

    /// Commit a client's file metadata for `user_id`.
    ///
    /// Identity and creation time are assigned here. Nothing is written when
    /// the quota check fails.
    pub async fn commit_file(
        &self,
        user_id: &str,
        request: NewFile,
    ) -> Result<FileRecord, UploadError> {
        let record = FileRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            meta: request.meta_data,
            total_chunks: request.total_chunks,
            created_at: Utc::now().timestamp(),
        };

        let snapshot = self.metadata.files_by_user(user_id).await?;
        let quota = QuotaState::from_snapshot(&snapshot, self.default_allotment);

        if snapshot.used_size != quota.used {
            tracing::debug!(
                user_id = %user_id,
                reported = snapshot.used_size,
                computed = quota.used,
                "Reported usage differs from recorded files"
            );
        }

        if quota.would_exceed(record.declared_size()) {
            tracing::warn!(
                user_id = %user_id,
                used = quota.used,
                requested = record.declared_size(),
                allotment = quota.allotment,
                "Quota exceeded"
            );
            return Err(UploadError::QuotaExceeded {
                user_id: user_id.to_string(),
                used: quota.used,
                requested: record.declared_size(),
                allotment: quota.allotment,
            });
        }

        self.metadata.create_file(&record).await?;

        tracing::info!(
            file_id = %record.id,
            user_id = %user_id,
            file_name = %record.meta.name,
            size = record.declared_size(),
            total_chunks = record.total_chunks,
            remaining = quota.remaining().saturating_sub(record.declared_size()),
            "File committed"
        );

        Ok(record)
    }

    /// Stage one chunk of `file_ref` and record it.
    ///
    /// If the metadata store rejects the record the staged bytes stay on
    /// disk; there is no rollback.
    pub async fn stage_chunk<S, E>(
        &self,
        file_ref: &str,
        order: u32,
        body: S,
    ) -> Result<ChunkRecord, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display,
    {
        let file_id = parse_id(file_ref)?;
        let chunk_id = Uuid::new_v4();

        let staged = self
            .chunk_store
            .stage(file_id, chunk_id, body)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    file_id = %file_id,
                    chunk_id = %chunk_id,
                    error = %e,
                    "Failed to stage chunk"
                );
            })?;

        let record = ChunkRecord {
            id: chunk_id,
            file_id,
            checksum: staged.checksum,
            order,
        };

        if let Err(e) = self.metadata.create_chunk(&record).await {
            tracing::error!(
                artifact = %staged.name,
                error = %e,
                "Chunk staged but not recorded, artifact left in staging"
            );
            return Err(e.into());
        }

        tracing::info!(
            chunk_id = %record.id,
            file_id = %record.file_id,
            order = record.order,
            size = staged.size,
            "Chunk created"
        );

        Ok(record)
    }

    /// Chunk store used for staging
    pub fn chunk_store(&self) -> &ChunkStore {
        &self.chunk_store
    }
}
