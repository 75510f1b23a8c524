//! Deletion Coordinator
//!
//! Removes every staged artifact of a file, then erases the file's metadata.
//! Artifact removal is best-effort: failures are collected, never fatal.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::chunk_store::ChunkStore;
use super::types::{ArtifactName, StoreError, UploadError};
use crate::metadata::MetadataStore;

/// An artifact that could not be removed
#[derive(Debug, Clone, Serialize)]
pub struct RemovalFailure {
    pub artifact: String,
    pub reason: String,
}

/// Outcome of the artifact cleanup for one file
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeletionReport {
    /// Artifacts removed by this call
    pub removed: usize,

    /// Artifacts that were already gone
    pub already_missing: usize,

    /// Artifacts that failed to be removed
    pub failures: Vec<RemovalFailure>,
}

impl DeletionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deletes files and their staged chunks
#[derive(Clone)]
pub struct DeletionCoordinator {
    chunk_store: ChunkStore,
    metadata: Arc<dyn MetadataStore>,
}

impl DeletionCoordinator {
    pub fn new(chunk_store: ChunkStore, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            chunk_store,
            metadata,
        }
    }

    /// Delete `file_id`: its staged chunks first, then its metadata.
    ///
    /// Succeeds iff the metadata store erases the file record. Artifact
    /// removal failures are reported in the returned [`DeletionReport`].
    pub async fn delete_file(&self, file_id: Uuid) -> Result<DeletionReport, UploadError> {
        let chunks = self.metadata.chunks_by_file(file_id).await?;

        let mut report = DeletionReport::default();
        for chunk in &chunks {
            let name = ArtifactName::new(file_id, chunk.id);

            match self.chunk_store.remove(&name).await {
                Ok(()) => report.removed += 1,
                Err(StoreError::NotFound(_)) => {
                    tracing::warn!(artifact = %name, "Chunk already missing from staging");
                    report.already_missing += 1;
                }
                Err(e) => {
                    tracing::error!(artifact = %name, error = %e, "Failed to remove chunk");
                    report.failures.push(RemovalFailure {
                        artifact: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.metadata.delete_file(file_id).await?;

        tracing::info!(
            file_id = %file_id,
            chunks = chunks.len(),
            removed = report.removed,
            already_missing = report.already_missing,
            failed = report.failures.len(),
            "File deleted"
        );

        Ok(report)
    }
}
