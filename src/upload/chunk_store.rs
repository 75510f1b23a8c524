//! Chunk Store
//!
//! Staging storage for uploaded chunks on the local filesystem. Each chunk
//! lives in its own file named `{file_id}_{chunk_id}` directly under the
//! staging root. The directory is never scanned: the metadata store is the
//! only inventory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tokio::fs::File;
use uuid::Uuid;

use super::checksum::{write_checksummed, Checksummed};
use super::types::{ArtifactName, StoreError};

/// A chunk that has been written to staging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChunk {
    pub name: ArtifactName,
    pub checksum: String,
    pub size: u64,
}

/// An artifact opened for streaming back to a client
#[derive(Debug)]
pub struct ArtifactReader {
    pub file: File,
    pub size: u64,
}

/// Local filesystem chunk store
#[derive(Clone)]
pub struct ChunkStore {
    inner: Arc<ChunkStoreInner>,
}

struct ChunkStoreInner {
    root: PathBuf,
}

impl ChunkStore {
    /// Use `root` as the staging directory without touching the filesystem
    pub fn new(root: PathBuf) -> Self {
        Self {
            inner: Arc::new(ChunkStoreInner { root }),
        }
    }

    /// Create the staging directory if needed and return a store over it
    pub async fn create(root: PathBuf) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(StoreError::Io)?;
        Ok(Self::new(root))
    }

    /// Staging root
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn path_of(&self, name: &ArtifactName) -> PathBuf {
        self.inner.root.join(name.to_string())
    }

    /// Write a chunk's bytes to staging and return its checksum
    pub async fn stage<S, E>(
        &self,
        file_id: Uuid,
        chunk_id: Uuid,
        body: S,
    ) -> Result<StagedChunk, StoreError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display,
    {
        let name = ArtifactName::new(file_id, chunk_id);
        let path = self.path_of(&name);

        let Checksummed { checksum, size } = write_checksummed(&path, body).await?;

        tracing::debug!(
            artifact = %name,
            size = size,
            checksum = %checksum,
            "Chunk staged"
        );

        Ok(StagedChunk {
            name,
            checksum,
            size,
        })
    }

    /// Open a staged artifact for reading
    pub async fn open_for_read(&self, name: &ArtifactName) -> Result<ArtifactReader, StoreError> {
        let path = self.path_of(name);

        let file = File::open(&path)
            .await
            .map_err(|e| StoreError::from_io(e, name))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| StoreError::from_io(e, name))?
            .len();

        Ok(ArtifactReader { file, size })
    }

    /// Delete a staged artifact
    pub async fn remove(&self, name: &ArtifactName) -> Result<(), StoreError> {
        tokio::fs::remove_file(self.path_of(name))
            .await
            .map_err(|e| StoreError::from_io(e, name))?;

        tracing::debug!(artifact = %name, "Chunk removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::checksum::compute_hash;
    use std::collections::HashSet;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn body(data: &'static [u8]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        futures::stream::once(async move { Ok(Bytes::from_static(data)) })
    }

    #[tokio::test]
    async fn test_stage_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = ChunkStore::create(temp_dir.path().join("staging")).await.unwrap();

        let file_id = Uuid::new_v4();
        let chunk_id = Uuid::new_v4();
        let data: &'static [u8] = b"test chunk data";

        let staged = store.stage(file_id, chunk_id, body(data)).await.unwrap();
        assert_eq!(staged.name.to_string(), format!("{}_{}", file_id, chunk_id));
        assert_eq!(staged.checksum, compute_hash(data));
        assert_eq!(staged.size, data.len() as u64);

        let mut reader = store.open_for_read(&staged.name).await.unwrap();
        assert_eq!(reader.size, data.len() as u64);

        let mut read_back = Vec::new();
        reader.file.read_to_end(&mut read_back).await.unwrap();
        assert_eq!(read_back, data);
        assert_eq!(compute_hash(&read_back), staged.checksum);
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = ChunkStore::new(temp_dir.path().to_path_buf());

        let name = ArtifactName::new(Uuid::new_v4(), Uuid::new_v4());
        let result = store.open_for_read(&name).await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = ChunkStore::new(temp_dir.path().to_path_buf());

        let staged = store
            .stage(Uuid::new_v4(), Uuid::new_v4(), body(b"bytes"))
            .await
            .unwrap();

        store.remove(&staged.name).await.unwrap();
        assert!(matches!(
            store.open_for_read(&staged.name).await,
            Err(StoreError::NotFound(_))
        ));

        // Already gone
        assert!(matches!(
            store.remove(&staged.name).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_chunks_get_distinct_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let store = ChunkStore::new(temp_dir.path().to_path_buf());
        let file_id = Uuid::new_v4();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .stage(file_id, Uuid::new_v4(), body(b"same payload"))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut names = HashSet::new();
        for task in tasks {
            let staged = task.await.unwrap();
            assert!(names.insert(staged.name.to_string()));
        }

        assert_eq!(names.len(), 16);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 16);
    }
}
