//! In-process metadata store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MetadataError, MetadataStore, UserRecord};
use crate::upload::{quota::recorded_usage, ChunkRecord, FileRecord, UserFiles};

/// Metadata store kept in memory.
///
/// Used when no data service is configured, and by tests.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    files: HashMap<Uuid, FileRecord>,
    chunks: HashMap<Uuid, Vec<ChunkRecord>>,
    users: HashMap<String, UserRecord>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with the given allotment
    pub async fn with_user(self, user_id: &str, alloted_size: u64) -> Self {
        self.tables.write().await.users.insert(
            user_id.to_string(),
            UserRecord {
                id: user_id.to_string(),
                email: String::new(),
                name: user_id.to_string(),
                picture: None,
                alloted_size,
            },
        );
        self
    }

    /// Number of file records held
    pub async fn file_count(&self) -> usize {
        self.tables.read().await.files.len()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create_file(&self, record: &FileRecord) -> Result<(), MetadataError> {
        let mut tables = self.tables.write().await;
        tables.files.insert(record.id, record.clone());
        Ok(())
    }

    async fn create_chunk(&self, record: &ChunkRecord) -> Result<(), MetadataError> {
        let mut tables = self.tables.write().await;
        if !tables.files.contains_key(&record.file_id) {
            return Err(MetadataError::NotFound(format!("file {}", record.file_id)));
        }
        tables
            .chunks
            .entry(record.file_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn files_by_user(&self, user_id: &str) -> Result<UserFiles, MetadataError> {
        let tables = self.tables.read().await;

        let mut files: Vec<FileRecord> = tables
            .files
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        files.sort_by_key(|f| f.created_at);

        Ok(UserFiles {
            used_size: recorded_usage(&files).unwrap_or(u64::MAX),
            alloted_size: tables.users.get(user_id).map(|u| u.alloted_size),
            files,
        })
    }

    async fn chunks_by_file(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>, MetadataError> {
        let tables = self.tables.read().await;
        let mut chunks = tables.chunks.get(&file_id).cloned().unwrap_or_default();
        chunks.sort_by_key(|c| c.order);
        Ok(chunks)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, MetadataError> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), MetadataError> {
        let mut tables = self.tables.write().await;
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete_file(&self, file_id: Uuid) -> Result<(), MetadataError> {
        let mut tables = self.tables.write().await;
        tables.chunks.remove(&file_id);
        tables
            .files
            .remove(&file_id)
            .map(|_| ())
            .ok_or_else(|| MetadataError::NotFound(format!("file {}", file_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::FileMeta;

    fn file(user_id: &str, size: u64, created_at: i64) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            meta: FileMeta {
                name: "f".into(),
                size,
            },
            total_chunks: 1,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_files_by_user_is_scoped_and_summed() {
        let store = InMemoryMetadataStore::new().with_user("u1", 900).await;
        store.create_file(&file("u1", 100, 2)).await.unwrap();
        store.create_file(&file("u1", 50, 1)).await.unwrap();
        store.create_file(&file("u2", 7, 3)).await.unwrap();

        let listed = store.files_by_user("u1").await.unwrap();
        assert_eq!(listed.files.len(), 2);
        assert_eq!(listed.files[0].created_at, 1);
        assert_eq!(listed.used_size, 150);
        assert_eq!(listed.alloted_size, Some(900));

        let other = store.files_by_user("u2").await.unwrap();
        assert_eq!(other.alloted_size, None);
    }

    #[tokio::test]
    async fn test_chunk_for_unknown_file_is_rejected() {
        let store = InMemoryMetadataStore::new();
        let chunk = ChunkRecord {
            id: Uuid::new_v4(),
            file_id: Uuid::new_v4(),
            checksum: String::new(),
            order: 0,
        };

        assert!(matches!(
            store.create_chunk(&chunk).await,
            Err(MetadataError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_drops_chunks() {
        let store = InMemoryMetadataStore::new();
        let record = file("u1", 1, 0);
        store.create_file(&record).await.unwrap();
        for order in [1, 0] {
            store
                .create_chunk(&ChunkRecord {
                    id: Uuid::new_v4(),
                    file_id: record.id,
                    checksum: String::new(),
                    order,
                })
                .await
                .unwrap();
        }

        let chunks = store.chunks_by_file(record.id).await.unwrap();
        assert_eq!(chunks.iter().map(|c| c.order).collect::<Vec<_>>(), vec![0, 1]);

        store.delete_file(record.id).await.unwrap();
        assert!(store.chunks_by_file(record.id).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_file(record.id).await,
            Err(MetadataError::NotFound(_))
        ));
    }
}
