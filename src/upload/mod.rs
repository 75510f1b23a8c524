//! Chunked Upload Engine
//!
//! Clients commit a file's metadata, then upload its chunks one request at a
//! time. Each chunk is written to local staging as `{file_id}_{chunk_id}`,
//! checksummed in the same pass, and recorded in the metadata store.
//!
//! Flow:
//! 1. Client submits file metadata; quota is checked against the user's
//!    recorded files and the file gets its identity
//! 2. Client uploads chunks referencing the file id, in any order
//! 3. Downstream consumers read chunks back by artifact name
//! 4. Deleting a file removes its staged chunks, then its metadata

pub mod checksum;
pub mod chunk_store;
pub mod deletion;
pub mod orchestrator;
pub mod quota;
pub mod types;

pub use checksum::{compute_hash, write_checksummed, Checksummed, HashingWriter};
pub use chunk_store::{ArtifactReader, ChunkStore, StagedChunk};
pub use deletion::{DeletionCoordinator, DeletionReport, RemovalFailure};
pub use orchestrator::UploadOrchestrator;
pub use quota::QuotaState;
pub use types::*;
