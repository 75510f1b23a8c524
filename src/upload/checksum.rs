//! Checksum Writer
//!
//! Streams bytes to a destination file while feeding the same bytes into a
//! SHA-256 digest, so a chunk is read exactly once.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::types::StoreError;

/// Result of a checksummed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksummed {
    /// Hex-encoded SHA-256 of everything written
    pub checksum: String,

    /// Number of bytes written
    pub size: u64,
}

/// `AsyncWrite` adapter that hashes every byte the inner writer accepts
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Consume the writer, returning the inner writer and the digest
    pub fn finish(self) -> (W, Checksummed) {
        let checksum = hex::encode(self.hasher.finalize());
        (
            self.inner,
            Checksummed {
                checksum,
                size: self.written,
            },
        )
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for HashingWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            // Only the prefix the inner writer took is hashed; the rest is retried by the caller.
            Poll::Ready(Ok(n)) => {
                this.hasher.update(&buf[..n]);
                this.written += n as u64;
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Write `source` to `dest`, returning the hex digest of the written bytes.
///
/// The destination is created or truncated. On failure it is left in
/// whatever state the last successful write produced.
pub async fn write_checksummed<S, E>(dest: &Path, source: S) -> Result<Checksummed, StoreError>
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: std::fmt::Display,
{
    let file = tokio::fs::File::create(dest).await.map_err(StoreError::Io)?;
    let mut writer = HashingWriter::new(file);

    let mut source = std::pin::pin!(source);
    while let Some(piece) = source.next().await {
        let piece = match piece {
            Ok(piece) => piece,
            Err(e) => {
                // Settle what was already accepted so the partial artifact is observable.
                let _ = writer.flush().await;
                return Err(StoreError::Source(e.to_string()));
            }
        };
        writer.write_all(&piece).await.map_err(StoreError::Io)?;
    }
    writer.flush().await.map_err(StoreError::Io)?;

    let (_, result) = writer.finish();
    Ok(result)
}

/// Compute the SHA-256 hex digest of an in-memory buffer
pub fn compute_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
