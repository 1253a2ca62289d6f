//! Streaming relay from an upstream download to a caller-supplied sink
//!
//! The upstream stream is owned by [`OpenedStream`] and moved into
//! [`OpenedStream::copy_to`], so it is dropped, releasing the connection,
//! on every path out of the copy. Chunks are forwarded one at a time; the
//! copy only pulls the next chunk after the sink accepted the previous one.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{DriveError, Result};
use crate::source::ContentSource;
use crate::types::ContentStream;

/// Write-only destination for relayed bytes
#[async_trait]
pub trait ByteSink: Send {
    /// Accept one chunk. An error ends the relay.
    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()>;

    /// Called once after the last chunk
    async fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ByteSink for Vec<u8> {
    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()> {
        self.extend_from_slice(&chunk);
        Ok(())
    }
}

/// Bounded channel sink; a full channel holds the copy back, a dropped
/// receiver fails it.
#[async_trait]
impl ByteSink for mpsc::Sender<std::io::Result<Bytes>> {
    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()> {
        self.send(Ok(chunk)).await.map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stream receiver dropped")
        })
    }
}

/// Adapts any [`AsyncWrite`] into a [`ByteSink`]
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ByteSink for WriterSink<W> {
    async fn write_chunk(&mut self, chunk: Bytes) -> std::io::Result<()> {
        self.writer.write_all(&chunk).await
    }

    async fn finish(&mut self) -> std::io::Result<()> {
        self.writer.flush().await
    }
}

/// An upstream download that has been opened but not yet copied
#[derive(Debug)]
pub struct OpenedStream {
    file_id: String,
    stream: ContentStream,
}

impl OpenedStream {
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn content_type(&self) -> Option<&str> {
        self.stream.content_type.as_deref()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.stream.content_length
    }

    /// Copy every chunk into `sink` and return the number of bytes written.
    ///
    /// On failure the sink keeps whatever it already accepted; the count in
    /// [`DriveError::Copy`] covers only chunks the sink accepted in full.
    pub async fn copy_to<K: ByteSink + ?Sized>(self, sink: &mut K) -> Result<u64> {
        let OpenedStream { file_id, stream } = self;
        let mut body = stream.body;
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(source) => {
                    warn!(
                        "Upstream stream for {} failed after {} bytes: {}",
                        file_id, written, source
                    );
                    return Err(DriveError::Copy { written, source });
                }
            };
            if chunk.is_empty() {
                continue;
            }
            let len = chunk.len() as u64;
            if let Err(source) = sink.write_chunk(chunk).await {
                debug!(
                    "Sink for {} closed after {} bytes: {}",
                    file_id, written, source
                );
                return Err(DriveError::Copy { written, source });
            }
            written += len;
        }

        sink.finish()
            .await
            .map_err(|source| DriveError::Copy { written, source })?;

        debug!("Relayed {} bytes of {}", written, file_id);
        Ok(written)
    }
}

/// Open the content of `file_id` without copying anything yet
pub async fn open<S: ContentSource + ?Sized>(source: &S, file_id: &str) -> Result<OpenedStream> {
    let stream = source
        .open_content(file_id)
        .await
        .map_err(|reason| DriveError::Open {
            file: file_id.to_string(),
            reason,
        })?;

    Ok(OpenedStream {
        file_id: file_id.to_string(),
        stream,
    })
}

/// Stream the content of `file_id` into `sink` until it is exhausted or the
/// first failure. Returns the number of bytes written.
pub async fn relay<S, K>(source: &S, file_id: &str, sink: &mut K) -> Result<u64>
where
    S: ContentSource + ?Sized,
    K: ByteSink + ?Sized,
{
    open(source, file_id).await?.copy_to(sink).await
}
