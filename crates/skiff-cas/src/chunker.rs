//! Content-defined chunking using FastCDC.
//!
//! **Parameters are fixed at deployment and must never change**: the same
//! byte stream must always split at the same boundaries, otherwise a
//! re-upload of unchanged data would produce different keys and defeat
//! deduplication.

use bytes::Bytes;
use fastcdc::v2020::AsyncStreamCDC;
use futures_util::StreamExt;
use tokio::io::AsyncRead;

use crate::error::CasError;

/// Minimum chunk size (512 KiB).
pub const MIN_CHUNK_SIZE: u32 = 524_288;

/// Average chunk size (1 MiB).
pub const AVG_CHUNK_SIZE: u32 = 1_048_576;

/// Maximum chunk size (8 MiB).
pub const MAX_CHUNK_SIZE: u32 = 8_388_608;

/// A single chunk cut from the input stream.
///
/// The data is an owned buffer: the chunker's internal scratch space is
/// never handed out, so a chunk stays valid while later chunks are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset within the original stream.
    pub offset: u64,
    /// The raw chunk data.
    pub data: Bytes,
}

impl From<fastcdc::v2020::ChunkData> for Chunk {
    fn from(chunk: fastcdc::v2020::ChunkData) -> Self {
        Self {
            offset: chunk.offset,
            data: Bytes::from(chunk.data),
        }
    }
}

/// Lazy sequence of content-defined chunks over an async byte reader.
///
/// Chunk boundaries are determined by a rolling hash over the data,
/// producing chunks between [`MIN_CHUNK_SIZE`] and [`MAX_CHUNK_SIZE`] bytes
/// with an average of [`AVG_CHUNK_SIZE`]. The final chunk may be smaller
/// than the minimum; empty input produces no chunks at all.
pub struct ChunkStream<R: AsyncRead + Unpin> {
    cdc: AsyncStreamCDC<R>,
}

impl<R: AsyncRead + Unpin> ChunkStream<R> {
    /// Create a chunk stream with the fixed deployment parameters.
    pub fn new(reader: R) -> Self {
        Self::with_sizes(reader, MIN_CHUNK_SIZE, AVG_CHUNK_SIZE, MAX_CHUNK_SIZE)
    }

    /// Create a chunk stream with custom parameters (for testing).
    pub fn with_sizes(reader: R, min_size: u32, avg_size: u32, max_size: u32) -> Self {
        Self {
            cdc: AsyncStreamCDC::new(reader, min_size, avg_size, max_size),
        }
    }

    /// Read the next chunk, or `None` at end of stream.
    ///
    /// A read error from the underlying source ends the sequence and is
    /// fatal to the surrounding pipeline.
    pub async fn next_chunk(&mut self) -> Option<Result<Chunk, CasError>> {
        let mut stream = std::pin::pin!(self.cdc.as_stream());
        match stream.next().await {
            Some(Ok(chunk)) => Some(Ok(chunk.into())),
            Some(Err(fastcdc::v2020::Error::Empty)) | None => None,
            Some(Err(fastcdc::v2020::Error::IoError(e))) => Some(Err(CasError::Io(e))),
            Some(Err(e)) => Some(Err(CasError::Chunker(e.to_string()))),
        }
    }
}

/// Split an in-memory buffer into content-defined chunks.
///
/// Produces the same boundaries as [`ChunkStream`] over the same bytes.
pub fn chunk_all(data: &[u8]) -> Vec<Chunk> {
    chunk_all_with_sizes(data, MIN_CHUNK_SIZE, AVG_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

/// [`chunk_all`] with custom parameters (for testing).
pub(crate) fn chunk_all_with_sizes(
    data: &[u8],
    min_size: u32,
    avg_size: u32,
    max_size: u32,
) -> Vec<Chunk> {
    if data.is_empty() {
        return Vec::new();
    }

    fastcdc::v2020::FastCDC::new(data, min_size, avg_size, max_size)
        .map(|entry| Chunk {
            offset: entry.offset as u64,
            data: Bytes::copy_from_slice(&data[entry.offset..entry.offset + entry.length]),
        })
        .collect()
}
