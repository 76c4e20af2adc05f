//! Content-defined chunking for skiff.
//!
//! This crate provides:
//! - [`ChunkStream`] — splits an async byte stream into variable-sized,
//!   content-defined chunks using FastCDC.
//! - [`chunk_all`] — chunks an in-memory buffer with the same boundaries.
//!
//! Chunk boundaries are determined by a rolling hash over the content, so a
//! local edit only changes the chunks it touches. Unchanged regions keep
//! their content address across versions, which is what makes remote
//! deduplication work.

mod chunker;
mod error;

pub use chunker::{AVG_CHUNK_SIZE, Chunk, ChunkStream, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, chunk_all};
pub use error::CasError;
