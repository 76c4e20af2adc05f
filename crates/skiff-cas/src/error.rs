//! Error types for chunking operations.

/// Errors that can occur while chunking a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum CasError {
    /// An I/O error occurred while reading the source stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The chunker failed for a non-I/O reason.
    #[error("chunker error: {0}")]
    Chunker(String),
}
