//! Error types for the TAR bridge.

use std::path::PathBuf;

/// Errors that can occur while packing or extracting an archive.
#[derive(Debug, thiserror::Error)]
pub enum TarError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Walking the source directory failed.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Bytes moved for an entry did not match its header size.
    #[error(
        "unexpected size for '{path}': header says {expected} bytes, moved {actual}, \
         is the directory in use?"
    )]
    SizeMismatch {
        /// Path of the offending entry.
        path: PathBuf,
        /// Size recorded in the entry header.
        expected: u64,
        /// Bytes actually read or written.
        actual: u64,
    },

    /// An archive entry path attempts to escape the extraction directory.
    #[error("path traversal attempt in archive: {0}")]
    PathTraversal(PathBuf),
}
