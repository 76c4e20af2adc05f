//! Error types for the pipelines and orchestration.

use std::path::PathBuf;

use skiff_types::Key;

/// Errors that can occur during a push or pull run.
///
/// All of these are fatal to the enclosing operation: the first pipeline
/// error aborts the consumer, in-flight workers are left to finish and
/// their results are dropped.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Remote object-store failure.
    #[error("store error: {0}")]
    Store(#[from] skiff_store::StoreError),

    /// Chunking the input stream failed.
    #[error("chunking error: {0}")]
    Cas(#[from] skiff_cas::CasError),

    /// Archiving or extracting failed.
    #[error("archive error: {0}")]
    Tar(#[from] skiff_tar::TarError),

    /// Local I/O failure (pipe, filesystem).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline task panicked or was cancelled.
    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A worker dropped its result channel without answering.
    #[error("pipeline worker dropped its result")]
    WorkerGone,

    /// The given path does not exist or is not a directory.
    #[error("'{}' is not an accessible directory", .0.display())]
    NotADirectory(PathBuf),

    /// The project id sidecar holds something that is not a UUID.
    #[error("invalid project id '{0}': expected a UUID")]
    BadProjectId(String),

    /// No index object exists for the requested project.
    #[error("no index found for project '{0}'")]
    IndexNotFound(String),

    /// An index line is not a valid hex key.
    #[error("malformed index line {line}: '{text}'")]
    BadIndexLine {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        text: String,
    },

    /// A chunk referenced by the index is absent from the remote.
    #[error("chunk '{0}' is missing from the remote")]
    ChunkMissing(Key),

    /// A downloaded body does not digest to the requested key.
    #[error("chunk '{key}' failed verification: body digests to '{actual}'")]
    ChunkCorrupt {
        /// The key that was requested.
        key: Key,
        /// What the downloaded bytes actually hash to.
        actual: Key,
    },
}
