//! Chunk pipelines and push/pull orchestration.
//!
//! The heart of skiff: [`upload`] turns a byte stream into ordered,
//! deduplicated, content-addressed uploads; [`download`] is the symmetric
//! path back to bytes; [`push`] and [`pull`] wire the pipelines to the TAR
//! bridge and the remote index object.

mod download;
mod error;
mod index;
mod keylog;
mod project;
mod upload;

pub use download::download;
pub use error::EngineError;
pub use index::{decode_index, encode_index};
pub use keylog::KeyLog;
pub use project::{DEFAULT_CONCURRENCY, PROJECT_ID_FILE, pull, push};
pub use upload::upload;
