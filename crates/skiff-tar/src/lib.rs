//! Directory ⇄ TAR byte stream bridge.
//!
//! [`pack`] walks a directory and serializes its regular files into a TAR
//! stream; [`unpack`] extracts a TAR stream into a directory, restoring
//! file modes and modification times. Both enforce that the bytes moved
//! for an entry match its header size, so a file changing underneath a
//! running pack is detected instead of silently corrupting the archive.
//!
//! Only regular files travel through the bridge: directories are implied
//! by file paths, symlinks and special files are skipped.

mod error;
mod pack;
mod unpack;

pub use error::TarError;
pub use pack::{pack, pack_filtered};
pub use unpack::unpack;
