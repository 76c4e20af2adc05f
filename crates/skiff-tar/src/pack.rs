//! Directory → TAR stream serialization.

use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_tar::{Builder, Header};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::TarError;

/// Serialize the regular files under `dir` into a TAR stream on `writer`.
///
/// Files are visited in sorted order so the same tree always produces the
/// same byte stream. Each entry header carries the path relative to `dir`,
/// the permission bits, the modification time, and the size.
///
/// A directory with no files serializes to an empty stream: no entries
/// means no terminator blocks, so nothing needs uploading and the index
/// stays empty.
pub async fn pack<W>(dir: &Path, writer: W) -> Result<(), TarError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pack_filtered(dir, writer, |_| true).await
}

/// [`pack`], but only archiving files whose relative path satisfies
/// `include`. Callers use this to keep local-only files (e.g. a project id
/// sidecar) out of the stream.
pub async fn pack_filtered<W, F>(dir: &Path, writer: W, mut include: F) -> Result<(), TarError>
where
    W: AsyncWrite + Unpin + Send + 'static,
    F: FnMut(&Path) -> bool,
{
    let mut builder = Builder::new(writer);
    let mut appended = 0usize;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(dir)
            .expect("walked path is under the root");
        if !include(rel) {
            continue;
        }
        let meta = entry.metadata()?;
        let size = meta.len();

        let mut header = Header::new_gnu();
        header.set_size(size);
        header.set_mode(file_mode(&meta));
        header.set_mtime(mtime_secs(&meta));

        debug!(path = %rel.display(), size, "archiving file");

        let file = tokio::fs::File::open(entry.path()).await?;
        let mut counted = CountedReader::new(file.take(size));
        builder.append_data(&mut header, rel, &mut counted).await?;

        // The header promised `size` bytes. A shorter read means the file
        // was truncated while being archived.
        if counted.bytes_read() != size {
            return Err(TarError::SizeMismatch {
                path: rel.to_path_buf(),
                expected: size,
                actual: counted.bytes_read(),
            });
        }

        appended += 1;
    }

    if appended > 0 {
        let mut writer = builder.into_inner().await?;
        writer.shutdown().await?;
    }

    Ok(())
}

/// Permission bits recorded in the entry header.
#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &std::fs::Metadata) -> u32 {
    0o644
}

/// Modification time as seconds since the epoch, 0 when unavailable.
fn mtime_secs(meta: &std::fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// An `AsyncRead` wrapper that counts the bytes it passes through.
struct CountedReader<R> {
    inner: R,
    read: u64,
}

impl<R> CountedReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, read: 0 }
    }

    fn bytes_read(&self) -> u64 {
        self.read
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CountedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let result = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &result {
            this.read += (buf.filled().len() - before) as u64;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pack_to_vec(dir: &Path) -> Vec<u8> {
        let (writer, mut reader) = tokio::io::duplex(64 * 1024);
        let dir = dir.to_path_buf();
        let packer = tokio::spawn(async move { pack(&dir, writer).await });

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        packer.await.unwrap().unwrap();
        buf
    }

    #[tokio::test]
    async fn test_empty_directory_packs_to_empty_stream() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = pack_to_vec(dir.path()).await;
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_pack_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"bee").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"ay").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/c.txt"), b"see").unwrap();

        let first = pack_to_vec(dir.path()).await;
        let second = pack_to_vec(dir.path()).await;
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_pack_skips_symlinks() {
        #[cfg(unix)]
        {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("real.txt"), b"data").unwrap();
            std::os::unix::fs::symlink("real.txt", dir.path().join("link.txt")).unwrap();

            let bytes = pack_to_vec(dir.path()).await;
            let mut archive = tokio_tar::Archive::new(std::io::Cursor::new(bytes));
            let mut entries = archive.entries().unwrap();

            use futures_util::StreamExt;
            let mut names = Vec::new();
            while let Some(entry) = entries.next().await {
                let entry = entry.unwrap();
                names.push(entry.path().unwrap().into_owned());
            }
            assert_eq!(names, vec![std::path::PathBuf::from("real.txt")]);
        }
    }

    #[tokio::test]
    async fn test_pack_filtered_excludes_by_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"keep").unwrap();
        std::fs::write(dir.path().join(".local-only"), b"skip").unwrap();

        let (writer, mut reader) = tokio::io::duplex(64 * 1024);
        let src = dir.path().to_path_buf();
        let packer = tokio::spawn(async move {
            pack_filtered(&src, writer, |rel| rel != Path::new(".local-only")).await
        });
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await.unwrap();
        packer.await.unwrap().unwrap();

        let mut archive = tokio_tar::Archive::new(std::io::Cursor::new(bytes));
        let mut entries = archive.entries().unwrap();

        use futures_util::StreamExt;
        let mut names = Vec::new();
        while let Some(entry) = entries.next().await {
            names.push(entry.unwrap().path().unwrap().into_owned());
        }
        assert_eq!(names, vec![std::path::PathBuf::from("keep.txt")]);
    }

    #[tokio::test]
    async fn test_header_records_size_mode_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, vec![7u8; 1234]).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_700_000_000, 0))
            .unwrap();

        let bytes = pack_to_vec(dir.path()).await;
        let mut archive = tokio_tar::Archive::new(std::io::Cursor::new(bytes));
        let mut entries = archive.entries().unwrap();

        use futures_util::StreamExt;
        let entry = entries.next().await.unwrap().unwrap();
        let header = entry.header();
        assert_eq!(header.size().unwrap(), 1234);
        assert_eq!(header.mtime().unwrap(), 1_700_000_000);
        #[cfg(unix)]
        assert_eq!(header.mode().unwrap() & 0o7777, 0o755);
    }
}
