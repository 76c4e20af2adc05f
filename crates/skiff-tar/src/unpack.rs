//! TAR stream → directory extraction.

use std::path::{Component, Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_tar::Archive;
use tracing::debug;

use crate::error::TarError;

/// Extract a TAR stream into `dir`, creating it if needed.
///
/// Each file is streamed to a temporary file beside its target and
/// atomically renamed over it, so a crash mid-extraction never leaves a
/// half-written file under the final name. Permission bits and
/// modification times are restored from the entry headers. Paths
/// containing `..` are rejected to prevent traversal out of `dir`;
/// non-file entries are skipped.
pub async fn unpack<R>(reader: R, dir: &Path) -> Result<(), TarError>
where
    R: AsyncRead + Unpin + Send,
{
    tokio::fs::create_dir_all(dir).await?;

    let mut archive = Archive::new(reader);
    let mut entries = archive.entries()?;

    while let Some(next) = entries.next().await {
        let mut entry = next?;
        let header = entry.header().clone();

        if !header.entry_type().is_file() {
            debug!(entry_type = ?header.entry_type(), "skipping non-file entry");
            continue;
        }

        let raw_path = entry.path()?.into_owned();
        let Some(rel) = normalize_entry_path(&raw_path)? else {
            continue;
        };
        let dest = dir.join(&rel);
        let parent = dest.parent().unwrap_or(dir);
        tokio::fs::create_dir_all(parent).await?;

        // Stream the content to a temp file in the same directory, then
        // rename over the target.
        let tmp = tempfile::NamedTempFile::new_in(parent)?;
        let mut out = tokio::fs::File::from_std(tmp.as_file().try_clone()?);
        let written = tokio::io::copy(&mut entry, &mut out).await?;
        out.flush().await?;
        drop(out);

        let size = header.size()?;
        if written != size {
            return Err(TarError::SizeMismatch {
                path: rel,
                expected: size,
                actual: written,
            });
        }

        tmp.persist(&dest).map_err(|e| TarError::Io(e.error))?;
        debug!(path = %rel.display(), size, "extracted file");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = header.mode()? & 0o7777;
            tokio::fs::set_permissions(&dest, std::fs::Permissions::from_mode(mode)).await?;
        }

        if let Ok(mtime) = header.mtime() {
            filetime::set_file_mtime(&dest, filetime::FileTime::from_unix_time(mtime as i64, 0))?;
        }
    }

    Ok(())
}

/// Normalize an archive entry path for extraction.
///
/// Returns:
/// - `Ok(Some(path))` — safe relative path to extract to
/// - `Ok(None)` — path normalizes to nothing (e.g. `.` or `/`), skip it
/// - `Err(PathTraversal)` — path contains a `..` component
fn normalize_entry_path(path: &Path) -> Result<Option<PathBuf>, TarError> {
    let mut result = PathBuf::with_capacity(path.as_os_str().len());

    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => return Err(TarError::PathTraversal(path.to_path_buf())),
            Component::Normal(part) => result.push(part),
        }
    }

    if result.as_os_str().is_empty() {
        return Ok(None);
    }

    Ok(Some(result))
}
