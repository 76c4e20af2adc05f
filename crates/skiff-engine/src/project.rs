//! End-to-end push and pull of a project directory.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use skiff_store::ObjectStore;
use skiff_types::Prefix;
use tracing::info;
use uuid::Uuid;

use crate::download::download;
use crate::error::EngineError;
use crate::index;
use crate::keylog::KeyLog;
use crate::upload::upload;

/// Sidecar file at the directory root holding the project UUID.
///
/// Created on the first push, read thereafter. It stays local: the sidecar
/// is excluded from the archived stream, so pulling a project into a fresh
/// directory does not adopt the source's identity.
pub const PROJECT_ID_FILE: &str = ".project-id";

/// Default number of in-flight chunk transfers.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Capacity of the in-memory pipe between the TAR bridge and a pipeline.
const PIPE_CAPACITY: usize = 256 * 1024;

/// Push `dir` to the remote: archive, chunk, deduplicate, upload, and
/// store the index under the directory's project id.
///
/// Returns the project id, which a later [`pull`] uses to retrieve the
/// tree.
pub async fn push(
    dir: &Path,
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
) -> Result<Uuid, EngineError> {
    let meta = tokio::fs::metadata(dir)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::NotADirectory(dir.to_path_buf()),
            _ => EngineError::Io(e),
        })?;
    if !meta.is_dir() {
        return Err(EngineError::NotADirectory(dir.to_path_buf()));
    }

    let id = project_id(dir).await?;
    info!(%id, dir = %dir.display(), "pushing directory");

    let log = Arc::new(KeyLog::new());
    let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
    let uploader = tokio::spawn(upload(reader, log.clone(), concurrency, store.clone()));

    let pack_result =
        skiff_tar::pack_filtered(dir, writer, |rel| rel != Path::new(PROJECT_ID_FILE)).await;

    // A pipeline abort breaks the pipe under the packer, so the upload
    // error is the root cause and reports first.
    let upload_result = uploader.await?;
    upload_result?;
    pack_result?;

    let keys = log.keys();
    let body = index::encode_index(&keys);
    store
        .put(Prefix::Metadata, &id.to_string(), Bytes::from(body))
        .await?;

    info!(%id, chunks = keys.len(), "push complete");
    Ok(id)
}

/// Pull the project `id` from the remote and extract it into `dir`.
pub async fn pull(
    id: &str,
    dir: &Path,
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
) -> Result<(), EngineError> {
    let body = store
        .get(Prefix::Metadata, id)
        .await?
        .ok_or_else(|| EngineError::IndexNotFound(id.to_owned()))?;
    let keys = index::decode_index(&body)?;
    info!(id, chunks = keys.len(), dir = %dir.display(), "pulling project");

    let log = Arc::new(KeyLog::preloaded(keys));
    let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
    let target = dir.to_path_buf();
    let extractor = tokio::spawn(async move { skiff_tar::unpack(reader, &target).await });

    let download_result = download(log, writer, concurrency, store).await;
    let extract_result = extractor.await?;

    match (download_result, extract_result) {
        // A failed extractor breaks the pipe under the downloader; the
        // extraction error is the root cause.
        (Err(EngineError::Io(e)), Err(tar_err))
            if e.kind() == std::io::ErrorKind::BrokenPipe =>
        {
            Err(tar_err.into())
        }
        (Err(e), _) => Err(e),
        (Ok(()), Err(e)) => Err(e.into()),
        (Ok(()), Ok(())) => {
            info!(id, "pull complete");
            Ok(())
        }
    }
}

/// Read the project id sidecar, creating it with a fresh UUID on first use.
async fn project_id(dir: &Path) -> Result<Uuid, EngineError> {
    let path = dir.join(PROJECT_ID_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Uuid::parse_str(text.trim())
            .map_err(|_| EngineError::BadProjectId(text.trim().to_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let id = Uuid::new_v4();
            tokio::fs::write(&path, id.to_string()).await?;
            info!(%id, path = %path.display(), "created project id file");
            Ok(id)
        }
        Err(e) => Err(e.into()),
    }
}
