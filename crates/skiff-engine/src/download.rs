//! The download pipeline: ordered keys → concurrent GETs → ordered bytes.

use std::sync::Arc;

use bytes::Bytes;
use skiff_store::ObjectStore;
use skiff_types::{Key, Prefix};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::EngineError;
use crate::keylog::KeyLog;

type ChunkHandle = oneshot::Receiver<Result<Bytes, EngineError>>;

/// Fetch every key in `log` concurrently and write the bodies to `writer`
/// in key order, reproducing the original stream byte-for-byte.
///
/// The mirror image of [`upload`](crate::upload): a producer drains the
/// preloaded key log and spawns one worker per key; workers GET their
/// chunk and verify that its digest matches the requested key; the
/// caller's task awaits results in FIFO order and writes them out. The
/// first error aborts the run.
pub async fn download<W>(
    log: Arc<KeyLog>,
    mut writer: W,
    concurrency: usize,
    store: Arc<dyn ObjectStore>,
) -> Result<(), EngineError>
where
    W: AsyncWrite + Unpin,
{
    let (handle_tx, mut handle_rx) = mpsc::channel::<ChunkHandle>(concurrency.max(1));

    let producer = tokio::spawn(async move {
        while let Some(key) = log.read() {
            let (result_tx, result_rx) = oneshot::channel();
            let store = store.clone();
            tokio::spawn(async move {
                let _ = result_tx.send(fetch_chunk(store.as_ref(), key).await);
            });
            if handle_tx.send(result_rx).await.is_err() {
                break; // consumer aborted
            }
        }
    });

    while let Some(handle) = handle_rx.recv().await {
        let chunk = handle.await.map_err(|_| EngineError::WorkerGone)??;
        writer.write_all(&chunk).await?;
    }

    producer.await?;
    writer.shutdown().await?;
    Ok(())
}

/// GET a chunk and verify it digests to the requested key.
async fn fetch_chunk(store: &dyn ObjectStore, key: Key) -> Result<Bytes, EngineError> {
    let data = store
        .get(Prefix::Content, &key.to_string())
        .await?
        .ok_or(EngineError::ChunkMissing(key))?;

    // Verify-on-read: the address promises the content.
    let actual = Key::from_data(&data);
    if actual != key {
        return Err(EngineError::ChunkCorrupt { key, actual });
    }

    debug!(%key, size = data.len(), "fetched chunk");
    Ok(data)
}
