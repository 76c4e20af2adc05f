//! The upload pipeline: byte stream → chunks → concurrent dedup'd PUTs →
//! ordered key log.

use std::sync::Arc;

use bytes::Bytes;
use skiff_cas::ChunkStream;
use skiff_store::ObjectStore;
use skiff_types::{Key, Prefix};
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::EngineError;
use crate::keylog::KeyLog;

type KeyHandle = oneshot::Receiver<Result<Key, EngineError>>;

/// Chunk `reader` and upload every chunk the remote does not already have,
/// recording keys into `log` in exact chunk-production order.
///
/// Three stages, bounded by `concurrency`:
///
/// 1. A producer task cuts chunks and spawns one worker per chunk, pushing
///    a single-shot result handle onto a bounded channel. When the channel
///    is full the producer blocks, which backpressures through the input
///    stream to whatever is feeding it.
/// 2. Each worker digests its chunk, probes the remote, and uploads only
///    if absent. Two workers racing on the same key may both upload; the
///    object is content-addressed and immutable, so the second write is a
///    byte-identical overwrite.
/// 3. The caller's task awaits handles in FIFO order and writes keys to
///    the log, so worker completion order never affects log order. The
///    first error aborts the run; in-flight workers finish on their own
///    and their results are dropped.
pub async fn upload<R>(
    reader: R,
    log: Arc<KeyLog>,
    concurrency: usize,
    store: Arc<dyn ObjectStore>,
) -> Result<(), EngineError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (handle_tx, mut handle_rx) =
        mpsc::channel::<Result<KeyHandle, skiff_cas::CasError>>(concurrency.max(1));

    let producer = tokio::spawn(async move {
        let mut chunks = ChunkStream::new(reader);
        loop {
            match chunks.next_chunk().await {
                Some(Ok(chunk)) => {
                    let (result_tx, result_rx) = oneshot::channel();
                    let store = store.clone();
                    tokio::spawn(async move {
                        let _ = result_tx.send(store_chunk(store.as_ref(), chunk.data).await);
                    });
                    if handle_tx.send(Ok(result_rx)).await.is_err() {
                        break; // consumer aborted
                    }
                }
                Some(Err(e)) => {
                    let _ = handle_tx.send(Err(e)).await;
                    break;
                }
                None => break,
            }
        }
    });

    while let Some(handle) = handle_rx.recv().await {
        let key = handle?.await.map_err(|_| EngineError::WorkerGone)??;
        log.write(key);
    }

    producer.await?;
    Ok(())
}

/// Digest a chunk, probe the remote, and upload it if absent.
async fn store_chunk(store: &dyn ObjectStore, data: Bytes) -> Result<Key, EngineError> {
    let key = Key::from_data(&data);
    let hex = key.to_string();
    let size = data.len();

    if store.has(Prefix::Content, &hex).await? {
        debug!(%key, size, "chunk already on remote");
    } else {
        store.put(Prefix::Content, &hex, data).await?;
        debug!(%key, size, "uploaded chunk");
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use rand::RngCore;
    use rand::SeedableRng;
    use skiff_store::{MemoryStore, SlowStore};

    use super::*;

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut data = vec![0u8; len];
        rand::rngs::StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    }

    fn expected_keys(data: &[u8]) -> Vec<Key> {
        skiff_cas::chunk_all(data)
            .iter()
            .map(|c| Key::from_data(&c.data))
            .collect()
    }

    #[tokio::test]
    async fn test_upload_records_keys_in_chunk_order() {
        // Large enough for several chunks at the deployment chunk sizes.
        let data = random_bytes(12 * 1024 * 1024, 1);
        let expected = expected_keys(&data);
        assert!(expected.len() > 1, "test data should span multiple chunks");

        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(KeyLog::new());
        upload(
            std::io::Cursor::new(data),
            log.clone(),
            64,
            store.clone(),
        )
        .await
        .unwrap();

        assert_eq!(log.keys(), expected);
        assert_eq!(store.len(Prefix::Content), expected.len());
    }

    #[tokio::test]
    async fn test_upload_ordering_survives_worker_jitter() {
        // With jittered store latency, workers complete out of order while
        // the log must still record chunk-production order.
        let data = random_bytes(12 * 1024 * 1024, 2);
        let expected = expected_keys(&data);

        let inner = Arc::new(MemoryStore::new());
        let slow = Arc::new(
            SlowStore::new(inner.clone(), 42)
                .with_read_delay(std::time::Duration::from_millis(8))
                .with_write_delay(std::time::Duration::from_millis(8)),
        );
        let log = Arc::new(KeyLog::new());
        upload(std::io::Cursor::new(data), log.clone(), 8, slow)
            .await
            .unwrap();

        assert_eq!(log.keys(), expected);
    }

    #[tokio::test]
    async fn test_upload_skips_chunks_already_on_remote() {
        let data = random_bytes(2 * 1024 * 1024, 3);
        let store = Arc::new(MemoryStore::new());

        let log = Arc::new(KeyLog::new());
        upload(std::io::Cursor::new(data.clone()), log, 64, store.clone())
            .await
            .unwrap();
        let puts_after_first = store.counts(Prefix::Content).put;

        let log = Arc::new(KeyLog::new());
        upload(std::io::Cursor::new(data), log.clone(), 64, store.clone())
            .await
            .unwrap();

        assert_eq!(
            store.counts(Prefix::Content).put,
            puts_after_first,
            "second upload of identical bytes performs no PUTs"
        );
        assert!(!log.is_empty(), "keys are still recorded on the dedup path");
    }

    #[tokio::test]
    async fn test_upload_empty_stream_produces_nothing() {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(KeyLog::new());
        upload(std::io::Cursor::new(Vec::new()), log.clone(), 64, store.clone())
            .await
            .unwrap();

        assert!(log.is_empty());
        assert_eq!(store.counts(Prefix::Content).put, 0);
        assert_eq!(store.counts(Prefix::Content).has, 0);
    }

    #[tokio::test]
    async fn test_upload_stores_content_under_its_digest() {
        let data = random_bytes(1024 * 1024, 4);
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(KeyLog::new());
        upload(std::io::Cursor::new(data), log, 64, store.clone())
            .await
            .unwrap();

        for hex in store.keys(Prefix::Content) {
            let body = store.object(Prefix::Content, &hex).unwrap();
            assert_eq!(Key::from_data(&body).to_string(), hex);
        }
    }

    #[tokio::test]
    async fn test_upload_surfaces_read_errors() {
        struct FailingReader;
        impl tokio::io::AsyncRead for FailingReader {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::other("torn cable")))
            }
        }

        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(KeyLog::new());
        let err = upload(FailingReader, log, 64, store).await.unwrap_err();
        assert!(matches!(err, EngineError::Cas(_)));
    }
}
