//! An [`ObjectStore`] wrapper that delays every operation.
//!
//! An instant in-memory store never lets pipeline workers finish out of
//! order, so ordering bugs hide from it. `SlowStore` forwards each call
//! after sleeping a pseudo-random duration, reshuffling worker completion
//! while the consumer must still emit results in sequence. The delays are
//! drawn from a seeded generator, so a failing run replays exactly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use skiff_types::Prefix;

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// Delaying [`ObjectStore`] wrapper for concurrency tests.
///
/// Probes and fetches (`has`, `get`) sleep up to the read bound, writes
/// (`put`) up to the write bound. Both bounds start at zero, i.e.
/// pass-through.
pub struct SlowStore {
    inner: Arc<dyn ObjectStore>,
    read_bound: Duration,
    write_bound: Duration,
    rng: Mutex<StdRng>,
}

impl SlowStore {
    /// Wrap `inner`, seeding the delay generator.
    pub fn new(inner: Arc<dyn ObjectStore>, seed: u64) -> Self {
        Self {
            inner,
            read_bound: Duration::ZERO,
            write_bound: Duration::ZERO,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Delay each `has`/`get` by up to `bound`.
    pub fn with_read_delay(mut self, bound: Duration) -> Self {
        self.read_bound = bound;
        self
    }

    /// Delay each `put` by up to `bound`.
    pub fn with_write_delay(mut self, bound: Duration) -> Self {
        self.write_bound = bound;
        self
    }

    /// Sleep for a pseudo-random duration in `[0, bound]`.
    async fn pause(&self, bound: Duration) {
        if bound.is_zero() {
            return;
        }

        let nanos = {
            let mut rng = self.rng.lock().expect("lock poisoned");
            rng.random_range(0..=bound.as_nanos() as u64)
        };
        tokio::time::sleep(Duration::from_nanos(nanos)).await;
    }
}

#[async_trait::async_trait]
impl ObjectStore for SlowStore {
    async fn has(&self, prefix: Prefix, key: &str) -> Result<bool, StoreError> {
        self.pause(self.read_bound).await;
        self.inner.has(prefix, key).await
    }

    async fn get(&self, prefix: Prefix, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.pause(self.read_bound).await;
        self.inner.get(prefix, key).await
    }

    async fn put(&self, prefix: Prefix, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.pause(self.write_bound).await;
        self.inner.put(prefix, key, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;

    #[tokio::test]
    async fn test_passthrough_semantics() {
        let inner = Arc::new(MemoryStore::new());
        let slow = SlowStore::new(inner.clone(), 7)
            .with_read_delay(Duration::from_millis(1))
            .with_write_delay(Duration::from_millis(1));

        let body = Bytes::from_static(b"through the wrapper");
        slow.put(Prefix::Content, "k", body.clone()).await.unwrap();

        assert!(slow.has(Prefix::Content, "k").await.unwrap());
        assert_eq!(slow.get(Prefix::Content, "k").await.unwrap(), Some(body));
        assert_eq!(inner.counts(Prefix::Content).put, 1);
    }

    #[tokio::test]
    async fn test_zero_bounds_do_not_sleep() {
        let inner = Arc::new(MemoryStore::new());
        let slow = SlowStore::new(inner, 0);

        let started = std::time::Instant::now();
        for i in 0..100 {
            slow.put(Prefix::Content, &i.to_string(), Bytes::new())
                .await
                .unwrap();
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
