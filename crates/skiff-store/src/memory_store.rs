//! In-memory object store backend.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use skiff_types::Prefix;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// Operation counts recorded by a [`MemoryStore`] for one prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCounts {
    /// Number of `has` probes.
    pub has: u64,
    /// Number of `get` fetches.
    pub get: u64,
    /// Number of `put` writes.
    pub put: u64,
}

#[derive(Default)]
struct PrefixCounters {
    has: AtomicU64,
    get: AtomicU64,
    put: AtomicU64,
}

/// In-memory object store backed by a `RwLock<HashMap>`.
///
/// Records how often each operation ran per prefix, so tests can observe
/// deduplication (e.g. "a second push performs zero content PUTs").
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<(Prefix, String), Bytes>>,
    content: PrefixCounters,
    metadata: PrefixCounters,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, prefix: Prefix) -> &PrefixCounters {
        match prefix {
            Prefix::Content => &self.content,
            Prefix::Metadata => &self.metadata,
        }
    }

    /// Operation counts recorded for a prefix.
    pub fn counts(&self, prefix: Prefix) -> OpCounts {
        let counters = self.counters(prefix);
        OpCounts {
            has: counters.has.load(Ordering::Relaxed),
            get: counters.get.load(Ordering::Relaxed),
            put: counters.put.load(Ordering::Relaxed),
        }
    }

    /// Seed an object directly, without touching the operation counters.
    pub fn insert(&self, prefix: Prefix, key: &str, body: Bytes) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert((prefix, key.to_owned()), body);
    }

    /// Remove an object directly, without touching the operation counters.
    pub fn remove(&self, prefix: Prefix, key: &str) -> Option<Bytes> {
        self.objects
            .write()
            .expect("lock poisoned")
            .remove(&(prefix, key.to_owned()))
    }

    /// Look up an object directly, without touching the operation counters.
    pub fn object(&self, prefix: Prefix, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(&(prefix, key.to_owned()))
            .cloned()
    }

    /// All keys stored under a prefix, in no particular order.
    pub fn keys(&self, prefix: Prefix) -> Vec<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .keys()
            .filter(|(p, _)| *p == prefix)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Number of objects stored under a prefix.
    pub fn len(&self, prefix: Prefix) -> usize {
        self.keys(prefix).len()
    }

    /// Whether a prefix holds no objects.
    pub fn is_empty(&self, prefix: Prefix) -> bool {
        self.len(prefix) == 0
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn has(&self, prefix: Prefix, key: &str) -> Result<bool, StoreError> {
        self.counters(prefix).has.fetch_add(1, Ordering::Relaxed);
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(&(prefix, key.to_owned())))
    }

    async fn get(&self, prefix: Prefix, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.counters(prefix).get.fetch_add(1, Ordering::Relaxed);
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(&(prefix, key.to_owned())).cloned())
    }

    async fn put(&self, prefix: Prefix, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.counters(prefix).put.fetch_add(1, Ordering::Relaxed);
        debug!(%prefix, key, size = body.len(), "storing object in memory");
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert((prefix, key.to_owned()), body);
        Ok(())
    }
}
