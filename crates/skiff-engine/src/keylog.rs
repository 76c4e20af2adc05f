//! The run-local, ordered record of chunk keys.

use std::collections::HashSet;
use std::sync::Mutex;

use skiff_types::Key;

#[derive(Default)]
struct Inner {
    pos: usize,
    seen: HashSet<Key>,
    order: Vec<Key>,
}

/// Ordered, concurrency-safe sequence of keys with set-membership dedup.
///
/// On push the log is empty and [`write`](KeyLog::write) appends each key
/// once, in chunk-production order. On pull the log is seeded from the
/// decoded index via [`preloaded`](KeyLog::preloaded), which bypasses the
/// dedup gate since a stream may legitimately repeat keys, and drained by
/// [`read`](KeyLog::read).
#[derive(Default)]
pub struct KeyLog {
    inner: Mutex<Inner>,
}

impl KeyLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log pre-seeded with an ordered key sequence, duplicates
    /// preserved.
    pub fn preloaded(keys: Vec<Key>) -> Self {
        let seen = keys.iter().copied().collect();
        Self {
            inner: Mutex::new(Inner {
                pos: 0,
                seen,
                order: keys,
            }),
        }
    }

    /// Append a key unless it was already written.
    pub fn write(&self, key: Key) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.seen.insert(key) {
            inner.order.push(key);
        }
    }

    /// Return the key at the read position and advance, or `None` past the
    /// end.
    pub fn read(&self) -> Option<Key> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.pos == inner.order.len() {
            return None;
        }
        let key = inner.order[inner.pos];
        inner.pos += 1;
        Some(key)
    }

    /// Snapshot of the ordered key sequence.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.lock().expect("lock poisoned").order.clone()
    }

    /// Number of keys in the log.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("lock poisoned").order.len()
    }

    /// Whether the log holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
