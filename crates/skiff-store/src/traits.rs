//! Core trait for remote object storage.

use bytes::Bytes;
use skiff_types::Prefix;

use crate::error::StoreError;

/// Trait for storing and retrieving objects under `(prefix, key)`.
///
/// All implementations must be `Send + Sync`: the store is shared read-only
/// across pipeline workers. Bodies are passed as [`Bytes`] so workers can
/// hand buffers around without copying.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether an object exists (HEAD).
    ///
    /// `false` covers both "not found" and "forbidden to list": stores
    /// answer 403 to HEAD when the caller lacks list permission, and a
    /// subsequent PUT still resolves the actual state.
    async fn has(&self, prefix: Prefix, key: &str) -> Result<bool, StoreError>;

    /// Retrieve an object. Returns `None` if it does not exist.
    async fn get(&self, prefix: Prefix, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Store an object under the given key.
    async fn put(&self, prefix: Prefix, key: &str, body: Bytes) -> Result<(), StoreError>;
}
