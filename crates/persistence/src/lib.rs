//! Storage abstraction for the Neo ledger.
//!
//! Everything above this crate talks to one [`Store`] trait; backends are
//! interchangeable. [`MemCachedStore`] is the write-through overlay that
//! gives the ledger its per-transaction and per-block atomicity.

pub mod mem_cached_store;
pub mod memory_store;
pub mod prefix;
#[cfg(feature = "rocksdb-store")]
pub mod rocksdb_store;

pub use mem_cached_store::MemCachedStore;
pub use memory_store::MemoryStore;
pub use prefix::DataEntryPrefix;
#[cfg(feature = "rocksdb-store")]
pub use rocksdb_store::RocksDbStore;

use std::sync::Arc;

/// Error types for storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The key is not present. Callers routinely branch on this to fall
    /// back to typed defaults, so it is distinct from real failures.
    #[error("key not found")]
    NotFound,

    /// A backend failure; may be transient.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An ordered binary key-value store.
///
/// `seek` visits every pair whose key starts with `prefix`, in ascending
/// lexicographic key order. Methods take `&self`; implementations supply
/// their own interior locking so stores can be shared behind an [`Arc`].
pub trait Store: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Removes `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Visits all pairs under `prefix` in lexicographic key order.
    fn seek(&self, prefix: &[u8], visitor: &mut dyn FnMut(&[u8], &[u8]));
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }

    fn seek(&self, prefix: &[u8], visitor: &mut dyn FnMut(&[u8], &[u8])) {
        (**self).seek(prefix, visitor)
    }
}
