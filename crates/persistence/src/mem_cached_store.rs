//! Write-through overlay over another store.

use crate::{Error, Result, Store};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A pending overlay operation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CacheEntry {
    Put(Vec<u8>),
    Deleted,
}

/// An in-memory write buffer layered over a parent [`Store`].
///
/// Reads consult the overlay first and fall through to the parent; writes
/// and deletes only touch the overlay until [`MemCachedStore::persist`]
/// flushes them down. Overlays nest: wrapping one `MemCachedStore` in
/// another yields transaction-in-block atomicity without the backend
/// knowing anything about transactions.
pub struct MemCachedStore {
    overlay: RwLock<BTreeMap<Vec<u8>, CacheEntry>>,
    parent: Arc<dyn Store>,
}

impl MemCachedStore {
    /// Creates an empty overlay over `parent`.
    pub fn new(parent: Arc<dyn Store>) -> Self {
        Self {
            overlay: RwLock::new(BTreeMap::new()),
            parent,
        }
    }

    /// Number of pending overlay entries.
    pub fn pending(&self) -> usize {
        self.overlay.read().len()
    }

    /// Flushes every overlay entry into the parent and clears the overlay.
    ///
    /// Returns the number of entries applied. If the parent rejects a
    /// write the overlay is left intact so the caller may retry; entries
    /// already applied are harmless to reapply because the parent becomes
    /// the single source of truth only after a full flush.
    pub fn persist(&self) -> Result<usize> {
        let mut overlay = self.overlay.write();
        for (key, entry) in overlay.iter() {
            match entry {
                CacheEntry::Put(value) => self.parent.put(key, value)?,
                CacheEntry::Deleted => self.parent.delete(key)?,
            }
        }
        let count = overlay.len();
        overlay.clear();
        debug!(entries = count, "persisted overlay into parent store");
        Ok(count)
    }
}

impl Store for MemCachedStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        match self.overlay.read().get(key) {
            Some(CacheEntry::Put(value)) => Ok(value.clone()),
            Some(CacheEntry::Deleted) => Err(Error::NotFound),
            None => self.parent.get(key),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.overlay
            .write()
            .insert(key.to_vec(), CacheEntry::Put(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.overlay
            .write()
            .insert(key.to_vec(), CacheEntry::Deleted);
        Ok(())
    }

    fn seek(&self, prefix: &[u8], visitor: &mut dyn FnMut(&[u8], &[u8])) {
        // Merge the parent's view with the overlay; the overlay wins on
        // collisions and deleted keys are dropped.
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        self.parent.seek(prefix, &mut |k, v| {
            merged.insert(k.to_vec(), v.to_vec());
        });
        for (key, entry) in self.overlay.read().iter() {
            if !key.starts_with(prefix) {
                continue;
            }
            match entry {
                CacheEntry::Put(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                CacheEntry::Deleted => {
                    merged.remove(key);
                }
            }
        }
        for (key, value) in &merged {
            visitor(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, MemCachedStore) {
        let parent = Arc::new(MemoryStore::new());
        let cached = MemCachedStore::new(parent.clone());
        (parent, cached)
    }

    #[test]
    fn writes_stay_in_overlay_until_persist() {
        let (parent, cached) = setup();
        cached.put(b"k", b"v1").unwrap();
        assert_eq!(parent.get(b"k"), Err(Error::NotFound));
        assert_eq!(cached.get(b"k").unwrap(), b"v1");

        let count = cached.persist().unwrap();
        assert_eq!(count, 1);
        assert_eq!(cached.pending(), 0);
        assert_eq!(parent.get(b"k").unwrap(), b"v1");
    }

    #[test]
    fn delete_masks_parent_until_persist() {
        let (parent, cached) = setup();
        parent.put(b"k", b"v1").unwrap();
        cached.delete(b"k").unwrap();
        assert_eq!(cached.get(b"k"), Err(Error::NotFound));
        assert_eq!(parent.get(b"k").unwrap(), b"v1");

        cached.persist().unwrap();
        assert_eq!(parent.get(b"k"), Err(Error::NotFound));
    }

    #[test]
    fn seek_merges_overlay_and_parent() {
        let (parent, cached) = setup();
        parent.put(b"p\x01", b"parent1").unwrap();
        parent.put(b"p\x02", b"parent2").unwrap();
        parent.put(b"p\x03", b"parent3").unwrap();
        cached.put(b"p\x02", b"overlay2").unwrap();
        cached.delete(b"p\x03").unwrap();
        cached.put(b"p\x04", b"overlay4").unwrap();

        let mut seen = Vec::new();
        cached.seek(b"p", &mut |k, v| seen.push((k.to_vec(), v.to_vec())));
        assert_eq!(
            seen,
            vec![
                (b"p\x01".to_vec(), b"parent1".to_vec()),
                (b"p\x02".to_vec(), b"overlay2".to_vec()),
                (b"p\x04".to_vec(), b"overlay4".to_vec()),
            ]
        );
    }

    #[test]
    fn nested_overlays_flush_one_level_at_a_time() {
        let parent = Arc::new(MemoryStore::new());
        let block = Arc::new(MemCachedStore::new(parent.clone()));
        let tx = MemCachedStore::new(block.clone());

        tx.put(b"k", b"v").unwrap();
        assert_eq!(block.get(b"k"), Err(Error::NotFound));

        tx.persist().unwrap();
        assert_eq!(block.get(b"k").unwrap(), b"v");
        assert_eq!(parent.get(b"k"), Err(Error::NotFound));

        block.persist().unwrap();
        assert_eq!(parent.get(b"k").unwrap(), b"v");
    }
}
