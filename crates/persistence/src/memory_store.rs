//! In-memory store backend.

use crate::{Error, Result, Store};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A [`Store`] backed by an ordered in-memory map. Used by tests and as the
/// default backend for ephemeral chains.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored pairs.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Indicates whether the store holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.map.read().get(key).cloned().ok_or(Error::NotFound)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn seek(&self, prefix: &[u8], visitor: &mut dyn FnMut(&[u8], &[u8])) {
        // Clone the matching range so the visitor can re-enter the store.
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = self
            .map
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in &pairs {
            visitor(key, value);
        }
    }
}
