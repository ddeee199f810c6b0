//! RocksDB store backend.

use crate::{Error, Result, Store};
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::path::Path;
use tracing::info;

/// A [`Store`] backed by an embedded RocksDB database.
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    /// Opens (or creates) a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path.as_ref())
            .map_err(|e| Error::Backend(e.to_string()))?;
        info!(path = %path.as_ref().display(), "opened rocksdb store");
        Ok(Self { db })
    }
}

impl Store for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        match self.db.get(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(Error::NotFound),
            Err(e) => Err(Error::Backend(e.to_string())),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| Error::Backend(e.to_string()))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| Error::Backend(e.to_string()))
    }

    fn seek(&self, prefix: &[u8], visitor: &mut dyn FnMut(&[u8], &[u8])) {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let Ok((key, value)) = item else { break };
            if !key.starts_with(prefix) {
                break;
            }
            visitor(&key, &value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_put_delete_and_seek() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        store.put(b"a\x01", b"1").unwrap();
        store.put(b"a\x02", b"2").unwrap();
        store.put(b"b\x01", b"x").unwrap();
        assert_eq!(store.get(b"a\x01").unwrap(), b"1");
        assert_eq!(store.get(b"missing"), Err(Error::NotFound));

        let mut keys = Vec::new();
        store.seek(b"a", &mut |k, _| keys.push(k.to_vec()));
        assert_eq!(keys, vec![b"a\x01".to_vec(), b"a\x02".to_vec()]);

        store.delete(b"a\x01").unwrap();
        assert_eq!(store.get(b"a\x01"), Err(Error::NotFound));
    }
}
