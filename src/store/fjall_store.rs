use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use parking_lot::Mutex;

use super::{parse_counter, Store};
use crate::error::NacreError;
use crate::Result;

const KV_PARTITION: &str = "kv";

/// Fjall-backed durable [`Store`].
///
/// A single LSM partition holds every record; fjall iterates keys in raw
/// byte order, which is exactly what the big-endian seq-id key layout
/// relies on for ordered range scans.
pub struct FjallStore {
    _keyspace: Keyspace,
    kv: PartitionHandle,
    // fjall has no native read-modify-write, so counter updates are
    // serialized here to keep increment atomic across callers.
    counter_lock: Mutex<()>,
}

impl FjallStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let keyspace = Config::new(path.as_ref())
            .open()
            .map_err(|e| NacreError::Store(format!("failed to open keyspace: {}", e)))?;
        let kv = keyspace
            .open_partition(KV_PARTITION, PartitionCreateOptions::default())
            .map_err(|e| NacreError::Store(format!("failed to open kv partition: {}", e)))?;

        Ok(Self {
            _keyspace: keyspace,
            kv,
            counter_lock: Mutex::new(()),
        })
    }
}

impl Store for FjallStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .kv
            .get(key)
            .map_err(|e| NacreError::Store(e.to_string()))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.kv
            .insert(key, value)
            .map_err(|e| NacreError::Store(e.to_string()))
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.kv
            .remove(key)
            .map_err(|e| NacreError::Store(e.to_string()))
    }

    fn increment(&self, key: &[u8], delta: u32) -> Result<u32> {
        let _guard = self.counter_lock.lock();
        let current = self.get(key)?.map(|v| parse_counter(&v)).unwrap_or(0);
        let next = current + delta;
        self.insert(key, next.to_string().as_bytes())?;
        Ok(next)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        for kv in self.kv.prefix(prefix) {
            let (key, value) = kv.map_err(|e| NacreError::Store(e.to_string()))?;
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        store.insert(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));

        store.remove(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_counter_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FjallStore::open(dir.path()).unwrap();
            assert_eq!(store.increment(b"seq", 1).unwrap(), 1);
            assert_eq!(store.increment(b"seq", 1).unwrap(), 2);
        }
        let store = FjallStore::open(dir.path()).unwrap();
        assert_eq!(store.increment(b"seq", 1).unwrap(), 3);
    }

    #[test]
    fn test_prefix_scan_byte_order() {
        let dir = TempDir::new().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();

        store.insert(b"p_\x00\x00\x01\x00", b"256").unwrap();
        store.insert(b"p_\x00\x00\x00\x02", b"2").unwrap();
        store.insert(b"q_\x00\x00\x00\x01", b"other").unwrap();

        let entries = store.scan_prefix(b"p_").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, b"2".to_vec());
        assert_eq!(entries[1].1, b"256".to_vec());
    }
}
