use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{parse_counter, Store};
use crate::Result;

/// In-memory [`Store`] on a BTreeMap.
///
/// Key order is the map's byte-lexicographic order, which matches what the
/// durable backends provide, so prefix scans behave identically. Used by
/// tests and by embedders that do not need persistence.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn increment(&self, key: &[u8], delta: u32) -> Result<u32> {
        let mut map = self.map.write();
        let current = map.get(key).map(|v| parse_counter(v)).unwrap_or(0);
        let next = current + delta;
        map.insert(key.to_vec(), next.to_string().into_bytes());
        Ok(next)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let map = self.map.read();
        Ok(map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_insert_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get(b"k").unwrap(), None);

        store.insert(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));

        store.remove(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);

        // Removing an absent key is fine
        store.remove(b"k").unwrap();
    }

    #[test]
    fn test_increment_from_absent() {
        let store = MemoryStore::new();
        assert_eq!(store.increment(b"counter", 1).unwrap(), 1);
        assert_eq!(store.increment(b"counter", 1).unwrap(), 2);
        assert_eq!(store.increment(b"counter", 5).unwrap(), 7);
        assert_eq!(store.get(b"counter").unwrap(), Some(b"7".to_vec()));
    }

    #[test]
    fn test_scan_prefix_is_ordered() {
        let store = MemoryStore::new();
        store.insert(b"a_2", b"two").unwrap();
        store.insert(b"a_1", b"one").unwrap();
        store.insert(b"b_1", b"other").unwrap();
        store.insert(b"a_3", b"three").unwrap();

        let entries = store.scan_prefix(b"a_").unwrap();
        let keys: Vec<&[u8]> = entries.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![&b"a_1"[..], &b"a_2"[..], &b"a_3"[..]]);
    }
}
