//! Durable key-value storage behind the collection.
//!
//! The collection persists raw documents and id mappings through the
//! [`Store`] trait and never assumes anything about the backing engine
//! beyond byte-lexicographic key ordering for prefix scans. Two backends
//! ship with the crate: [`MemoryStore`] for tests and embedding, and
//! [`FjallStore`] on an LSM keyspace for durability.

mod fjall_store;
mod memory;

pub use fjall_store::FjallStore;
pub use memory::MemoryStore;

use crate::Result;

/// Key-value store contract.
///
/// Keys and values are byte strings; key ordering is lexicographic on raw
/// bytes. Implementations must be safe to share across threads.
pub trait Store: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite the value under `key`.
    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete the value under `key`. Deleting an absent key is not an error.
    fn remove(&self, key: &[u8]) -> Result<()>;

    /// Atomic read-modify-write of a decimal counter stored under `key`.
    ///
    /// An absent key counts as 0. Returns the incremented value.
    fn increment(&self, key: &[u8], delta: u32) -> Result<u32>;

    /// All `(key, value)` pairs whose key starts with `prefix`, in
    /// ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Parse a decimal counter value as stored by [`Store::increment`].
pub(crate) fn parse_counter(bytes: &[u8]) -> u32 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}
