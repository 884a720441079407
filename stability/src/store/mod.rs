// Copyright (c) 2024 Botho Foundation

//! Ordered key-value storage.
//!
//! The engine only needs byte keys in lexicographic order. Integers inside
//! keys are big-endian so that lexicographic order matches numeric order.
//! Values are `bincode`-encoded serde structs.

mod cached;
mod lmdb_store;
mod memory;

pub use cached::CachedStore;
pub use lmdb_store::LmdbStore;
pub use memory::MemStore;

use displaydoc::Display;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors from the storage layer.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Database error: {0}
    Database(String),

    /// Serialization error: {0}
    Serialization(String),

    /// Keys must be non-empty
    EmptyKey,
}

impl From<lmdb::Error> for StoreError {
    fn from(err: lmdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value pairs returned by a prefix scan.
pub type KvPairs = Vec<(Vec<u8>, Vec<u8>)>;

/// Byte-ordered key-value store.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Deleting a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> StoreResult<()>;

    /// All entries whose key starts with `prefix`, ascending by key.
    fn prefix_iter(&self, prefix: &[u8]) -> StoreResult<KvPairs>;

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Delete every entry under `prefix`, returning how many were removed.
    fn delete_prefix(&mut self, prefix: &[u8]) -> StoreResult<usize> {
        let entries = self.prefix_iter(prefix)?;
        for (key, _) in &entries {
            self.delete(key)?;
        }
        Ok(entries.len())
    }
}

/// Read and decode a value.
pub fn get_value<T: DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> StoreResult<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and write a value.
pub fn set_value<T: Serialize>(store: &mut dyn KvStore, key: &[u8], value: &T) -> StoreResult<()> {
    let bytes = bincode::serialize(value)?;
    store.set(key, &bytes)
}

/// Decode every value under `prefix`, in key order.
pub fn prefix_values<T: DeserializeOwned>(store: &dyn KvStore, prefix: &[u8]) -> StoreResult<Vec<T>> {
    store
        .prefix_iter(prefix)?
        .iter()
        .map(|(_, bytes)| bincode::deserialize(bytes).map_err(StoreError::from))
        .collect()
}

/// Builder for composite keys.
#[derive(Clone, Debug, Default)]
pub(crate) struct Key(Vec<u8>);

impl Key {
    pub fn new(root: &str) -> Self {
        Self(root.as_bytes().to_vec())
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.0.extend_from_slice(value);
        self
    }

    /// A string segment, NUL-terminated so that no segment is a prefix of
    /// another.
    pub fn str(mut self, value: &str) -> Self {
        self.0.extend_from_slice(value.as_bytes());
        self.0.push(0);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_order_matches_numeric_order() {
        let a = Key::new("q/").u64(9).u64(1).build();
        let b = Key::new("q/").u64(10).u64(0).build();
        assert!(a < b);
    }

    #[test]
    fn test_string_segments_are_prefix_free() {
        let foo = Key::new("p/").str("foo").build();
        let foobar = Key::new("p/").str("foobar").build();
        assert!(!foobar.starts_with(&foo));
    }

    #[test]
    fn test_typed_helpers() {
        let mut store = MemStore::new();
        set_value(&mut store, b"a", &42u64).unwrap();
        assert_eq!(get_value::<u64>(&store, b"a").unwrap(), Some(42));
        assert_eq!(get_value::<u64>(&store, b"b").unwrap(), None);

        set_value(&mut store, b"p1", &1u64).unwrap();
        set_value(&mut store, b"p2", &2u64).unwrap();
        assert_eq!(prefix_values::<u64>(&store, b"p").unwrap(), vec![1, 2]);
        assert_eq!(store.delete_prefix(b"p").unwrap(), 2);
        assert!(store.prefix_iter(b"p").unwrap().is_empty());
    }
}
