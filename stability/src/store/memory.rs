// Copyright (c) 2024 Botho Foundation

//! In-memory store.

use std::collections::BTreeMap;

use super::{KvPairs, KvStore, StoreError, StoreResult};

/// `BTreeMap`-backed store for tests and simulations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn prefix_iter(&self, prefix: &[u8]) -> StoreResult<KvPairs> {
        Ok(self
            .entries
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
    fn test_prefix_iter_is_ordered_and_bounded() {
        let mut store = MemStore::new();
        store.set(b"b/2", b"two").unwrap();
        store.set(b"b/1", b"one").unwrap();
        store.set(b"a/1", b"other").unwrap();
        store.set(b"c", b"other").unwrap();

        let entries = store.prefix_iter(b"b/").unwrap();
        assert_eq!(
            entries,
            vec![
                (b"b/1".to_vec(), b"one".to_vec()),
                (b"b/2".to_vec(), b"two".to_vec())
            ]
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut store = MemStore::new();
        assert_eq!(store.set(b"", b"x"), Err(StoreError::EmptyKey));
    }
}
