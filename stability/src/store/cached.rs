// Copyright (c) 2024 Botho Foundation

//! Write buffer over another store.

use std::collections::BTreeMap;

use super::{KvPairs, KvStore, StoreError, StoreResult};

/// Buffers writes and deletes until [`CachedStore::commit`]. Dropping the
/// cache without committing discards every buffered change.
pub struct CachedStore<'a> {
    parent: &'a mut dyn KvStore,
    /// `None` marks a pending delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CachedStore<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletes.
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Flush buffered changes to the parent in key order.
    pub fn commit(self) -> StoreResult<()> {
        let CachedStore { parent, writes } = self;
        for (key, value) in writes {
            match value {
                Some(value) => parent.set(&key, &value)?,
                None => parent.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl KvStore for CachedStore<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn prefix_iter(&self, prefix: &[u8]) -> StoreResult<KvPairs> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_iter(prefix)?.into_iter().collect();

        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}
