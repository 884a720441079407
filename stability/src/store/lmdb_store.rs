// Copyright (c) 2024 Botho Foundation

//! LMDB-backed durable store.

use lmdb::{Cursor, Database, DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use std::{fs, path::Path};
use tracing::{debug, info};

use super::{KvPairs, KvStore, StoreError, StoreResult};

/// Default LMDB map size (1GB).
pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;

/// Every write is its own LMDB transaction; atomicity across a message comes
/// from wrapping this store in a [`super::CachedStore`].
pub struct LmdbStore {
    env: Environment,
    /// state: raw key -> bincode value
    state_db: Database,
}

impl LmdbStore {
    /// Open or create a store under `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with_map_size(path, DEFAULT_MAP_SIZE)
    }

    pub fn open_with_map_size(path: &Path, map_size: usize) -> StoreResult<Self> {
        fs::create_dir_all(path)
            .map_err(|e| StoreError::Database(format!("create {}: {e}", path.display())))?;

        let env = Environment::new()
            .set_flags(EnvironmentFlags::NO_SUB_DIR)
            .set_max_dbs(1)
            .set_map_size(map_size)
            .open(&path.join("stability.mdb"))?;

        let state_db = env.create_db(Some("state"), DatabaseFlags::empty())?;
        info!(path = %path.display(), "Opened stability store");

        Ok(Self { env, state_db })
    }
}

impl KvStore for LmdbStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if key.is_empty() {
            return Ok(None);
        }
        let txn = self.env.begin_ro_txn()?;
        match txn.get(self.state_db, &key) {
            Ok(bytes) => Ok(Some(bytes.to_vec())),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.state_db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Ok(());
        }
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.state_db, &key, None) {
            Ok(()) | Err(lmdb::Error::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        txn.commit()?;
        Ok(())
    }

    fn prefix_iter(&self, prefix: &[u8]) -> StoreResult<KvPairs> {
        let txn = self.env.begin_ro_txn()?;
        let mut cursor = txn.open_ro_cursor(self.state_db)?;

        let iter = if prefix.is_empty() {
            cursor.iter_start()
        } else {
            cursor.iter_from(prefix)
        };

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }

        drop(cursor);
        drop(txn);

        debug!(count = entries.len(), "Prefix scan");
        Ok(entries)
    }
}
