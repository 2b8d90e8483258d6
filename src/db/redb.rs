// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable store backed by redb.
//!
//! Every set or delete runs in its own write transaction, so a change is
//! visible to readers only once it has been committed to disk.

use super::{KeyValueStore, StoreError};
use redb::{Database, TableDefinition};
use std::path::Path;

const STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("state");

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`.
    ///
    /// A file that exists but is not a redb database is an error rather than
    /// being silently replaced.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path).map_err(|e| StoreError::Database(e.to_string()))?;

        // Create the table up front so reads never see a missing table.
        let txn = db.begin_write().map_err(|e| StoreError::Database(e.to_string()))?;
        {
            let _table = txn
                .open_table(STATE)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(path = %path.display(), "State database opened");

        Ok(Self { db })
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let table = txn
            .open_table(STATE)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match table.get(key) {
            Ok(Some(value)) => Ok(Some(value.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        {
            let mut table = txn
                .open_table(STATE)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        {
            let mut table = txn
                .open_table(STATE)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Database(e.to_string()))
    }
}
