// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded substrate backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `ledger_kv`: key → raw value bytes
//!
//! Every `set_data` is its own committed write transaction, so a reader never
//! observes a partially written value. Transactions run on tokio's blocking
//! pool; redb I/O and commits are synchronous.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{KvSubstrate, SubstrateError, SubstrateResult};

/// Single table holding every ledger key.
const LEDGER_KV: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger_kv");

#[derive(Debug, thiserror::Error)]
pub enum RedbSubstrateError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),
}

/// Substrate stored in a local redb file.
#[derive(Clone)]
pub struct RedbSubstrate {
    db: Arc<Database>,
}

impl RedbSubstrate {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, RedbSubstrateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so read transactions don't fail on a fresh file
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LEDGER_KV)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, RedbSubstrateError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LEDGER_KV)?;
        Ok(table
            .get(key)?
            .map(|value| value.value().to_vec())
            .unwrap_or_default())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), RedbSubstrateError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LEDGER_KV)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl KvSubstrate for RedbSubstrate {
    async fn is_available(&self) -> bool {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.begin_read().is_ok())
            .await
            .unwrap_or(false)
    }

    async fn get_data(&self, key: &str) -> SubstrateResult<Vec<u8>> {
        let this = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || this.read(&key))
            .await
            .map_err(|e| SubstrateError::ReadFailed(e.to_string()))?
            .map_err(|e| SubstrateError::ReadFailed(e.to_string()))
    }

    async fn set_data(&self, key: &str, value: Vec<u8>) -> SubstrateResult<()> {
        let this = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || this.write(&key, &value))
            .await
            .map_err(|e| SubstrateError::WriteFailed(e.to_string()))?
            .map_err(|e| SubstrateError::WriteFailed(e.to_string()))
    }
}
