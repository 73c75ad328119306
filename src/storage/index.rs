// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record id index.
//!
//! The index is the only way to enumerate records: a JSON array of ids stored
//! under [`INDEX_KEY`]. It is maintained by read-modify-write of the whole
//! array, so two clients appending at the same time race and the last writer
//! wins. A lost append leaves an orphan record, which readers never see.
//!
//! Callers depend on the [`KeyIndex`] trait only, so a transactional index
//! (or one derived from a write log) can replace [`SubstrateKeyIndex`]
//! without touching them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::keys::INDEX_KEY;
use crate::error::LedgerError;
use crate::substrate::{bounded, check_live, KvSubstrate};

/// Ordered set of every record id.
pub trait KeyIndex: Send + Sync {
    /// Current ids, oldest first. Never fails: an unreadable index is empty.
    fn load(&self) -> impl Future<Output = Vec<String>> + Send;

    /// Current ids for a caller that has already checked the substrate is
    /// available. Same result as [`KeyIndex::load`] without checking again.
    fn load_unchecked(&self) -> impl Future<Output = Vec<String>> + Send {
        self.load()
    }

    /// Register an id. Appending an id that is already present is a no-op,
    /// so callers may repeat a registration that might not have landed.
    fn append(&self, id: &str) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// Parse the serialized index. Empty or blank input is an empty index.
pub fn parse_index(bytes: &[u8]) -> Result<Vec<String>, serde_json::Error> {
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text)
}

/// Index stored as a single value on the substrate.
pub struct SubstrateKeyIndex<S> {
    substrate: Arc<S>,
    call_timeout: Duration,
}

impl<S: KvSubstrate> SubstrateKeyIndex<S> {
    pub fn new(substrate: Arc<S>, call_timeout: Duration) -> Self {
        Self {
            substrate,
            call_timeout,
        }
    }

    async fn read_ids(&self) -> Vec<String> {
        if !check_live(self.call_timeout, &*self.substrate).await {
            debug!("Substrate unavailable, index treated as empty");
            return Vec::new();
        }
        self.read_index().await
    }

    async fn read_index(&self) -> Vec<String> {
        let bytes = match bounded(self.call_timeout, self.substrate.get_data(INDEX_KEY)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = INDEX_KEY, error = %e, "Failed to read record index");
                return Vec::new();
            }
        };

        match parse_index(&bytes) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(key = INDEX_KEY, error = %e, "Error parsing record index, treating as empty");
                Vec::new()
            }
        }
    }
}

impl<S: KvSubstrate> KeyIndex for SubstrateKeyIndex<S> {
    async fn load(&self) -> Vec<String> {
        self.read_ids().await
    }

    async fn load_unchecked(&self) -> Vec<String> {
        self.read_index().await
    }

    async fn append(&self, id: &str) -> Result<(), LedgerError> {
        let mut ids = self.read_ids().await;
        if ids.iter().any(|existing| existing == id) {
            debug!(id, "Id already indexed");
            return Ok(());
        }
        ids.push(id.to_string());

        let bytes = serde_json::to_vec(&ids)?;
        bounded(self.call_timeout, self.substrate.set_data(INDEX_KEY, bytes)).await?;
        debug!(id, total = ids.len(), "Id appended to record index");
        Ok(())
    }
}
