// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Remote Key-Value Substrate
//!
//! The ledger persists everything through a remote key-value service that it
//! consumes but does not own. The substrate's consensus and durability are
//! its own business; the ledger only relies on the three operations of
//! [`KvSubstrate`].
//!
//! ## Backends
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`MemorySubstrate`] | Tests and local development |
//! | [`RedbSubstrate`] | Single-node persistence in an embedded redb file |
//! | [`ContractSubstrate`] | EVM key-value contract reached over JSON-RPC |
//!
//! [`Backend`] dispatches over all three so the service can pick one at
//! startup.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

pub mod contract;
pub mod embedded;
pub mod memory;

pub use contract::ContractSubstrate;
pub use embedded::RedbSubstrate;
pub use memory::MemorySubstrate;

/// Errors returned by a substrate backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubstrateError {
    #[error("substrate unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("substrate call timed out after {0:?}")]
    Timeout(Duration),
}

pub type SubstrateResult<T> = Result<T, SubstrateError>;

/// Remote key-value service consumed by the ledger.
///
/// Absent keys read back as empty bytes. Writes replace the whole value.
pub trait KvSubstrate: Send + Sync {
    /// Liveness probe. When false, readers treat the store as empty.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Read a value; empty for an absent key.
    fn get_data(&self, key: &str) -> impl Future<Output = SubstrateResult<Vec<u8>>> + Send;

    /// Write a value. Returns once the substrate has confirmed the write.
    fn set_data(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> impl Future<Output = SubstrateResult<()>> + Send;
}

/// Run a substrate call with an upper bound on how long it may suspend.
pub async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = SubstrateResult<T>>,
) -> SubstrateResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SubstrateError::Timeout(limit)),
    }
}

/// Liveness check with the same bound as every other call. A node that does
/// not answer within `limit` counts as unavailable.
pub async fn check_live<S: KvSubstrate>(limit: Duration, substrate: &S) -> bool {
    match tokio::time::timeout(limit, substrate.is_available()).await {
        Ok(available) => available,
        Err(_) => {
            warn!(timeout = ?limit, "Substrate liveness check timed out");
            false
        }
    }
}

/// Substrate chosen at startup.
pub enum Backend {
    /// Shared so tests and tooling can reach the fault switches
    Memory(Arc<MemorySubstrate>),
    Redb(RedbSubstrate),
    Contract(ContractSubstrate),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Memory(_) => "memory",
            Backend::Redb(_) => "redb",
            Backend::Contract(_) => "contract",
        }
    }
}

impl KvSubstrate for Backend {
    async fn is_available(&self) -> bool {
        match self {
            Backend::Memory(s) => s.is_available().await,
            Backend::Redb(s) => s.is_available().await,
            Backend::Contract(s) => s.is_available().await,
        }
    }

    async fn get_data(&self, key: &str) -> SubstrateResult<Vec<u8>> {
        match self {
            Backend::Memory(s) => s.get_data(key).await,
            Backend::Redb(s) => s.get_data(key).await,
            Backend::Contract(s) => s.get_data(key).await,
        }
    }

    async fn set_data(&self, key: &str, value: Vec<u8>) -> SubstrateResult<()> {
        match self {
            Backend::Memory(s) => s.set_data(key, value).await,
            Backend::Redb(s) => s.set_data(key, value).await,
            Backend::Contract(s) => s.set_data(key, value).await,
        }
    }
}

impl<S: KvSubstrate> KvSubstrate for Arc<S> {
    fn is_available(&self) -> impl Future<Output = bool> + Send {
        (**self).is_available()
    }

    fn get_data(&self, key: &str) -> impl Future<Output = SubstrateResult<Vec<u8>>> + Send {
        (**self).get_data(key)
    }

    fn set_data(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> impl Future<Output = SubstrateResult<()>> + Send {
        (**self).set_data(key, value)
    }
}
