// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process substrate for tests and local development.
//!
//! Besides plain storage it can simulate the failure modes of a remote
//! service: an unavailable node, a liveness check that never answers, writes
//! rejected by the signer, writes that fail outright, and keys whose reads
//! error.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{KvSubstrate, SubstrateError, SubstrateResult};

#[derive(Default)]
struct Faults {
    reject_writes: Option<String>,
    fail_writes: Option<String>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
    liveness_stall: Option<Duration>,
}

/// Key-value substrate held in memory.
pub struct MemorySubstrate {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    available: AtomicBool,
    faults: Mutex<Faults>,
}

impl Default for MemorySubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySubstrate {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Toggle the liveness probe.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Hold every liveness check for `stall` before it answers.
    pub fn stall_liveness(&self, stall: Option<Duration>) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.liveness_stall = stall;
        }
    }

    /// Make every subsequent write fail as rejected by the signer.
    pub fn reject_writes(&self, reason: Option<&str>) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.reject_writes = reason.map(str::to_string);
        }
    }

    /// Make every subsequent write fail with a generic error.
    pub fn fail_writes(&self, reason: Option<&str>) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.fail_writes = reason.map(str::to_string);
        }
    }

    /// Make reads of `key` fail.
    pub fn fail_reads_for(&self, key: &str) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failing_reads.insert(key.to_string());
        }
    }

    /// Make writes of `key` fail with a generic error.
    pub fn fail_writes_for(&self, key: &str) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failing_writes.insert(key.to_string());
        }
    }

    /// Drop every injected fault.
    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            *faults = Faults::default();
        }
    }

    /// Store bytes directly, bypassing fault injection.
    pub fn insert_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.into());
        }
    }

    /// Raw bytes under `key`, if any.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn lock_poisoned() -> SubstrateError {
        SubstrateError::Unavailable("memory substrate lock poisoned".to_string())
    }
}

impl KvSubstrate for MemorySubstrate {
    async fn is_available(&self) -> bool {
        let stall = self.faults.lock().ok().and_then(|faults| faults.liveness_stall);
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        self.available.load(Ordering::SeqCst)
    }

    async fn get_data(&self, key: &str) -> SubstrateResult<Vec<u8>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(SubstrateError::Unavailable("node offline".to_string()));
        }

        let failing = self
            .faults
            .lock()
            .map_err(|_| Self::lock_poisoned())?
            .failing_reads
            .contains(key);
        if failing {
            return Err(SubstrateError::ReadFailed(format!("read of {key} failed")));
        }

        let entries = self.entries.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(entries.get(key).cloned().unwrap_or_default())
    }

    async fn set_data(&self, key: &str, value: Vec<u8>) -> SubstrateResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(SubstrateError::Unavailable("node offline".to_string()));
        }

        {
            let faults = self.faults.lock().map_err(|_| Self::lock_poisoned())?;
            if let Some(reason) = &faults.reject_writes {
                return Err(SubstrateError::Rejected(reason.clone()));
            }
            if let Some(reason) = &faults.fail_writes {
                return Err(SubstrateError::WriteFailed(reason.clone()));
            }
            if faults.failing_writes.contains(key) {
                return Err(SubstrateError::WriteFailed(format!("write of {key} failed")));
            }
        }

        let mut entries = self.entries.lock().map_err(|_| Self::lock_poisoned())?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
