// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Water right records on the substrate.
//!
//! ## Value Layout
//!
//! Each record is a JSON object stored under `water_right_{id}`:
//!
//! ```text
//! {
//!   "volume": "FHE-MTAw",      # encoded
//!   "price": "FHE-MC4wMQ==",   # encoded
//!   "timestamp": 1700000000,   # seconds
//!   "owner": "0xabc...",
//!   "location": "Basin A",
//!   "status": "available",     # or "traded"
//!   "newOwner": "0xdef..."     # only once traded
//! }
//! ```
//!
//! The store has no knowledge of the index: creating a record and registering
//! its id are separate steps owned by the marketplace.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::index::KeyIndex;
use super::keys::record_key;
use crate::codec::{self, DecodeError};
use crate::error::LedgerError;
use crate::substrate::{bounded, check_live, KvSubstrate, SubstrateError};

/// Listing status.
///
/// Status only moves forward: `available → traded`. A "pending" review state
/// is reserved for a future listing-review step and is deliberately not a
/// variant; stored values carrying it fail to parse and the record is skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RightStatus {
    /// Listed and open for trade
    #[default]
    Available,
    /// Sold; terminal
    Traded,
}

impl RightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RightStatus::Available => "available",
            RightStatus::Traded => "traded",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: RightStatus) -> bool {
        matches!(
            (self, next),
            (RightStatus::Available, RightStatus::Traded)
        )
    }
}

impl std::fmt::Display for RightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized shape of a record value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredRight {
    pub volume: String,
    pub price: String,
    pub timestamp: i64,
    pub owner: String,
    pub location: String,
    #[serde(default)]
    pub status: RightStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_owner: Option<String>,
}

/// A water right listing with its sensitive fields still encoded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Right {
    /// Unique identifier, fixed at creation
    pub id: String,
    /// Encoded volume (m³)
    pub encoded_volume: String,
    /// Encoded price (ETH/m³)
    pub encoded_price: String,
    /// Creation time, seconds since epoch
    pub timestamp: i64,
    /// Original lister
    pub owner: String,
    /// Free-text grouping key
    pub location: String,
    /// Current status
    pub status: RightStatus,
    /// Buyer, once traded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_owner: Option<String>,
}

impl Right {
    pub fn from_stored(id: impl Into<String>, stored: StoredRight) -> Self {
        Self {
            id: id.into(),
            encoded_volume: stored.volume,
            encoded_price: stored.price,
            timestamp: stored.timestamp,
            owner: stored.owner,
            location: stored.location,
            status: stored.status,
            new_owner: stored.new_owner,
        }
    }

    pub fn to_stored(&self) -> StoredRight {
        StoredRight {
            volume: self.encoded_volume.clone(),
            price: self.encoded_price.clone(),
            timestamp: self.timestamp,
            owner: self.owner.clone(),
            location: self.location.clone(),
            status: self.status,
            new_owner: self.new_owner.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == RightStatus::Available
    }

    /// Decoded volume.
    pub fn volume(&self) -> Result<f64, DecodeError> {
        codec::decode(&self.encoded_volume)
    }

    /// Decoded price.
    pub fn price(&self) -> Result<f64, DecodeError> {
        codec::decode(&self.encoded_price)
    }

    /// Copy of this record marked as traded to `buyer`.
    pub fn traded_to(&self, buyer: impl Into<String>) -> Result<Self, LedgerError> {
        if !self.status.can_transition_to(RightStatus::Traded) {
            return Err(LedgerError::AlreadyTraded(self.id.clone()));
        }
        Ok(Self {
            status: RightStatus::Traded,
            new_owner: Some(buyer.into()),
            ..self.clone()
        })
    }
}

/// Why a single record could not be read. Never surfaced past the store.
#[derive(Debug, thiserror::Error)]
pub enum TransientReadError {
    #[error("substrate read failed: {0}")]
    Substrate(#[from] SubstrateError),

    #[error("malformed record value: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Typed access to records on the substrate.
pub struct RecordStore<S> {
    substrate: Arc<S>,
    call_timeout: Duration,
}

impl<S: KvSubstrate> RecordStore<S> {
    pub fn new(substrate: Arc<S>, call_timeout: Duration) -> Self {
        Self {
            substrate,
            call_timeout,
        }
    }

    /// Read one record, reporting why it could not be read.
    pub async fn fetch(&self, id: &str) -> Result<Option<Right>, TransientReadError> {
        let bytes = bounded(self.call_timeout, self.substrate.get_data(&record_key(id))).await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let stored: StoredRight = serde_json::from_slice(&bytes)?;
        Ok(Some(Right::from_stored(id, stored)))
    }

    /// Read one record. Absent, unreadable and malformed values are all `None`.
    pub async fn get(&self, id: &str) -> Option<Right> {
        match self.fetch(id).await {
            Ok(right) => {
                if right.is_none() {
                    debug!(id, "Water right not present on substrate");
                }
                right
            }
            Err(e) => {
                warn!(id, error = %e, "Skipping unreadable water right");
                None
            }
        }
    }

    /// Write a record, replacing any previous value under its key.
    pub async fn put(&self, right: &Right) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec(&right.to_stored())?;
        bounded(
            self.call_timeout,
            self.substrate.set_data(&record_key(&right.id), bytes),
        )
        .await?;
        debug!(id = %right.id, status = %right.status, "Water right written");
        Ok(())
    }

    /// Every indexed record, newest first.
    ///
    /// Dangling ids and corrupt values are skipped; records missing from the
    /// index are never seen. An unavailable substrate yields an empty list.
    pub async fn load_all<I: KeyIndex>(&self, index: &I) -> Vec<Right> {
        self.try_load_all(index).await.unwrap_or_default()
    }

    /// Like [`RecordStore::load_all`], but `None` when the substrate did not
    /// pass its liveness check, so callers can keep what they already hold.
    pub async fn try_load_all<I: KeyIndex>(&self, index: &I) -> Option<Vec<Right>> {
        if !check_live(self.call_timeout, &*self.substrate).await {
            debug!("Substrate unavailable, no water rights loaded");
            return None;
        }

        let ids = index.load_unchecked().await;
        let mut rights = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(right) = self.get(id).await {
                rights.push(right);
            }
        }

        if rights.len() < ids.len() {
            debug!(
                indexed = ids.len(),
                loaded = rights.len(),
                "Some indexed water rights were skipped"
            );
        }

        rights.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Some(rights)
    }
}
