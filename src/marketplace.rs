// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Marketplace actions.
//!
//! [`Marketplace`] is the only writer of records and the index. Each action is
//! a short sequence of substrate calls that ends in an [`ActionOutcome`]; on
//! success the shared [`MarketView`] is reloaded from the substrate.
//!
//! ## Dual write
//!
//! Registering a listing writes the record first and the index second. The
//! two writes are not atomic: if the second fails the record is an orphan.
//! [`Marketplace::register`] may be repeated with the same record until it
//! succeeds; the record write replaces an identical value and the index append
//! ignores ids it already holds. Nothing here retries on its own.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::codec;
use crate::error::LedgerError;
use crate::storage::{
    new_record_id, KeyIndex, RecordStore, Right, RightStatus, SubstrateKeyIndex,
    TransientReadError,
};
use crate::substrate::{check_live, KvSubstrate};
use crate::view::MarketView;

/// Shown to the user when the substrate write was declined.
pub const REJECTED_MESSAGE: &str = "Transaction rejected by user";

/// Input for a new listing.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct NewListing {
    pub location: String,
    /// Volume in m³
    pub volume: f64,
    /// Price in ETH/m³
    pub price: f64,
}

impl NewListing {
    fn validate(&self) -> Result<(), LedgerError> {
        if self.location.trim().is_empty() {
            return Err(LedgerError::Invalid("location must not be empty".to_string()));
        }
        for (field, value) in [("volume", self.volume), ("price", self.price)] {
            if !value.is_finite() || value < 0.0 {
                return Err(LedgerError::Invalid(format!(
                    "{field} must be a finite non-negative number"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Success,
    Error,
}

/// User-facing result of a marketplace action.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionOutcome {
    pub status: ActionStatus,
    pub message: String,
    /// Error classification, present on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Record as written, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Right>,
    #[serde(skip)]
    pub error: Option<LedgerError>,
}

impl ActionOutcome {
    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Pending,
            message: message.into(),
            kind: None,
            right: None,
            error: None,
        }
    }

    pub fn success(message: impl Into<String>, right: Right) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
            kind: None,
            right: Some(right),
            error: None,
        }
    }

    /// Failed action. `prefix` is prepended to the error text unless the
    /// failure is a rejection, which always reads [`REJECTED_MESSAGE`].
    pub fn failure(prefix: &str, error: LedgerError) -> Self {
        let message = match &error {
            LedgerError::SignerRejected(_) => REJECTED_MESSAGE.to_string(),
            other => format!("{prefix}{other}"),
        };
        Self {
            status: ActionStatus::Error,
            message,
            kind: Some(error.kind().to_string()),
            right: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }

    /// The written record, or the error that stopped the action.
    pub fn into_result(self) -> Result<Right, LedgerError> {
        match (self.right, self.error) {
            (Some(right), None) => Ok(right),
            (_, Some(error)) => Err(error),
            (None, None) => Err(LedgerError::Invalid(format!(
                "action has not completed: {}",
                self.message
            ))),
        }
    }
}

pub struct Marketplace<S, I = SubstrateKeyIndex<S>> {
    substrate: Arc<S>,
    store: RecordStore<S>,
    index: I,
    view: Arc<MarketView>,
    call_timeout: Duration,
}

impl<S: KvSubstrate> Marketplace<S> {
    /// Marketplace over `substrate` with the index stored beside the records.
    pub fn new(substrate: Arc<S>, call_timeout: Duration, view: Arc<MarketView>) -> Self {
        let index = SubstrateKeyIndex::new(substrate.clone(), call_timeout);
        Self::with_index(substrate, call_timeout, index, view)
    }
}

impl<S: KvSubstrate, I: KeyIndex> Marketplace<S, I> {
    pub fn with_index(
        substrate: Arc<S>,
        call_timeout: Duration,
        index: I,
        view: Arc<MarketView>,
    ) -> Self {
        Self {
            store: RecordStore::new(substrate.clone(), call_timeout),
            substrate,
            index,
            view,
            call_timeout,
        }
    }

    pub fn substrate(&self) -> &Arc<S> {
        &self.substrate
    }

    pub fn view(&self) -> &Arc<MarketView> {
        &self.view
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Substrate liveness, bounded by the call timeout.
    pub async fn is_available(&self) -> bool {
        check_live(self.call_timeout, &*self.substrate).await
    }

    /// Reload every record into the view and return them, newest first.
    ///
    /// While the substrate is unavailable the view keeps its last record set
    /// and that stale set is returned.
    pub async fn refresh(&self) -> Vec<Right> {
        match self.store.try_load_all(&self.index).await {
            Some(rights) => {
                self.view.replace_rights(rights.clone());
                rights
            }
            None => {
                let cached = self.view.snapshot().rights;
                debug!(
                    cached = cached.len(),
                    "Substrate unavailable, keeping cached water rights"
                );
                cached
            }
        }
    }

    /// Read one record straight from the substrate. A malformed value is
    /// reported as not found; a failed read keeps its substrate error.
    pub async fn find(&self, id: &str) -> Result<Right, LedgerError> {
        match self.store.fetch(id).await {
            Ok(Some(right)) => Ok(right),
            Ok(None) => Err(LedgerError::NotFound(id.to_string())),
            Err(TransientReadError::Substrate(e)) => Err(e.into()),
            Err(TransientReadError::Malformed(e)) => {
                warn!(id, error = %e, "Water right value is unreadable");
                Err(LedgerError::NotFound(id.to_string()))
            }
        }
    }

    /// Write `right` and then add its id to the index.
    pub async fn register(&self, right: &Right) -> Result<(), LedgerError> {
        self.store.put(right).await?;
        if let Err(e) = self.index.append(&right.id).await {
            warn!(id = %right.id, error = %e, "Record written but not indexed");
            return Err(e);
        }
        Ok(())
    }

    /// Encode and register a new listing owned by `owner`.
    pub async fn create_listing(&self, owner: &str, listing: NewListing) -> ActionOutcome {
        const PREFIX: &str = "Submission failed: ";

        self.view
            .set_action(ActionOutcome::pending("Encoding water rights data"));

        let outcome = match self.try_create(owner, &listing).await {
            Ok(right) => {
                info!(id = %right.id, location = %right.location, "Water right listed");
                self.refresh().await;
                ActionOutcome::success("Water rights submitted", right)
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Listing failed");
                ActionOutcome::failure(PREFIX, e)
            }
        };
        self.view.set_action(outcome.clone());
        outcome
    }

    async fn try_create(&self, owner: &str, listing: &NewListing) -> Result<Right, LedgerError> {
        if owner.trim().is_empty() {
            return Err(LedgerError::Invalid("owner must not be empty".to_string()));
        }
        listing.validate()?;

        let now = Utc::now();
        let right = Right {
            id: new_record_id(now),
            encoded_volume: codec::encode(listing.volume),
            encoded_price: codec::encode(listing.price),
            timestamp: now.timestamp(),
            owner: owner.to_string(),
            location: listing.location.trim().to_string(),
            status: RightStatus::Available,
            new_owner: None,
        };
        self.register(&right).await?;
        Ok(right)
    }

    /// Mark listing `id` as traded to `buyer`.
    pub async fn trade(&self, id: &str, buyer: &str) -> ActionOutcome {
        const PREFIX: &str = "Trade failed: ";

        self.view
            .set_action(ActionOutcome::pending("Processing water rights trade"));

        let outcome = match self.try_trade(id, buyer).await {
            Ok(right) => {
                info!(id, buyer, "Water right traded");
                self.refresh().await;
                ActionOutcome::success("Water rights traded", right)
            }
            Err(e) => {
                warn!(id, error = %e, kind = e.kind(), "Trade failed");
                ActionOutcome::failure(PREFIX, e)
            }
        };
        self.view.set_action(outcome.clone());
        outcome
    }

    async fn try_trade(&self, id: &str, buyer: &str) -> Result<Right, LedgerError> {
        if buyer.trim().is_empty() {
            return Err(LedgerError::Invalid("buyer must not be empty".to_string()));
        }

        let current = self.find(id).await?;
        let traded = current.traded_to(buyer)?;
        self.store.put(&traded).await?;
        Ok(traded)
    }
}
