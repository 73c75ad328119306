// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Records themselves are
//! served as [`Right`](crate::storage::Right) with volume and price still
//! encoded; decoded values only ever appear in a [`RevealResponse`].
//!
//! ## Model Categories
//!
//! - **Listings**: creating and trading water rights
//! - **Reveal**: attestation parameters and revealed values

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::marketplace::NewListing;
use crate::reveal::{AttestationParams, RevealPhase, RevealSession};

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible account address.
///
/// Format: `0x` followed by 40 hexadecimal characters (20 bytes). The ledger
/// stores it verbatim as owner or buyer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

// =============================================================================
// Listing Models
// =============================================================================

/// Request to list a new water right.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRightRequest {
    /// Lister; becomes the record owner.
    pub owner: WalletAddress,
    /// Free-text location, e.g. "Colorado River Basin".
    pub location: String,
    /// Volume in m³.
    pub volume: f64,
    /// Price in ETH/m³.
    pub price: f64,
}

impl CreateRightRequest {
    pub fn listing(&self) -> NewListing {
        NewListing {
            location: self.location.clone(),
            volume: self.volume,
            price: self.price,
        }
    }
}

/// Request to buy an available water right.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TradeRequest {
    pub buyer: WalletAddress,
}

// =============================================================================
// Reveal Models
// =============================================================================

/// Attestation a reveal request will ask the signer to sign.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttestationResponse {
    /// Exact message text, five `key:value` lines.
    pub message: String,
    pub params: AttestationParams,
    /// Unix seconds after which the signer refuses this attestation.
    pub expires_at: i64,
}

impl From<&AttestationParams> for AttestationResponse {
    fn from(params: &AttestationParams) -> Self {
        Self {
            message: params.message(),
            params: params.clone(),
            expires_at: params.expires_at(),
        }
    }
}

/// Decoded values of one listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealResponse {
    pub id: String,
    /// Volume in m³.
    pub volume: f64,
    /// Price in ETH/m³.
    pub price: f64,
    /// Signature over the attestation message.
    pub signature: String,
    /// Phases the request went through.
    pub phases: Vec<RevealPhase>,
}

impl RevealResponse {
    /// Build from a finished session, if it reached `Revealed`.
    pub fn from_session(id: impl Into<String>, session: &RevealSession) -> Option<Self> {
        let values = session.values()?;
        Some(Self {
            id: id.into(),
            volume: values.volume,
            price: values.price,
            signature: values.signature.clone(),
            phases: session.history().to_vec(),
        })
    }
}
