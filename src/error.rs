// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::reveal::RevealFailure;
use crate::substrate::SubstrateError;

/// Failures of a ledger action (create, trade, reveal).
///
/// Read-path problems (unreadable index, corrupt record, undecodable field)
/// are not represented here: they are logged and the entry is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Substrate unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    SignerRejected(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Water right not found: {0}")]
    NotFound(String),

    #[error("Water right {0} has already been traded")]
    AlreadyTraded(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Short machine-readable classification.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Unavailable(_) => "substrate_unavailable",
            LedgerError::SignerRejected(_) => "signer_rejected",
            LedgerError::WriteFailed(_) => "write_failed",
            LedgerError::Timeout(_) => "timeout",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::AlreadyTraded(_) => "already_traded",
            LedgerError::Invalid(_) => "invalid",
            LedgerError::Serialization(_) => "serialization",
        }
    }
}

impl From<SubstrateError> for LedgerError {
    fn from(e: SubstrateError) -> Self {
        match e {
            SubstrateError::Unavailable(msg) | SubstrateError::ReadFailed(msg) => {
                LedgerError::Unavailable(msg)
            }
            SubstrateError::Rejected(_) => {
                LedgerError::SignerRejected("Transaction rejected by user".to_string())
            }
            SubstrateError::WriteFailed(msg) => LedgerError::WriteFailed(msg),
            SubstrateError::Timeout(limit) => {
                LedgerError::Timeout(format!("substrate call exceeded {limit:?}"))
            }
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let status = match &e {
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Invalid(_) => StatusCode::BAD_REQUEST,
            LedgerError::AlreadyTraded(_) => StatusCode::CONFLICT,
            LedgerError::SignerRejected(_) => StatusCode::FORBIDDEN,
            LedgerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::WriteFailed(_) => StatusCode::BAD_GATEWAY,
            LedgerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            LedgerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<RevealFailure> for ApiError {
    fn from(e: RevealFailure) -> Self {
        let status = match &e {
            RevealFailure::SignerRejected(_) => StatusCode::FORBIDDEN,
            RevealFailure::SignerError(_) => StatusCode::BAD_GATEWAY,
            RevealFailure::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RevealFailure::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
