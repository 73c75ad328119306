// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{
    error::ApiError,
    models::{AttestationResponse, RevealResponse},
    state::AppState,
};

/// Attestation the next reveal request will sign.
#[utoipa::path(
    get,
    path = "/v1/attestation",
    tag = "Reveal",
    responses((status = 200, body = AttestationResponse))
)]
pub async fn get_attestation(State(state): State<AppState>) -> Json<AttestationResponse> {
    Json(AttestationResponse::from(&state.attestation()))
}

/// Sign an attestation and return the listing's decoded volume and price.
///
/// Values are computed per request and never stored.
#[utoipa::path(
    post,
    path = "/v1/rights/{id}/reveal",
    params(
        ("id" = String, Path, description = "Water right identifier")
    ),
    tag = "Reveal",
    responses(
        (status = 200, body = RevealResponse),
        (status = 403, description = "Signer rejected the attestation"),
        (status = 404, description = "No such water right"),
        (status = 422, description = "Stored values could not be decoded"),
        (status = 504, description = "Signer did not respond in time")
    )
)]
pub async fn reveal_right(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RevealResponse>, ApiError> {
    let right = state.market.find(&id).await?;
    let session = state
        .reveal_protocol()
        .reveal(&right.encoded_volume, &right.encoded_price)
        .await;

    if let Some(failure) = session.failure() {
        return Err(failure.clone().into());
    }

    let response = RevealResponse::from_session(&right.id, &session).ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Reveal finished without values",
        )
    })?;
    info!(id = %right.id, "Water right values revealed");
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::config::DEFAULT_CHAIN_ID;
    use crate::reveal::{AttestationParams, RevealPhase};
    use crate::state::test_support::memory_state;
    use crate::storage::{Right, RightStatus};

    async fn seed(state: &AppState, id: &str, volume: &str) {
        let right = Right {
            id: id.into(),
            encoded_volume: volume.into(),
            encoded_price: codec::encode(0.01),
            timestamp: 1,
            owner: "0xowner".into(),
            location: "Basin A".into(),
            status: RightStatus::Available,
            new_owner: None,
        };
        state.market.register(&right).await.unwrap();
    }

    #[tokio::test]
    async fn attestation_uses_signer_key_and_chain() {
        let (state, _) = memory_state();
        let Json(body) = get_attestation(State(state.clone())).await;
        assert_eq!(body.params.public_key, state.signer.public_key_hex());
        assert_eq!(body.params.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(AttestationParams::parse(&body.message), Some(body.params));
    }

    #[tokio::test]
    async fn reveal_returns_decoded_values() {
        let (state, _) = memory_state();
        seed(&state, "water-1-aaaa", &codec::encode(100.0)).await;

        let Json(body) = reveal_right(Path("water-1-aaaa".into()), State(state))
            .await
            .unwrap();
        assert_eq!(body.volume, 100.0);
        assert_eq!(body.price, 0.01);
        assert!(body.signature.starts_with("0x"));
        assert_eq!(
            body.phases,
            vec![
                RevealPhase::Idle,
                RevealPhase::AwaitingSignature,
                RevealPhase::Decrypting,
                RevealPhase::Revealed
            ]
        );
    }

    #[tokio::test]
    async fn signer_on_other_chain_rejects() {
        let (mut state, _) = memory_state();
        seed(&state, "water-1-aaaa", &codec::encode(100.0)).await;
        state.reveal.chain_id = 1;

        let err = reveal_right(Path("water-1-aaaa".into()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn undecodable_or_missing_records_fail() {
        let (state, _) = memory_state();
        seed(&state, "water-2-bbbb", "FHE-@@@").await;

        let err = reveal_right(Path("water-2-bbbb".into()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let err = reveal_right(Path("water-9-none".into()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
