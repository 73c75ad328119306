// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    aggregate::{self, StatusFilter},
    error::ApiError,
    models::{CreateRightRequest, TradeRequest},
    state::AppState,
    storage::Right,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RightsQuery {
    /// Case-insensitive substring of location or id.
    pub search: Option<String>,
    /// all, available or traded.
    pub status: Option<StatusFilter>,
}

#[utoipa::path(
    get,
    path = "/v1/rights",
    params(RightsQuery),
    tag = "Rights",
    responses((status = 200, body = [Right]))
)]
pub async fn list_rights(
    State(state): State<AppState>,
    Query(query): Query<RightsQuery>,
) -> Json<Vec<Right>> {
    let rights = state.market.refresh().await;
    let term = query.search.unwrap_or_default();
    Json(aggregate::search(
        &rights,
        &term,
        query.status.unwrap_or_default(),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/rights",
    request_body = CreateRightRequest,
    tag = "Rights",
    responses(
        (status = 201, body = Right),
        (status = 400, description = "Invalid listing"),
        (status = 403, description = "Write rejected by signer")
    )
)]
pub async fn create_right(
    State(state): State<AppState>,
    Json(request): Json<CreateRightRequest>,
) -> Result<(StatusCode, Json<Right>), ApiError> {
    let right = state
        .market
        .create_listing(request.owner.as_str(), request.listing())
        .await
        .into_result()?;
    Ok((StatusCode::CREATED, Json(right)))
}

#[utoipa::path(
    get,
    path = "/v1/rights/{id}",
    params(
        ("id" = String, Path, description = "Water right identifier")
    ),
    tag = "Rights",
    responses(
        (status = 200, body = Right),
        (status = 404, description = "No such water right")
    )
)]
pub async fn get_right(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Right>, ApiError> {
    Ok(Json(state.market.find(&id).await?))
}

#[utoipa::path(
    post,
    path = "/v1/rights/{id}/trade",
    params(
        ("id" = String, Path, description = "Water right identifier")
    ),
    request_body = TradeRequest,
    tag = "Rights",
    responses(
        (status = 200, body = Right),
        (status = 404, description = "No such water right"),
        (status = 409, description = "Already traded")
    )
)]
pub async fn trade_right(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<TradeRequest>,
) -> Result<Json<Right>, ApiError> {
    let right = state
        .market
        .trade(&id, request.buyer.as_str())
        .await
        .into_result()?;
    Ok(Json(right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WalletAddress;
    use crate::state::test_support::memory_state;
    use crate::storage::RightStatus;

    fn basin(location: &str) -> CreateRightRequest {
        CreateRightRequest {
            owner: WalletAddress::from("0x1111111111111111111111111111111111111111"),
            location: location.into(),
            volume: 100.0,
            price: 0.01,
        }
    }

    #[tokio::test]
    async fn create_get_and_trade() {
        let (state, _) = memory_state();

        let (status, Json(created)) = create_right(State(state.clone()), Json(basin("Basin A")))
            .await
            .expect("listing succeeds");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.status, RightStatus::Available);
        assert_eq!(created.encoded_volume, "FHE-MTAw");

        let Json(fetched) = get_right(Path(created.id.clone()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(fetched, created);

        let buyer = TradeRequest {
            buyer: WalletAddress::from("0x2222222222222222222222222222222222222222"),
        };
        let Json(traded) = trade_right(
            Path(created.id.clone()),
            State(state.clone()),
            Json(buyer.clone()),
        )
        .await
        .unwrap();
        assert_eq!(traded.status, RightStatus::Traded);

        let err = trade_right(Path(created.id), State(state), Json(buyer))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn list_applies_search_and_status() {
        let (state, _) = memory_state();
        for location in ["Colorado River Basin", "Basin A", "Snake River"] {
            create_right(State(state.clone()), Json(basin(location)))
                .await
                .unwrap();
        }

        let Json(all) = list_rights(State(state.clone()), Query(RightsQuery::default())).await;
        assert_eq!(all.len(), 3);

        let query = RightsQuery {
            search: Some("river".into()),
            status: Some(StatusFilter::Available),
        };
        let Json(rivers) = list_rights(State(state.clone()), Query(query)).await;
        assert_eq!(rivers.len(), 2);

        let query = RightsQuery {
            search: None,
            status: Some(StatusFilter::Traded),
        };
        let Json(traded) = list_rights(State(state), Query(query)).await;
        assert!(traded.is_empty());
    }

    #[tokio::test]
    async fn list_serves_cached_rights_during_an_outage() {
        let (state, substrate) = memory_state();
        create_right(State(state.clone()), Json(basin("Basin A")))
            .await
            .unwrap();

        substrate.set_available(false);
        let Json(listed) = list_rights(State(state), Query(RightsQuery::default())).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].location, "Basin A");
    }

    #[tokio::test]
    async fn failures_map_to_status_codes() {
        let (state, substrate) = memory_state();

        let err = get_right(Path("water-0-none".into()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = create_right(State(state.clone()), Json(basin("")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        substrate.reject_writes(Some("user rejected transaction"));
        let err = create_right(State(state.clone()), Json(basin("Basin A")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "Transaction rejected by user");

        substrate.reject_writes(None);
        substrate.set_available(false);
        let err = create_right(State(state), Json(basin("Basin A")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
