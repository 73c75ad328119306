// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{aggregate::MarketSummary, state::AppState};

/// Dashboard statistics over a fresh load of every record.
#[utoipa::path(
    get,
    path = "/v1/stats",
    tag = "Stats",
    responses((status = 200, body = MarketSummary))
)]
pub async fn get_stats(State(state): State<AppState>) -> Json<MarketSummary> {
    state.market.refresh().await;
    Json(state.view().summary())
}
