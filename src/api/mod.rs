// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    aggregate::{Counts, LocationTotal, MarketSummary, StatusFilter},
    marketplace::NewListing,
    models::{AttestationResponse, CreateRightRequest, RevealResponse, TradeRequest, WalletAddress},
    reveal::{AttestationParams, RevealPhase},
    state::AppState,
    storage::{Right, RightStatus},
};

pub mod health;
pub mod reveal;
pub mod rights;
pub mod stats;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/rights", get(rights::list_rights).post(rights::create_right))
        .route("/rights/{id}", get(rights::get_right))
        .route("/rights/{id}/trade", post(rights::trade_right))
        .route("/rights/{id}/reveal", post(reveal::reveal_right))
        .route("/stats", get(stats::get_stats))
        .route("/attestation", get(reveal::get_attestation));

    let health_routes = Router::new()
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness));

    Router::new()
        .nest("/v1", v1_routes)
        .nest("/health", health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        rights::list_rights,
        rights::create_right,
        rights::get_right,
        rights::trade_right,
        stats::get_stats,
        reveal::get_attestation,
        reveal::reveal_right
    ),
    components(
        schemas(
            Right,
            RightStatus,
            StatusFilter,
            WalletAddress,
            CreateRightRequest,
            TradeRequest,
            NewListing,
            Counts,
            LocationTotal,
            MarketSummary,
            AttestationParams,
            AttestationResponse,
            RevealPhase,
            RevealResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Rights", description = "Listing and trading water rights"),
        (name = "Stats", description = "Marketplace statistics"),
        (name = "Reveal", description = "Attested reveal of encoded values")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::memory_state;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _) = memory_state();
        let _ = router(state).into_make_service();
    }

    #[tokio::test]
    async fn listing_lifecycle_over_http() {
        let (state, _) = memory_state();
        let app = router(state);

        let (status, created) = send(
            app.clone(),
            post_json(
                "/v1/rights",
                json!({"owner": "0xabc", "location": "Basin A", "volume": 100, "price": 0.01}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "available");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, listed) = send(app.clone(), get("/v1/rights?search=basin&status=available")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(
            app.clone(),
            post_json(&format!("/v1/rights/{id}/trade"), json!({"buyer": "0xdef"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app.clone(),
            post_json(&format!("/v1/rights/{id}/trade"), json!({"buyer": "0xdef"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already been traded"));

        let (status, stats) = send(app.clone(), get("/v1/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["counts"]["traded"], 1);
        assert_eq!(stats["total_available_volume"], 0.0);

        let (status, revealed) = send(app, post_json(&format!("/v1/rights/{id}/reveal"), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(revealed["volume"], 100.0);
    }

    #[tokio::test]
    async fn errors_are_json_with_documented_codes() {
        let (state, substrate) = memory_state();
        let app = router(state);

        let (status, body) = send(app.clone(), get("/v1/rights/water-0-none")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        substrate.fail_writes(Some("execution reverted"));
        let (status, _) = send(
            app.clone(),
            post_json(
                "/v1/rights",
                json!({"owner": "0xabc", "location": "Basin A", "volume": 1, "price": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        substrate.set_available(false);
        let (status, _) = send(app.clone(), get("/health/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, listed) = send(app, get("/v1/rights")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (state, _) = memory_state();
        let (status, doc) = send(router(state), get("/api-doc/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/v1/rights/{id}/reveal"].is_object());
    }
}
