/*
 * This file is part of the Obvia ERP.
 *
 * Copyright (C) 2025 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use crate::common::DefaultAppState;
use crate::common::dto::OkResponse;
use crate::manager::app::database::PoolManager;
use crate::registry::service::CacheEvictor;
use crate::runtime::cache::TenantCache;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct CacheHandlerState {
    pub cache: Arc<TenantCache>,
}

#[derive(Debug, Deserialize)]
pub struct UnloadIdleRequest {
    pub idle_threshold_ms: Option<i64>,
}

/// Cache introspection surface (§6): `GET /api/apps/cached`,
/// `POST /api/apps/:slug/unload`, `POST /api/apps/unload-idle`.
pub fn cache_routes(cache: Arc<TenantCache>) -> Router {
    Router::new()
        .route("/apps/cached", get(list_cached))
        .route("/apps/{slug}/unload", post(unload))
        .route("/apps/unload-idle", post(unload_idle))
        .with_state(CacheHandlerState { cache })
}

async fn list_cached(State(state): State<CacheHandlerState>) -> Json<OkResponse<serde_json::Value>> {
    let cached = state.cache.list_cached().await;
    Json(OkResponse::new(json!({ "cached": cached })))
}

async fn unload(
    State(state): State<CacheHandlerState>,
    Path(slug): Path<String>,
) -> Json<OkResponse<serde_json::Value>> {
    state.cache.evict(&slug).await;
    Json(OkResponse::new(json!({ "slug": slug })))
}

async fn unload_idle(
    State(state): State<CacheHandlerState>,
    body: Option<Json<UnloadIdleRequest>>,
) -> Json<OkResponse<serde_json::Value>> {
    let threshold_ms = body.and_then(|Json(b)| b.idle_threshold_ms).unwrap_or(0);
    let threshold = Duration::from_millis(threshold_ms.max(0) as u64);
    let evicted = state.cache.evict_idle(threshold).await;
    Json(OkResponse::new(json!({ "evicted": evicted })))
}

#[derive(Clone)]
struct HealthState {
    app_state: Arc<DefaultAppState>,
}

/// Unauthenticated health surface (§6): `/health`, `/health/live`,
/// `/health/ready`. Liveness never touches the database; readiness does.
pub fn health_routes(app_state: Arc<DefaultAppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
        .with_state(HealthState { app_state })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn live() -> Json<serde_json::Value> {
    Json(json!({ "status": "live" }))
}

async fn ready(State(state): State<HealthState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.app_state.get_main_pool()).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed: main database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not-ready" })),
            )
                .into_response()
        }
    }
}
