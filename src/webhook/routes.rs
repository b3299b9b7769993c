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

use crate::auth::middleware::require_auth;
use crate::common::DefaultAppState;
use crate::registry::service::TenantRegistry;
use crate::webhook::dispatcher::WebhookDispatcher;
use crate::webhook::handler::{delete_webhook, get_webhook, set_webhook, test_webhook};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete as http_delete, get as http_get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct WebhookState {
    pub registry: Arc<TenantRegistry>,
    pub dispatcher: Arc<WebhookDispatcher>,
}

/// Per-tenant webhook CRUD and the manual test-delivery endpoint (§6).
pub fn routes(
    app_state: Arc<DefaultAppState>,
    registry: Arc<TenantRegistry>,
    dispatcher: Arc<WebhookDispatcher>,
) -> Router {
    let state = WebhookState {
        registry,
        dispatcher,
    };

    Router::new().nest(
        "/admin/apps",
        Router::new()
            .route("/{slug}/webhook", http_get(get_webhook))
            .route("/{slug}/webhook", post(set_webhook))
            .route("/{slug}/webhook", http_delete(delete_webhook))
            .route("/{slug}/webhook/test", post(test_webhook))
            .layer(from_fn_with_state(app_state.config.clone(), require_auth))
            .with_state(state),
    )
}

/// `GET /metrics` (§4 ambient surface): text-format Prometheus scrape, kept
/// unauthenticated like the rest of the corpus's internal-network metrics
/// endpoints.
pub fn metrics_routes(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", http_get(move || async move { handle.render() }))
}
