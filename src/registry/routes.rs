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
use crate::registry::handler::{create, delete, get, list, patch, rename, sync};
use crate::registry::service::TenantRegistry;
use crate::webhook::dispatcher::WebhookDispatcher;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete as http_delete, get as http_get, patch as http_patch, post};
use std::sync::Arc;

#[derive(Clone)]
pub struct RegistryState {
    pub registry: Arc<TenantRegistry>,
    pub webhooks: Arc<WebhookDispatcher>,
}

/// The Apps admin surface of §6: list/get/patch/delete/create/rename/sync.
/// `redeploy` lives in `crate::deploy` since it drives the build pipeline.
pub fn routes(
    app_state: Arc<DefaultAppState>,
    registry: Arc<TenantRegistry>,
    webhooks: Arc<WebhookDispatcher>,
) -> Router {
    let state = RegistryState { registry, webhooks };

    Router::new().nest(
        "/admin/apps",
        Router::new()
            .route("/", http_get(list))
            .route("/", post(create))
            .route("/sync", post(sync))
            .route("/{slug}", http_get(get))
            .route("/{slug}", http_patch(patch))
            .route("/{slug}", http_delete(delete))
            .route("/{slug}/rename", post(rename))
            .layer(from_fn_with_state(app_state.config.clone(), require_auth))
            .with_state(state),
    )
}
