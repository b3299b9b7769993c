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
use crate::config_store::handler::{
    delete_env, delete_setting, get_env, get_setting, list_settings, list_settings_by_category,
    patch_env, set_setting, set_settings,
};
use crate::config_store::service::ConfigStore;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete as http_delete, get as http_get, patch, put};
use std::sync::Arc;

#[derive(Clone)]
pub struct ConfigStoreState {
    pub store: Arc<ConfigStore>,
}

/// Per-tenant env (§4.3, first half) and platform settings (§4.3, second
/// half) share the `/admin` authenticated surface but address disjoint
/// paths: `apps/:slug/env` vs. `settings/:key`.
pub fn routes(app_state: Arc<DefaultAppState>, store: Arc<ConfigStore>) -> Router {
    let state = ConfigStoreState { store };

    Router::new().nest(
        "/admin",
        Router::new()
            .route("/apps/{slug}/env", http_get(get_env))
            .route("/apps/{slug}/env", patch(patch_env))
            .route("/apps/{slug}/env", http_delete(delete_env))
            .route("/settings", http_get(list_settings))
            .route("/settings", put(set_settings))
            .route("/settings/{key}", http_get(get_setting))
            .route("/settings/{key}", put(set_setting))
            .route("/settings/{key}", http_delete(delete_setting))
            .route(
                "/settings/category/{category}",
                http_get(list_settings_by_category),
            )
            .layer(from_fn_with_state(app_state.config.clone(), require_auth))
            .with_state(state),
    )
}
