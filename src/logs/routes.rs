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
use crate::logs::handler::get_logs;
use crate::logs::service::EventLogService;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get as http_get;
use std::sync::Arc;

#[derive(Clone)]
pub struct LogsState {
    pub logs: Arc<EventLogService>,
}

/// Mounts the single logs endpoint of §6 under the Apps admin surface.
pub fn routes(app_state: Arc<DefaultAppState>, logs: Arc<EventLogService>) -> Router {
    let state = LogsState { logs };

    Router::new().nest(
        "/admin/apps",
        Router::new()
            .route("/{slug}/logs", http_get(get_logs))
            .layer(from_fn_with_state(app_state.config.clone(), require_auth))
            .with_state(state),
    )
}
