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

use crate::auth::handler::{login, verify};
use crate::auth::service::AuthService;
use crate::common::DefaultAppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

/// `/api/auth/login` and `/api/auth/verify` (§6) — unauthenticated by
/// definition, since they issue/inspect the very token everything else
/// requires.
pub fn routes(app_state: Arc<DefaultAppState>) -> Router {
    let service = Arc::new(
        AuthService::new(app_state.config.clone()).expect("failed to initialize auth service"),
    );

    Router::new().nest(
        "/auth",
        Router::new()
            .route("/login", post(login))
            .route("/verify", get(verify))
            .with_state(service),
    )
}
