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
use crate::common::dto::GeneralError;
use crate::common::error::FriendlyError;
use crate::routing::host::{self, HostResolution};
use crate::runtime::cache::TenantCache;
use axum::extract::{Host, Request, State};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

#[derive(Clone)]
pub struct ForwardState {
    pub app_state: Arc<DefaultAppState>,
    pub cache: Arc<TenantCache>,
}

/// The Request Forwarder (C8): runs the Host Parser (§4.1) against the
/// incoming request, then get-or-loads and dispatches into the tenant via
/// the Tenant Cache (§4.6). Mounted as the router's fallback so every
/// unmatched admin-API path also flows through it — a request for the apex
/// host that reaches here matched no admin route and is a genuine 404.
pub async fn forward_handler(State(state): State<ForwardState>, Host(raw_host): Host, request: Request) -> Response {
    let apex = state.app_state.config.server().apex_host();
    match host::resolve(&raw_host, apex) {
        HostResolution::App(slug) => match state.cache.forward(&slug.0, request).await {
            Ok(response) => response,
            Err(e) => {
                let friendly: FriendlyError<GeneralError> = e.into();
                friendly.into_response()
            }
        },
        HostResolution::Platform | HostResolution::Reject => {
            axum::http::StatusCode::NOT_FOUND.into_response()
        }
    }
}
