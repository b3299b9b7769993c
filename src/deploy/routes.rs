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
use crate::deploy::handler::{git_import, git_update, redeploy, upload};
use crate::deploy::pipeline::DeployPipeline;
use crate::manager::app::config::AppConfig;
use crate::webhook::dispatcher::WebhookDispatcher;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use std::sync::Arc;

#[derive(Clone)]
pub struct DeployState {
    pub pipeline: Arc<DeployPipeline>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub config: Arc<AppConfig>,
}

/// Deploy surface (§6): `/api/apps/*` for ingest, `/api/admin/apps/:slug/redeploy`
/// alongside the registry's own admin routes.
pub fn routes(
    app_state: Arc<DefaultAppState>,
    pipeline: Arc<DeployPipeline>,
    webhooks: Arc<WebhookDispatcher>,
) -> Router {
    let state = DeployState {
        pipeline,
        webhooks,
        config: app_state.config.clone(),
    };
    let max_archive_bytes = app_state.config.build().max_archive_bytes() as usize;

    Router::new()
        .nest(
            "/apps",
            Router::new()
                .route("/upload", post(upload))
                .layer(DefaultBodyLimit::max(max_archive_bytes))
                .route("/git-import", post(git_import))
                .route("/git-update/{slug}", post(git_update))
                .layer(from_fn_with_state(app_state.config.clone(), require_auth)),
        )
        .nest(
            "/admin/apps",
            Router::new()
                .route("/{slug}/redeploy", post(redeploy))
                .layer(from_fn_with_state(app_state.config.clone(), require_auth)),
        )
        .with_state(state)
}
