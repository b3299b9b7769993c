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

#![forbid(unsafe_code)]
mod auth;
mod backup;
mod common;
mod config_store;
mod deploy;
mod logs;
mod manager;
mod registry;
mod routing;
mod runtime;
mod supervisor;
mod validator;
mod webhook;

use crate::manager::app::init::{AppComponents, init_default_app, init_subscriber};
use crate::supervisor::{LifecycleSupervisor, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    serve().await
}

async fn serve() -> anyhow::Result<()> {
    let AppComponents {
        config,
        router,
        cache,
        watcher,
    } = init_default_app().await?;

    let lifecycle = LifecycleSupervisor::spawn(
        cache.clone(),
        config.platform().uploads_root().clone(),
        config.platform(),
    );

    let addr = format!("{}:{}", config.server().host(), config.server().port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown signal received, draining background tasks");
    lifecycle.shutdown();
    drop(watcher);

    Ok(())
}
