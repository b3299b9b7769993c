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

use crate::backup::engine::BackupEngine;
use crate::common::{ConfigProvider, DefaultAppState, HttpClientProvider};
use crate::config_store::env_store::EnvStore;
use crate::config_store::service::ConfigStore;
use crate::config_store::settings_repository::PgSettingsRepository;
use crate::deploy::pipeline::DeployPipeline;
use crate::logs::repository::PgEventLogsRepository;
use crate::logs::service::EventLogService;
use crate::manager::app::config::AppConfig;
use crate::manager::app::database::{DatabaseMigrator, PoolManager};
use crate::registry::repository::PgTenantsRepository;
use crate::registry::service::TenantRegistry;
use crate::runtime::cache::TenantCache;
use crate::runtime::watcher::FileWatcher;
use crate::webhook::dispatcher::WebhookDispatcher;
use anyhow::Result;
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn init_subscriber() {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish(),
    )
    .expect("setting default subscriber failed");
}

/// Built once in [`init_default_app`] and handed to the lifecycle supervisor
/// so background sweeps and the router share the same component instances.
pub struct AppComponents {
    pub config: Arc<AppConfig>,
    pub router: Router,
    pub cache: Arc<TenantCache>,
    pub watcher: Arc<FileWatcher>,
}

/// Wires every service of the platform together: the tenant registry and its
/// cache/watcher dependency inversion (§4.2, §4.6, §4.7), the deploy
/// pipeline (§4.5), config store (§4.3), backup engine (§4.9), webhook
/// dispatcher (§4.10), and the admin/forwarding router that sits on top of
/// all of it.
pub async fn init_default_app() -> Result<AppComponents> {
    let app_state = Arc::new(DefaultAppState::new().await?);
    app_state.migrate_main_db().await?;

    let config = app_state.config();
    let http_client = app_state.http_client();

    let event_logs_repository = Arc::new(PgEventLogsRepository::new(app_state.get_main_pool()));
    let event_log_service = Arc::new(EventLogService::new(
        event_logs_repository,
        config.platform().logs_root().clone(),
    ));

    let cache = Arc::new(TenantCache::new(
        app_state.clone(),
        http_client.clone(),
        event_log_service.clone(),
    ));
    let watcher = FileWatcher::new(cache.clone())?;
    cache.set_watcher(watcher.clone());

    let tenants_repository = Arc::new(PgTenantsRepository::new(app_state.get_main_pool()));
    let registry = Arc::new(TenantRegistry::new(
        tenants_repository,
        config.platform().apps_root().clone(),
        cache.clone(),
        watcher.clone(),
        event_log_service.clone(),
    ));
    cache.set_registry(registry.clone());

    let pipeline = Arc::new(DeployPipeline::new(
        registry.clone(),
        cache.clone(),
        config.clone(),
        event_log_service.clone(),
    ));

    let env_store = EnvStore::new(config.platform().apps_root().clone());
    let settings_repository = Arc::new(PgSettingsRepository::new(app_state.get_main_pool()));
    let config_store = Arc::new(ConfigStore::new(
        env_store,
        settings_repository,
        cache.clone(),
        event_log_service.clone(),
    ));

    let backup_engine = Arc::new(BackupEngine::new(
        registry.clone(),
        cache.clone(),
        config.platform().backups_root().clone(),
        config.platform().apps_root().clone(),
        event_log_service.clone(),
    ));

    let webhooks = Arc::new(WebhookDispatcher::new(
        http_client.clone(),
        config.webhook().timeout(),
        config.webhook().enabled(),
        event_log_service.clone(),
    ));

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let router = Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(crate::auth::routes::routes(app_state.clone()))
                .merge(crate::registry::routes::routes(
                    app_state.clone(),
                    registry.clone(),
                    webhooks.clone(),
                ))
                .merge(crate::config_store::routes::routes(
                    app_state.clone(),
                    config_store.clone(),
                ))
                .merge(crate::deploy::routes::routes(
                    app_state.clone(),
                    pipeline.clone(),
                    webhooks.clone(),
                ))
                .merge(crate::backup::routes::routes(
                    app_state.clone(),
                    backup_engine.clone(),
                    registry.clone(),
                    webhooks.clone(),
                ))
                .merge(crate::webhook::routes::routes(
                    app_state.clone(),
                    registry.clone(),
                    webhooks.clone(),
                ))
                .merge(crate::runtime::handler::cache_routes(cache.clone()))
                .merge(crate::logs::routes::routes(
                    app_state.clone(),
                    event_log_service.clone(),
                )),
        )
        .merge(crate::runtime::handler::health_routes(app_state.clone()))
        .merge(crate::webhook::routes::metrics_routes(prometheus_handle))
        .fallback(crate::runtime::forward::forward_handler)
        .with_state(crate::runtime::forward::ForwardState {
            app_state: app_state.clone(),
            cache: cache.clone(),
        })
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http());

    Ok(AppComponents {
        config,
        router,
        cache,
        watcher,
    })
}
