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

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level, immutable configuration tree, assembled once at startup by
/// [`AppConfig::from_env`] and handed out as `Arc<AppConfig>` to every module.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    server: ServerConfig,
    database: DatabaseConfig,
    auth: AuthConfig,
    platform: PlatformConfig,
    build: BuildConfig,
    webhook: WebhookConfig,
}

impl AppConfig {
    /// Loads `config/default.toml`, then an optional `config/{RUN_MODE}.toml`,
    /// then environment variables prefixed `PLATFORMX__` (double underscore as
    /// the nesting separator, e.g. `PLATFORMX__DATABASE__MAX_POOL_SIZE`).
    pub fn from_env() -> anyhow::Result<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("PLATFORMX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }
    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }
    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }
    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }
    pub fn build(&self) -> &BuildConfig {
        &self.build
    }
    pub fn webhook(&self) -> &WebhookConfig {
        &self.webhook
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    host: String,
    port: u16,
    /// The platform apex host, e.g. `platformx.localhost`. Tenants are served
    /// from subdomains of this host (§4.1).
    apex_host: String,
    /// `development` or `production`; governs diagnostic error bodies and the
    /// default file-watcher on/off state.
    mode: String,
}

impl ServerConfig {
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn port(&self) -> u16 {
        self.port
    }
    pub fn apex_host(&self) -> &str {
        &self.apex_host
    }
    pub fn is_development(&self) -> bool {
        self.mode != "production"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    host: String,
    port: u16,
    user: String,
    password: String,
    /// The main platform database (Tenants, Settings, EventLogs tables).
    main_database: String,
    max_pool_size: u32,
}

impl DatabaseConfig {
    pub fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, database
        )
    }
    pub fn main_url(&self) -> String {
        self.url_for(&self.main_database)
    }
    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    jwt_secret: String,
    jwt_expiration_mins: u32,
    jwt_issuer: String,
    jwt_audience: String,
    bootstrap_admin_email: String,
    bootstrap_admin_password: String,
}

impl AuthConfig {
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }
    pub fn jwt_expiration_mins(&self) -> u32 {
        self.jwt_expiration_mins
    }
    pub fn jwt_issuer(&self) -> &str {
        &self.jwt_issuer
    }
    pub fn jwt_audience(&self) -> &str {
        &self.jwt_audience
    }
    pub fn bootstrap_admin_email(&self) -> &str {
        &self.bootstrap_admin_email
    }
    pub fn bootstrap_admin_password(&self) -> &str {
        &self.bootstrap_admin_password
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    apps_root: PathBuf,
    backups_root: PathBuf,
    uploads_root: PathBuf,
    logs_root: PathBuf,
    idle_evict_threshold_mins: u64,
    idle_sweep_interval_mins: u64,
    temp_cleanup_interval_hours: u64,
    temp_max_age_hours: u64,
    watch_enabled: Option<bool>,
}

impl PlatformConfig {
    pub fn apps_root(&self) -> &PathBuf {
        &self.apps_root
    }
    pub fn backups_root(&self) -> &PathBuf {
        &self.backups_root
    }
    pub fn uploads_root(&self) -> &PathBuf {
        &self.uploads_root
    }
    pub fn logs_root(&self) -> &PathBuf {
        &self.logs_root
    }
    pub fn idle_evict_threshold(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.idle_evict_threshold_mins * 60)
    }
    pub fn idle_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.idle_sweep_interval_mins * 60)
    }
    pub fn temp_cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.temp_cleanup_interval_hours * 3600)
    }
    pub fn temp_max_age(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.temp_max_age_hours * 3600)
    }
    /// Watching defaults to on in development and off in production unless overridden.
    pub fn watch_enabled(&self, dev_mode: bool) -> bool {
        self.watch_enabled.unwrap_or(dev_mode)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    build_timeout_mins: u64,
    install_timeout_mins: u64,
    clone_timeout_secs: u64,
    max_archive_mb: u64,
    git_token: Option<String>,
}

impl BuildConfig {
    pub fn build_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.build_timeout_mins * 60)
    }
    pub fn install_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.install_timeout_mins * 60)
    }
    pub fn clone_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.clone_timeout_secs)
    }
    pub fn max_archive_bytes(&self) -> u64 {
        self.max_archive_mb * 1024 * 1024
    }
    pub fn git_token(&self) -> Option<&str> {
        self.git_token.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    enabled: bool,
    timeout_secs: u64,
}

impl WebhookConfig {
    pub fn enabled(&self) -> bool {
        self.enabled
    }
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        let raw = r#"
            [server]
            host = "0.0.0.0"
            port = 5000
            apex_host = "platformx.localhost"
            mode = "development"

            [database]
            host = "localhost"
            port = 5432
            user = "platformx"
            password = "secret"
            main_database = "platformx"
            max_pool_size = 5

            [auth]
            jwt_secret = "dev-secret"
            jwt_expiration_mins = 60
            jwt_issuer = "platformx"
            jwt_audience = "platformx-admin"
            bootstrap_admin_email = "admin@platformx.localhost"
            bootstrap_admin_password = "changeme"

            [platform]
            apps_root = "./apps"
            backups_root = "./backups"
            uploads_root = "./uploads"
            logs_root = "./logs"
            idle_evict_threshold_mins = 15
            idle_sweep_interval_mins = 10
            temp_cleanup_interval_hours = 6
            temp_max_age_hours = 24

            [build]
            build_timeout_mins = 10
            install_timeout_mins = 5
            clone_timeout_secs = 60
            max_archive_mb = 50

            [webhook]
            enabled = true
            timeout_secs = 5
        "#;
        let config = Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap();
        config.try_deserialize().unwrap()
    }

    #[test]
    fn database_url_includes_target_database_name() {
        let cfg = sample();
        assert!(cfg.database().url_for("app_shop").ends_with("/app_shop"));
    }

    #[test]
    fn watch_defaults_to_dev_mode_when_unset() {
        let cfg = sample();
        assert!(cfg.platform().watch_enabled(true));
        assert!(!cfg.platform().watch_enabled(false));
    }

    #[test]
    fn max_archive_bytes_converts_from_megabytes() {
        let cfg = sample();
        assert_eq!(cfg.build().max_archive_bytes(), 50 * 1024 * 1024);
    }
}
