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
use crate::common::error::{FriendlyError, RepositoryError, codes};
use crate::common::types::slug::TenantSlug;
use crate::common::types::value_object::ValueObjectable;
use crate::config_store::env_store::{EnvStore, EnvStoreError};
use crate::logs::model::{EventKind, EventLevel};
use crate::logs::service::EventRecorder;
use crate::manager::app::database::{PoolManager, provision_tenant_database};
use crate::registry::model::{Tenant, TenantKind, TenantStatus};
use crate::registry::service::{CacheEvictor, RegistryError, TenantRegistry, WatcherControl};
use crate::runtime::protocol::{TenantRequest, TenantResponse, read_frame, write_frame};
use crate::validator;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::RwLock as AsyncRwLock;
use tracing::Level;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("tenant '{0}' is disabled")]
    Disabled(String),
    #[error("entry file rejected: {0}")]
    ValidationFailed(String),
    #[error(transparent)]
    Env(#[from] EnvStoreError),
    #[error(transparent)]
    Database(#[from] RepositoryError),
    #[error("no node binary available on this host")]
    NoRuntime,
    #[error("failed to start tenant process: {0}")]
    SpawnFailed(String),
    #[error("tenant communication error: {0}")]
    Protocol(String),
    #[error("upstream proxy error: {0}")]
    Upstream(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

impl From<CacheError> for FriendlyError<GeneralError> {
    fn from(e: CacheError) -> Self {
        let e = match e {
            CacheError::Registry(registry_err) => return registry_err.into(),
            other => other,
        };
        let message = e.to_string();
        let (status, code) = match &e {
            CacheError::Registry(_) => unreachable!("handled above"),
            CacheError::Disabled(_) => (StatusCode::CONFLICT, codes::APP_UNSUPPORTED_OPERATION),
            CacheError::ValidationFailed(_) => (StatusCode::BAD_REQUEST, codes::APP_FORBIDDEN_CODE),
            CacheError::Env(_) | CacheError::Database(_) => {
                return FriendlyError::internal(file!(), GeneralError { message });
            }
            CacheError::NoRuntime | CacheError::SpawnFailed(_) | CacheError::Protocol(_) => {
                return FriendlyError::internal(file!(), GeneralError { message });
            }
            CacheError::Upstream(_) => (StatusCode::BAD_GATEWAY, codes::APP_UPSTREAM_FAILED),
        };
        FriendlyError::user_facing(Level::WARN, status, code, file!(), GeneralError { message })
    }
}

/// `listCached()` snapshot (§4.6).
#[derive(Debug, Clone, Serialize)]
pub struct CachedEntrySnapshot {
    pub slug: String,
    pub loaded_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub request_count: u64,
    pub idle_ms: i64,
}

struct SubprocessIo {
    stdin: ChildStdin,
    stdout: ChildStdout,
}

/// Owns the child OS process a backend/fullstack tenant runs in (§9). `child`
/// and `io` are split so the process can be killed while a request is
/// in-flight on the stdio pipes without fighting over a single lock.
struct Subprocess {
    child: AsyncMutex<Child>,
    io: AsyncMutex<SubprocessIo>,
}

impl Subprocess {
    async fn kill(&self) {
        let mut child = self.child.lock().await;
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

enum TenantBackend {
    Subprocess(Subprocess),
    Static {
        build_dir: PathBuf,
        proxy_map: Vec<crate::registry::model::ProxyRule>,
    },
}

/// The in-memory Loaded Tenant of §3: handler, env snapshot, lifecycle
/// counters. Created on a cache miss, mutated only through [`TenantCache`],
/// destroyed on eviction.
pub struct LoadedTenant {
    pub slug: String,
    pub kind: TenantKind,
    pub loaded_at: DateTime<Utc>,
    last_used_at: AsyncRwLock<DateTime<Utc>>,
    request_count: AtomicU64,
    backend: TenantBackend,
}

impl LoadedTenant {
    async fn touch(&self) {
        *self.last_used_at.write().await = Utc::now();
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    async fn snapshot(&self) -> CachedEntrySnapshot {
        let last_used_at = *self.last_used_at.read().await;
        CachedEntrySnapshot {
            slug: self.slug.clone(),
            loaded_at: self.loaded_at,
            last_used_at,
            request_count: self.request_count.load(Ordering::Relaxed),
            idle_ms: (Utc::now() - last_used_at).num_milliseconds().max(0),
        }
    }

    async fn idle_since(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - *self.last_used_at.read().await
    }

    async fn shutdown(&self) {
        if let TenantBackend::Subprocess(subprocess) = &self.backend {
            subprocess.kill().await;
        }
    }
}

type Slot = Arc<AsyncMutex<Option<Arc<LoadedTenant>>>>;

/// Process-wide `slug -> Loaded Tenant` map (§4.6). Each slot is guarded by
/// its own async mutex so concurrent misses for the same slug collapse into
/// one load (§5, §9's "map slug -> mutex" coordination note); the `DashMap`
/// itself only ever needs its own short-lived shard lock.
pub struct TenantCache {
    slots: DashMap<String, Slot>,
    app_state: Arc<DefaultAppState>,
    registry: OnceLock<Arc<TenantRegistry>>,
    env_store: EnvStore,
    http_client: Arc<reqwest::Client>,
    watcher: OnceLock<Arc<dyn WatcherControl>>,
    events: Arc<dyn EventRecorder>,
}

impl TenantCache {
    pub fn new(
        app_state: Arc<DefaultAppState>,
        http_client: Arc<reqwest::Client>,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        let apps_root = app_state.config.platform().apps_root().clone();
        Self {
            slots: DashMap::new(),
            app_state,
            registry: OnceLock::new(),
            env_store: EnvStore::new(apps_root),
            http_client,
            watcher: OnceLock::new(),
            events,
        }
    }

    /// Breaks the cache/watcher construction cycle: the watcher is built
    /// after the cache (it needs `Arc<dyn CacheEvictor>` pointing at this
    /// cache) and wired back in with this setter.
    pub fn set_watcher(&self, watcher: Arc<dyn WatcherControl>) {
        let _ = self.watcher.set(watcher);
    }

    /// Breaks the cache/registry construction cycle the same way: the
    /// registry itself depends on `Arc<dyn CacheEvictor>`, so it can only be
    /// built after this cache exists.
    pub fn set_registry(&self, registry: Arc<TenantRegistry>) {
        let _ = self.registry.set(registry);
    }

    fn registry(&self) -> &Arc<TenantRegistry> {
        self.registry
            .get()
            .expect("TenantCache::set_registry must run before the cache is used")
    }

    fn tenant_dir(&self, slug: &str) -> PathBuf {
        self.app_state.config.platform().apps_root().join(slug)
    }

    fn slot(&self, slug: &str) -> Slot {
        self.slots
            .entry(slug.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }

    /// `getOrLoad` (§4.6): at most one concurrent load per slug. A second
    /// caller for a missing slug blocks on the same slot mutex and observes
    /// whatever the first caller produced.
    pub async fn get_or_load(&self, slug: &str) -> CacheResult<Arc<LoadedTenant>> {
        let slot = self.slot(slug);
        let mut guard = slot.lock().await;
        if let Some(loaded) = guard.as_ref() {
            let loaded = loaded.clone();
            drop(guard);
            loaded.touch().await;
            return Ok(loaded);
        }

        let loaded = Arc::new(self.load(slug).await?);
        *guard = Some(loaded.clone());
        drop(guard);

        if let Some(watcher) = self.watcher.get() {
            watcher.register(slug, &self.tenant_dir(slug));
        }
        loaded.touch().await;
        Ok(loaded)
    }

    async fn load(&self, slug: &str) -> CacheResult<LoadedTenant> {
        let tenant = self.registry().get(slug).await?;
        if tenant.status == TenantStatus::Disabled {
            return Err(CacheError::Disabled(slug.to_string()));
        }

        let backend = if tenant.kind.needs_subprocess() {
            TenantBackend::Subprocess(self.spawn_subprocess(&tenant).await?)
        } else {
            TenantBackend::Static {
                build_dir: self
                    .tenant_dir(slug)
                    .join(tenant.build_output_dir.clone().unwrap_or_default()),
                proxy_map: tenant.proxy_map.clone(),
            }
        };

        self.events
            .record(
                Some(slug),
                EventKind::Load,
                EventLevel::Info,
                &format!("loaded as {}", tenant.kind),
                serde_json::json!({}),
            )
            .await;

        Ok(LoadedTenant {
            slug: slug.to_string(),
            kind: tenant.kind,
            loaded_at: Utc::now(),
            last_used_at: AsyncRwLock::new(Utc::now()),
            request_count: AtomicU64::new(0),
            backend,
        })
    }

    async fn spawn_subprocess(&self, tenant: &Tenant) -> CacheResult<Subprocess> {
        let dir = self.tenant_dir(&tenant.slug);
        let entry = dir.join(&tenant.entry_path);

        let source = tokio::fs::read_to_string(&entry)
            .await
            .map_err(|e| CacheError::SpawnFailed(format!("unreadable entry file: {e}")))?;
        let validation = validator::validate_entry_source(&source);
        if !validation.valid {
            return Err(CacheError::ValidationFailed(
                validation.reason.unwrap_or_default(),
            ));
        }

        let slug = TenantSlug(tenant.slug.clone());
        slug.validate().map_err(|e| CacheError::SpawnFailed(e))?;
        self.ensure_tenant_database(&slug).await?;

        let env = self.env_store.load(&tenant.slug).await?;
        let node = which::which("node").map_err(|_| CacheError::NoRuntime)?;

        let mut cmd = Command::new(node);
        cmd.arg(&entry)
            .current_dir(&dir)
            .env_clear()
            .env(
                "DATABASE_URL",
                self.app_state
                    .config
                    .database()
                    .url_for(&slug.db_namespace()),
            )
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| CacheError::SpawnFailed(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CacheError::SpawnFailed("tenant process has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CacheError::SpawnFailed("tenant process has no stdout".to_string()))?;

        Ok(Subprocess {
            child: AsyncMutex::new(child),
            io: AsyncMutex::new(SubprocessIo { stdin, stdout }),
        })
    }

    async fn ensure_tenant_database(&self, slug: &TenantSlug) -> CacheResult<()> {
        let namespace = slug.db_namespace();
        if self.app_state.get_tenant_pool(&namespace).is_ok() {
            return Ok(());
        }
        if self.app_state.add_tenant_pool(&namespace).await.is_ok() {
            return Ok(());
        }
        provision_tenant_database(
            &self.app_state.pool_manager,
            &self.app_state.pool_manager.get_main_pool(),
            &namespace,
        )
        .await?;
        Ok(())
    }

    /// Dispatches an already-resolved request into the loaded tenant: a
    /// subprocess round-trip (§9) for backend/fullstack, or proxy-then-static
    /// for frontend (§4.6).
    pub async fn forward(&self, slug: &str, request: Request) -> CacheResult<Response> {
        let loaded = self.get_or_load(slug).await?;
        match &loaded.backend {
            TenantBackend::Subprocess(subprocess) => {
                self.forward_subprocess(subprocess, request).await
            }
            TenantBackend::Static {
                build_dir,
                proxy_map,
            } => self.forward_static(build_dir, proxy_map, request).await,
        }
    }

    async fn forward_subprocess(
        &self,
        subprocess: &Subprocess,
        request: Request,
    ) -> CacheResult<Response> {
        let (parts, body) = request.into_parts();
        let body_bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| CacheError::Protocol(e.to_string()))?;

        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let tenant_request = TenantRequest {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            headers,
            body: body_bytes.to_vec(),
        };

        let mut io = subprocess.io.lock().await;
        write_frame(&mut io.stdin, &tenant_request)
            .await
            .map_err(|e| CacheError::Protocol(e.to_string()))?;
        let tenant_response: TenantResponse = read_frame(&mut io.stdout)
            .await
            .map_err(|e| CacheError::Protocol(e.to_string()))?;
        drop(io);

        tenant_response_into_axum(tenant_response)
    }

    async fn forward_static(
        &self,
        build_dir: &std::path::Path,
        proxy_map: &[crate::registry::model::ProxyRule],
        request: Request,
    ) -> CacheResult<Response> {
        use tower::ServiceExt;
        use tower_http::services::{ServeDir, ServeFile};

        let path = request.uri().path().to_string();
        if let Some(rule) = proxy_map.iter().find(|r| path.starts_with(&r.path_prefix)) {
            return self.proxy_upstream(rule, request).await;
        }

        let index = build_dir.join("index.html");
        let service = ServeDir::new(build_dir).fallback(ServeFile::new(index));
        let response = service
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});
        Ok(response.map(Body::new))
    }

    async fn proxy_upstream(
        &self,
        rule: &crate::registry::model::ProxyRule,
        request: Request,
    ) -> CacheResult<Response> {
        let (parts, body) = request.into_parts();
        let remainder = parts
            .uri
            .path()
            .strip_prefix(&rule.path_prefix)
            .unwrap_or("");
        let mut url = format!("{}{}", rule.upstream_base_url.trim_end_matches('/'), remainder);
        if let Some(query) = parts.uri.query() {
            url.push('?');
            url.push_str(query);
        }

        let body_bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| CacheError::Upstream(e.to_string()))?;

        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| CacheError::Upstream(e.to_string()))?;
        let mut req = self.http_client.request(method, url);
        for (name, value) in parts.headers.iter() {
            if name == axum::http::header::HOST {
                continue;
            }
            req = req.header(name.as_str(), value.as_bytes());
        }
        let response = req
            .body(body_bytes)
            .send()
            .await
            .map_err(|e| CacheError::Upstream(e.to_string()))?;

        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut headers = HeaderMap::new();
        for (name, value) in response.headers().iter() {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_str(name.as_str()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.insert(name, value);
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::Upstream(e.to_string()))?;

        let mut builder = Response::builder().status(status);
        *builder.headers_mut().unwrap() = headers;
        builder
            .body(Body::from(body))
            .map_err(|e| CacheError::Upstream(e.to_string()))
    }

    fn slot_snapshot(&self) -> Vec<(String, Slot)> {
        self.slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// `evictIdle(thresholdMs)` (§4.6): one pass, evicts every slot whose
    /// `lastUsedAt` is older than `now - threshold`.
    pub async fn evict_idle(&self, threshold: std::time::Duration) -> Vec<String> {
        let now = Utc::now();
        let threshold = chrono::Duration::from_std(threshold).unwrap_or(chrono::Duration::zero());
        let mut stale = Vec::new();
        for (slug, slot) in self.slot_snapshot() {
            let guard = slot.lock().await;
            let is_stale = match guard.as_ref() {
                Some(loaded) => loaded.idle_since(now).await >= threshold,
                None => false,
            };
            drop(guard);
            if is_stale {
                stale.push(slug);
            }
        }
        for slug in &stale {
            self.evict(slug).await;
        }
        stale
    }

    /// `listCached()` (§4.6).
    pub async fn list_cached(&self) -> Vec<CachedEntrySnapshot> {
        let mut out = Vec::new();
        for (_, slot) in self.slot_snapshot() {
            if let Some(loaded) = slot.lock().await.as_ref() {
                out.push(loaded.snapshot().await);
            }
        }
        out
    }
}

fn tenant_response_into_axum(tenant_response: TenantResponse) -> CacheResult<Response> {
    let status = StatusCode::from_u16(tenant_response.status)
        .map_err(|e| CacheError::Protocol(e.to_string()))?;
    let mut builder = Response::builder().status(status);
    for (name, value) in tenant_response.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(&name), HeaderValue::from_str(&value))
        {
            builder = builder.header(name, value);
        }
    }
    builder
        .body(Body::from(tenant_response.body))
        .map_err(|e| CacheError::Protocol(e.to_string()))
}

#[async_trait]
impl CacheEvictor for TenantCache {
    /// `evict(slug)` (§4.6): removes the slot and kills any subprocess.
    /// Idempotent — evicting an already-unloaded slug is a no-op. Ordered
    /// before the watcher unregister per §4.2's delete/rename sequencing.
    async fn evict(&self, slug: &str) {
        if let Some((_, slot)) = self.slots.remove(slug) {
            if let Some(loaded) = slot.lock().await.take() {
                loaded.shutdown().await;
                self.events
                    .record(
                        Some(slug),
                        EventKind::Unload,
                        EventLevel::Info,
                        "evicted from cache",
                        serde_json::json!({}),
                    )
                    .await;
            }
        }
        if let Some(watcher) = self.watcher.get() {
            watcher.unregister(slug);
        }
    }
}
