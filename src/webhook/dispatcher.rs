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

use crate::logs::model::{EventKind, EventLevel};
use crate::logs::service::EventRecorder;
use crate::webhook::dto::{WebhookEvent, WebhookPayload};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Fans out lifecycle events to a per-tenant operator URL (§4.10). Delivery
/// is best-effort: a single attempt under a hard timeout, logged on failure
/// and never retried or propagated back to the caller whose action triggered
/// the event — grounded in the teacher's best-effort notification pattern
/// (`MailTransporter::send` callers that log and continue rather than fail
/// the request the notification rides along with).
pub struct WebhookDispatcher {
    client: Arc<reqwest::Client>,
    timeout: Duration,
    enabled: bool,
    events: Arc<dyn EventRecorder>,
}

impl WebhookDispatcher {
    pub fn new(
        client: Arc<reqwest::Client>,
        timeout: Duration,
        enabled: bool,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            client,
            timeout,
            enabled,
            events,
        }
    }

    pub async fn notify<T>(&self, url: Option<&str>, event: WebhookEvent, slug: &str, data: &T)
    where
        T: Serialize,
    {
        if !self.enabled {
            return;
        }
        let Some(url) = url else {
            return;
        };

        let payload = WebhookPayload {
            event: event.as_str().to_string(),
            slug: slug.to_string(),
            timestamp: chrono::Utc::now(),
            data,
        };

        let result = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("X-PlatformX-Event", event.as_str())
            .header("X-PlatformX-App", slug)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    slug, event = event.as_str(), status = %response.status(),
                    "webhook delivery returned a non-2xx status"
                );
                self.events
                    .record(
                        Some(slug),
                        EventKind::Webhook,
                        EventLevel::Warn,
                        &format!("webhook '{}' returned {}", event.as_str(), response.status()),
                        serde_json::json!({}),
                    )
                    .await;
            }
            Err(e) => {
                tracing::warn!(slug, event = event.as_str(), error = %e, "webhook delivery failed");
                self.events
                    .record(
                        Some(slug),
                        EventKind::Webhook,
                        EventLevel::Warn,
                        &format!("webhook '{}' delivery failed: {e}", event.as_str()),
                        serde_json::json!({}),
                    )
                    .await;
            }
            Ok(_) => {
                self.events
                    .record(
                        Some(slug),
                        EventKind::Webhook,
                        EventLevel::Info,
                        &format!("webhook '{}' delivered", event.as_str()),
                        serde_json::json!({}),
                    )
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::service::MockEventRecorder;

    #[tokio::test]
    async fn disabled_dispatcher_never_sends() {
        let dispatcher = WebhookDispatcher::new(
            Arc::new(reqwest::Client::new()),
            Duration::from_secs(1),
            false,
            Arc::new(MockEventRecorder::new()),
        );
        // No server is listening on this port; if the dispatcher attempted a
        // send it would hang or error — the absence of a panic/timeout here
        // demonstrates the early return.
        dispatcher
            .notify(
                Some("http://127.0.0.1:1/webhook"),
                WebhookEvent::WebhookTest,
                "shop",
                &serde_json::json!({}),
            )
            .await;
    }

    #[tokio::test]
    async fn missing_url_is_a_noop() {
        let dispatcher = WebhookDispatcher::new(
            Arc::new(reqwest::Client::new()),
            Duration::from_secs(1),
            true,
            Arc::new(MockEventRecorder::new()),
        );
        dispatcher
            .notify(None, WebhookEvent::WebhookTest, "shop", &serde_json::json!({}))
            .await;
    }
}
