// SPDX-License-Identifier: MIT

//! Re-authentication notification hooks.
//!
//! The orchestrator calls [`ReauthNotifier::deliver`] when a user can only
//! recover by signing in again. Delivery is best effort: implementations
//! swallow their own failures so notification can never abort a renewal pass.

use async_trait::async_trait;
use chrono::Utc;

/// Hook invoked when a user requires interactive re-authentication.
#[async_trait]
pub trait ReauthNotifier: Send + Sync {
    /// Best-effort delivery; must not fail.
    async fn deliver(&self, user_id: &str);
}

/// Notifier that only emits a structured log line.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl ReauthNotifier for LogNotifier {
    async fn deliver(&self, user_id: &str) {
        tracing::warn!(user_id, "User requires re-authentication");
    }
}

/// Notifier that POSTs a reauth event to an external webhook.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: std::time::Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            url,
        }
    }
}

#[async_trait]
impl ReauthNotifier for WebhookNotifier {
    async fn deliver(&self, user_id: &str) {
        let payload = serde_json::json!({
            "userId": user_id,
            "event": "reauth_required",
            "timestamp": Utc::now().to_rfc3339(),
        });

        match self.http.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(user_id, "Reauth notification delivered");
            }
            Ok(response) => {
                tracing::warn!(
                    user_id,
                    status = %response.status(),
                    "Reauth webhook rejected notification"
                );
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Reauth webhook delivery failed");
            }
        }
    }
}
