// SPDX-License-Identifier: MIT

//! Microsoft Graph subscription client.
//!
//! Each method performs exactly one network call; retry policy lives in the
//! renewal orchestrator so backoff can be tuned per call site.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;

use crate::config::Config;
use crate::models::SubscriptionRecord;

/// Remote outcome of a Graph subscription call, as a closed set.
#[derive(Debug, thiserror::Error)]
pub enum GraphApiError {
    /// The subscription no longer exists on the remote side.
    #[error("subscription not found")]
    NotFound,

    /// The access token was rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// Graph throttled the request.
    #[error("rate limited")]
    RateLimited,

    /// Anything else: transport error, timeout, unexpected status.
    #[error("graph error: {0}")]
    Other(String),
}

/// Manages change-notification subscriptions against the remote service.
#[async_trait]
pub trait SubscriptionClient: Send + Sync {
    /// Create a subscription for the given resource path.
    async fn create(
        &self,
        access_token: &str,
        resource: &str,
    ) -> Result<SubscriptionRecord, GraphApiError>;

    /// Extend an existing subscription; returns the new expiry.
    async fn renew(
        &self,
        access_token: &str,
        subscription_id: &str,
    ) -> Result<DateTime<Utc>, GraphApiError>;

    /// Delete a subscription.
    async fn delete(&self, access_token: &str, subscription_id: &str)
        -> Result<(), GraphApiError>;
}

/// Graph v1.0 REST client.
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    notification_url: String,
    client_state: String,
    /// How far out each created or renewed subscription expires.
    subscription_lifetime: Duration,
}

/// Subscription resource as returned by Graph.
#[derive(Debug, Deserialize)]
struct GraphSubscription {
    id: String,
    resource: String,
    #[serde(rename = "expirationDateTime")]
    expiration_date_time: DateTime<Utc>,
}

/// Signed-in user profile (subset).
#[derive(Debug, Deserialize)]
pub struct GraphUser {
    pub id: String,
    #[serde(rename = "userPrincipalName")]
    pub user_principal_name: Option<String>,
}

impl GraphClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(config.request_timeout())
                .build()
                .unwrap_or_default(),
            base_url: "https://graph.microsoft.com/v1.0".to_string(),
            notification_url: config.notification_url.clone(),
            client_state: config.client_state_secret.clone(),
            subscription_lifetime: Duration::minutes(config.subscription_lifetime_mins),
        }
    }

    /// Fetch the signed-in user's profile (used to key the user record).
    pub async fn get_me(&self, access_token: &str) -> Result<GraphUser, GraphApiError> {
        let response = self
            .http
            .get(format!("{}/me", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GraphApiError::Other(e.to_string()))?;

        Self::parse_json(response).await
    }

    /// Expiry sent on create/renew, formatted the way Graph expects.
    fn expiration_date_time(&self) -> String {
        (Utc::now() + self.subscription_lifetime).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Classify a non-success status into the closed error set.
    fn classify_status(status: reqwest::StatusCode, body: String) -> GraphApiError {
        match status.as_u16() {
            404 => GraphApiError::NotFound,
            401 => GraphApiError::Unauthorized,
            429 => GraphApiError::RateLimited,
            _ => GraphApiError::Other(format!("HTTP {}: {}", status, body)),
        }
    }

    async fn parse_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, GraphApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| GraphApiError::Other(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl SubscriptionClient for GraphClient {
    async fn create(
        &self,
        access_token: &str,
        resource: &str,
    ) -> Result<SubscriptionRecord, GraphApiError> {
        let body = serde_json::json!({
            "changeType": "created,updated",
            "notificationUrl": self.notification_url,
            "resource": resource,
            "expirationDateTime": self.expiration_date_time(),
            "clientState": self.client_state,
        });

        let response = self
            .http
            .post(format!("{}/subscriptions", self.base_url))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphApiError::Other(e.to_string()))?;

        let sub: GraphSubscription = Self::parse_json(response).await?;
        tracing::info!(subscription_id = %sub.id, resource = %sub.resource, "Subscription created");

        Ok(SubscriptionRecord {
            id: sub.id,
            resource: sub.resource,
            expires_at: sub.expiration_date_time,
        })
    }

    async fn renew(
        &self,
        access_token: &str,
        subscription_id: &str,
    ) -> Result<DateTime<Utc>, GraphApiError> {
        let body = serde_json::json!({
            "expirationDateTime": self.expiration_date_time(),
        });

        let response = self
            .http
            .patch(format!("{}/subscriptions/{}", self.base_url, subscription_id))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphApiError::Other(e.to_string()))?;

        let sub: GraphSubscription = Self::parse_json(response).await?;
        Ok(sub.expiration_date_time)
    }

    async fn delete(
        &self,
        access_token: &str,
        subscription_id: &str,
    ) -> Result<(), GraphApiError> {
        let response = self
            .http
            .delete(format!("{}/subscriptions/{}", self.base_url, subscription_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GraphApiError::Other(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, body));
        }

        tracing::info!(subscription_id, "Subscription deleted");
        Ok(())
    }
}
