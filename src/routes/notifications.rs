// SPDX-License-Identifier: MIT

//! Graph change-notification receiver.
//!
//! Graph first validates the endpoint with a `validationToken` query
//! parameter that must be echoed back as plain text; real notifications
//! arrive as JSON and must be acknowledged with 202 quickly regardless of
//! content, or Graph retries and eventually drops the subscription.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/notifications", post(receive))
}

#[derive(Deserialize)]
struct ValidationParams {
    #[serde(rename = "validationToken")]
    validation_token: Option<String>,
}

/// One change notification from Graph (subset of fields we act on).
#[derive(Debug, Deserialize)]
struct ChangeNotification {
    #[serde(rename = "subscriptionId")]
    subscription_id: String,
    #[serde(rename = "changeType")]
    change_type: String,
    resource: String,
    #[serde(rename = "clientState", default)]
    client_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotificationPayload {
    value: Vec<ChangeNotification>,
}

/// Receive endpoint validation requests and change notifications.
async fn receive(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ValidationParams>,
    body: String,
) -> Response {
    // Endpoint validation handshake: echo the token as text/plain.
    if let Some(token) = params.validation_token {
        tracing::info!("Subscription endpoint validation received");
        return (StatusCode::OK, token).into_response();
    }

    let payload: NotificationPayload = match serde_json::from_str(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable notification payload");
            // Acknowledge anyway so Graph does not retry a bad payload.
            return StatusCode::ACCEPTED.into_response();
        }
    };

    for notification in &payload.value {
        if notification.client_state.as_deref() != Some(state.config.client_state_secret.as_str()) {
            tracing::warn!(
                subscription_id = %notification.subscription_id,
                "Notification with invalid clientState ignored"
            );
            continue;
        }

        tracing::info!(
            subscription_id = %notification.subscription_id,
            change_type = %notification.change_type,
            resource = %notification.resource,
            "Change notification received"
        );
    }

    StatusCode::ACCEPTED.into_response()
}
