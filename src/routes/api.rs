// SPDX-License-Identifier: MIT

//! Status and renewal-control endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::PassSummary;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(status))
        .route("/api/renewal/start", post(renewal_start))
        .route("/api/renewal/stop", post(renewal_stop))
        .route("/api/renewal/run", post(renewal_run))
}

#[derive(Serialize)]
struct SubscriptionStatus {
    id: String,
    resource: String,
    expires_at: DateTime<Utc>,
    minutes_left: i64,
}

#[derive(Serialize)]
struct UserStatus {
    user_id: String,
    token_expires_at: DateTime<Utc>,
    token_minutes_left: i64,
    subscriptions: Vec<SubscriptionStatus>,
}

#[derive(Serialize)]
struct StatusResponse {
    users: usize,
    renewal_running: bool,
    records: Vec<UserStatus>,
}

/// Snapshot of every user's credential and subscription expiries.
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let now = Utc::now();
    let users = state.registry.list_all().await;

    let records = users
        .into_iter()
        .map(|user| UserStatus {
            token_minutes_left: (user.token_expires_at - now).num_minutes(),
            token_expires_at: user.token_expires_at,
            subscriptions: user
                .subscriptions
                .into_iter()
                .map(|sub| SubscriptionStatus {
                    minutes_left: (sub.expires_at - now).num_minutes(),
                    id: sub.id,
                    resource: sub.resource,
                    expires_at: sub.expires_at,
                })
                .collect(),
            user_id: user.user_id,
        })
        .collect::<Vec<_>>();

    Json(StatusResponse {
        users: records.len(),
        renewal_running: state.scheduler.is_running(),
        records,
    })
}

#[derive(Serialize)]
struct SchedulerResponse {
    running: bool,
}

/// Start the recurring renewal loop (idempotent).
async fn renewal_start(State(state): State<Arc<AppState>>) -> Json<SchedulerResponse> {
    state.scheduler.start();
    Json(SchedulerResponse {
        running: state.scheduler.is_running(),
    })
}

/// Stop the recurring renewal loop (idempotent).
async fn renewal_stop(State(state): State<Arc<AppState>>) -> Json<SchedulerResponse> {
    state.scheduler.stop();
    Json(SchedulerResponse {
        running: state.scheduler.is_running(),
    })
}

/// Run a single renewal pass immediately and report what it did.
async fn renewal_run(State(state): State<Arc<AppState>>) -> Json<PassSummary> {
    Json(state.scheduler.run_now().await)
}
