// SPDX-License-Identifier: MIT

//! HTTP route handlers.

pub mod api;
pub mod auth;
pub mod notifications;

use std::sync::Arc;

use axum::response::Html;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub users: usize,
}

/// Health check response
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        users: state.registry.list_all().await.len(),
    })
}

/// Landing page with sign-in and status links.
async fn index() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html>\
         <html><head><meta charset=\"UTF-8\"><title>graph-watch</title></head>\
         <body>\
         <h1>graph-watch</h1>\
         <p>Receives mailbox change notifications via Microsoft Graph \
            subscriptions and keeps them renewed.</p>\
         <p><a href=\"/auth/signin\">Sign in and subscribe</a></p>\
         <p><a href=\"/status\">Status</a></p>\
         </body></html>",
    )
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(notifications::routes())
        .merge(api::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
