// SPDX-License-Identifier: MIT

//! Azure AD sign-in routes.
//!
//! `GET /auth/signin` redirects to the authorize endpoint; the callback
//! exchanges the code, stores the user record and creates the mailbox
//! subscription that the renewal service will keep alive.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::UserRecord;
use crate::services::SubscriptionClient;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signin", get(signin))
        .route("/auth/callback", get(callback))
}

/// Redirect the browser to the Azure AD authorize endpoint.
async fn signin(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(&state.auth.authorize_url())
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Handle the authorization-code callback.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>> {
    if let Some(error) = params.error {
        return Err(AppError::Auth(format!(
            "{}: {}",
            error,
            params.error_description.unwrap_or_default()
        )));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    let mut tokens = state.auth.exchange_code(&code).await?;

    // The token response carries no usable account identifier; resolve the
    // stable user ID from the Graph profile.
    let me = state.graph.get_me(&tokens.access_token).await?;
    let user_id = me.id.clone();
    tokens.account.account_id = user_id.clone();

    let record = UserRecord::new(user_id.clone(), tokens);
    let access_token = record.access_token.clone();
    state.registry.save_user(record).await;

    let subscription = state
        .graph
        .create(&access_token, &state.config.watched_resource)
        .await?;
    let subscription_id = subscription.id.clone();
    let expires_at = subscription.expires_at;
    state.registry.add_subscription(&user_id, subscription).await;

    tracing::info!(
        user_id = %user_id,
        principal = ?me.user_principal_name,
        subscription_id = %subscription_id,
        "Sign-in complete, subscription created"
    );

    Ok(Html(format!(
        "<!DOCTYPE html>\
         <html><head><meta charset=\"UTF-8\"><title>Signed in</title></head>\
         <body>\
         <h1>Signed in</h1>\
         <p>User ID: {}</p>\
         <p>Subscription ID: {}</p>\
         <p>Subscription expires: {}</p>\
         <p>Mailbox change notifications are now active and will be renewed \
            automatically.</p>\
         <p><a href=\"/status\">Status</a></p>\
         </body></html>",
        user_id, subscription_id, expires_at,
    )))
}
