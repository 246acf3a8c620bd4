// SPDX-License-Identifier: MIT

//! Azure AD OAuth client: authorization-code exchange and silent refresh.
//!
//! The renewal orchestrator depends on the [`CredentialClient`] trait only.
//! The concrete [`AadAuthClient`] talks to the Azure AD v2 token endpoint and
//! preserves the two-way failure split the orchestrator relies on:
//! [`RefreshError::ReauthRequired`] when the silent refresh path is gone
//! (revoked or expired grant, consent needed) versus
//! [`RefreshError::Transient`] for anything worth retrying next pass.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::config::Config;
use crate::models::{AccountHandle, TokenSet};

/// OAuth scopes requested at sign-in and on refresh.
const SCOPES: &str = "User.Read Mail.Read offline_access";

/// Failure modes of a silent credential refresh.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// No non-interactive refresh path remains; the user must sign in again.
    #[error("re-authorization required: {0}")]
    ReauthRequired(String),

    /// Transient failure (network, throttling, server error); retry next pass.
    #[error("transient refresh failure: {0}")]
    Transient(String),
}

/// Acquires fresh access credentials for a stored account identity.
#[async_trait]
pub trait CredentialClient: Send + Sync {
    /// Attempt a non-interactive refresh using only the stored handle.
    async fn refresh(&self, account: &AccountHandle) -> Result<TokenSet, RefreshError>;
}

/// Azure AD v2 OAuth client.
#[derive(Clone)]
pub struct AadAuthClient {
    http: reqwest::Client,
    authority: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

/// Success body of the AAD v2 token endpoint.
#[derive(Debug, Deserialize)]
struct AadTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Error body of the AAD v2 token endpoint.
#[derive(Debug, Deserialize)]
struct AadErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// AAD error codes that mean the refresh path itself is dead and only an
/// interactive sign-in can recover. Everything else is retryable.
const REAUTH_ERROR_CODES: &[&str] = &[
    "invalid_grant",
    "interaction_required",
    "consent_required",
    "login_required",
];

impl AadAuthClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(config.request_timeout())
                .build()
                .unwrap_or_default(),
            authority: format!("https://login.microsoftonline.com/{}", config.tenant_id),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// Build the interactive authorization URL for sign-in.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/oauth2/v2.0/authorize?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}",
            self.authority,
            self.client_id,
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPES),
        )
    }

    /// Exchange an authorization code for tokens (initial sign-in).
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, RefreshError> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("scope", SCOPES),
        ])
        .await
    }

    /// POST to the token endpoint and classify the outcome.
    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, RefreshError> {
        let url = format!("{}/oauth2/v2.0/token", self.authority);

        let response = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| RefreshError::Transient(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if let Ok(err) = serde_json::from_str::<AadErrorResponse>(&body) {
                if REAUTH_ERROR_CODES.contains(&err.error.as_str()) {
                    return Err(RefreshError::ReauthRequired(format!(
                        "{}: {}",
                        err.error, err.error_description
                    )));
                }
            }

            // 429 and 5xx land here: worth retrying on a later pass.
            return Err(RefreshError::Transient(format!("HTTP {}: {}", status, body)));
        }

        let token: AadTokenResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::Transient(format!("token parse error: {}", e)))?;

        // Expiry is anchored at response time, so a successful refresh always
        // lands later than any expiry observed before the call began.
        let expires_at = Utc::now() + Duration::seconds(token.expires_in);

        let refresh_token = token.refresh_token.ok_or_else(|| {
            RefreshError::ReauthRequired("no refresh token issued (offline_access missing)".into())
        })?;

        // The token endpoint does not carry a usable account identifier in
        // the JSON body; callers fill it in (the sign-in flow resolves it via
        // Graph /me, the refresh path carries the stored one forward).
        Ok(TokenSet {
            access_token: token.access_token,
            expires_at,
            account: AccountHandle {
                account_id: String::new(),
                refresh_token,
            },
        })
    }
}

#[async_trait]
impl CredentialClient for AadAuthClient {
    async fn refresh(&self, account: &AccountHandle) -> Result<TokenSet, RefreshError> {
        let mut tokens = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", account.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
                ("scope", SCOPES),
            ])
            .await?;

        // Carry the stable account id forward; the rotated refresh token from
        // the response is already in place.
        if tokens.account.account_id.is_empty() {
            tokens.account.account_id = account.account_id.clone();
        }

        Ok(tokens)
    }
}
