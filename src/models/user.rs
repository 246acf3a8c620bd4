//! User, credential and subscription records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Handle for requesting a silent token refresh on behalf of a user.
///
/// Captured once at sign-in and carried forward unchanged; it is never
/// re-derived from other state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountHandle {
    /// Stable account identifier from the identity provider
    pub account_id: String,
    /// Refresh token backing the silent refresh path
    pub refresh_token: String,
}

/// An access token together with its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token for Graph API calls
    pub access_token: String,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
    /// Account handle for subsequent silent refreshes
    pub account: AccountHandle,
}

/// A Graph change-notification subscription tracked for renewal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Subscription ID assigned by Graph at creation; immutable
    pub id: String,
    /// Resource path the subscription watches; immutable
    pub resource: String,
    /// When the subscription expires (UTC); moved only by a successful renewal
    pub expires_at: DateTime<Utc>,
}

/// Everything the renewal pass needs to know about one signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Opaque user ID, unique and stable across renewals
    pub user_id: String,
    /// Handle for silent credential refresh
    pub account: AccountHandle,
    /// Current access token
    pub access_token: String,
    /// When the access token expires (UTC)
    pub token_expires_at: DateTime<Utc>,
    /// Subscriptions owned by this user, keyed by subscription ID
    pub subscriptions: Vec<SubscriptionRecord>,
}

impl UserRecord {
    /// Build a fresh record from the token set returned by sign-in.
    pub fn new(user_id: String, tokens: TokenSet) -> Self {
        Self {
            user_id,
            account: tokens.account,
            access_token: tokens.access_token,
            token_expires_at: tokens.expires_at,
            subscriptions: Vec::new(),
        }
    }
}
