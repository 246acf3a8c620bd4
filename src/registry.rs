// SPDX-License-Identifier: MIT

//! User registry: the store of per-user credential and subscription state.
//!
//! The renewal orchestrator only ever sees the [`UserRegistry`] trait, so a
//! persistent backend can replace [`MemoryRegistry`] without touching it.
//! All mutation operations are no-ops on unknown IDs: the renewal pass works
//! from a snapshot that may race with user deletion, and a record that
//! disappeared between `list_all` and an update is not an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::{SubscriptionRecord, TokenSet, UserRecord};

/// Storage contract consumed by the renewal orchestrator and HTTP routes.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Point-in-time snapshot of all user records. Mutations after the call
    /// do not affect the returned sequence.
    async fn list_all(&self) -> Vec<UserRecord>;

    /// Insert or replace a user record (on successful sign-in).
    async fn save_user(&self, record: UserRecord);

    /// Look up a single user.
    async fn get_user(&self, user_id: &str) -> Option<UserRecord>;

    /// Replace a user's access token and expiry. No-op on unknown user.
    async fn update_credential(&self, user_id: &str, tokens: &TokenSet);

    /// Attach a subscription to a user. No-op on unknown user.
    async fn add_subscription(&self, user_id: &str, subscription: SubscriptionRecord);

    /// Move a subscription's expiry. No-op on unknown user or subscription.
    async fn update_subscription_expiry(
        &self,
        user_id: &str,
        subscription_id: &str,
        expires_at: DateTime<Utc>,
    );

    /// Drop a subscription record (stale on the remote side). No-op on
    /// unknown user or subscription.
    async fn remove_subscription(&self, user_id: &str, subscription_id: &str);

    /// Delete a user record entirely. Returns whether a record existed.
    async fn remove_user(&self, user_id: &str) -> bool;
}

/// In-memory registry backed by a concurrent map.
#[derive(Default)]
pub struct MemoryRegistry {
    users: DashMap<String, UserRecord>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRegistry for MemoryRegistry {
    async fn list_all(&self) -> Vec<UserRecord> {
        self.users.iter().map(|entry| entry.value().clone()).collect()
    }

    async fn save_user(&self, record: UserRecord) {
        tracing::info!(user_id = %record.user_id, "User record saved");
        self.users.insert(record.user_id.clone(), record);
    }

    async fn get_user(&self, user_id: &str) -> Option<UserRecord> {
        self.users.get(user_id).map(|entry| entry.value().clone())
    }

    async fn update_credential(&self, user_id: &str, tokens: &TokenSet) {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.access_token = tokens.access_token.clone();
            user.token_expires_at = tokens.expires_at;
            user.account = tokens.account.clone();
        }
    }

    async fn add_subscription(&self, user_id: &str, subscription: SubscriptionRecord) {
        if let Some(mut user) = self.users.get_mut(user_id) {
            tracing::info!(
                user_id,
                subscription_id = %subscription.id,
                "Subscription added"
            );
            user.subscriptions.push(subscription);
        }
    }

    async fn update_subscription_expiry(
        &self,
        user_id: &str,
        subscription_id: &str,
        expires_at: DateTime<Utc>,
    ) {
        if let Some(mut user) = self.users.get_mut(user_id) {
            if let Some(sub) = user
                .subscriptions
                .iter_mut()
                .find(|s| s.id == subscription_id)
            {
                sub.expires_at = expires_at;
            }
        }
    }

    async fn remove_subscription(&self, user_id: &str, subscription_id: &str) {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.subscriptions.retain(|s| s.id != subscription_id);
        }
    }

    async fn remove_user(&self, user_id: &str) -> bool {
        self.users.remove(user_id).is_some()
    }
}
