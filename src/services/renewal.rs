// SPDX-License-Identifier: MIT

//! Credential and subscription renewal.
//!
//! A renewal pass walks one snapshot of the user registry and, per user,
//! refreshes the access credential and then each due subscription. The two
//! expiries are tracked independently: renewing one never implicitly renews
//! the other. Users are processed in isolation so one user's failure cannot
//! block another's renewals, and the orchestrator keeps no state between
//! passes: re-running a pass is idempotent, and a missed tick just means the
//! next one catches a larger due-set.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;

use crate::config::Config;
use crate::models::UserRecord;
use crate::registry::UserRegistry;
use crate::services::auth::{CredentialClient, RefreshError};
use crate::services::graph::{GraphApiError, SubscriptionClient};
use crate::services::notify::ReauthNotifier;

/// How many users a pass works on at once. Per-subscription ordering within
/// one user stays strictly sequential.
const MAX_CONCURRENT_USERS: usize = 4;

/// Is the access credential inside its renewal lead-time window?
pub fn credential_due(expires_at: DateTime<Utc>, now: DateTime<Utc>, lead: Duration) -> bool {
    expires_at - now < lead
}

/// Is a subscription inside its renewal lead-time window?
pub fn subscription_due(expires_at: DateTime<Utc>, now: DateTime<Utc>, lead: Duration) -> bool {
    expires_at - now < lead
}

/// Lead-time windows for the due checks, taken from configuration. Both
/// defaults cover at least two tick periods so a single missed tick is
/// harmless.
#[derive(Debug, Clone, Copy)]
pub struct RenewalPolicy {
    pub credential_lead: Duration,
    pub subscription_lead: Duration,
}

impl RenewalPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            credential_lead: Duration::seconds(config.credential_lead_secs),
            subscription_lead: Duration::seconds(config.subscription_lead_secs),
        }
    }
}

/// Aggregate result of one renewal pass, for logging and diagnostics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PassSummary {
    /// Users in the snapshot
    pub users: usize,
    pub credentials_renewed: usize,
    pub subscriptions_renewed: usize,
    /// Stale subscriptions pruned after a remote 404
    pub subscriptions_pruned: usize,
    /// Users signaled for interactive re-authentication
    pub reauths_signaled: usize,
    /// Transient or unclassified failures left for the next pass
    pub failures: usize,
}

/// Outcome of processing a single user.
#[derive(Debug, Default)]
struct UserOutcome {
    credential_renewed: bool,
    subscriptions_renewed: usize,
    subscriptions_pruned: usize,
    reauth_signaled: bool,
    failures: usize,
}

/// Drives renewal passes over the registry through the injected clients.
pub struct RenewalService {
    registry: Arc<dyn UserRegistry>,
    credentials: Arc<dyn CredentialClient>,
    subscriptions: Arc<dyn SubscriptionClient>,
    notifier: Arc<dyn ReauthNotifier>,
    policy: RenewalPolicy,
    /// Serializes passes: the interval loop and manual triggers never overlap.
    pass_lock: tokio::sync::Mutex<()>,
}

impl RenewalService {
    pub fn new(
        registry: Arc<dyn UserRegistry>,
        credentials: Arc<dyn CredentialClient>,
        subscriptions: Arc<dyn SubscriptionClient>,
        notifier: Arc<dyn ReauthNotifier>,
        policy: RenewalPolicy,
    ) -> Self {
        Self {
            registry,
            credentials,
            subscriptions,
            notifier,
            policy,
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one full renewal pass over a snapshot of all users.
    pub async fn run_pass(&self) -> PassSummary {
        let _guard = self.pass_lock.lock().await;

        let now = Utc::now();
        let users = self.registry.list_all().await;

        let mut summary = PassSummary {
            users: users.len(),
            ..Default::default()
        };

        if users.is_empty() {
            tracing::debug!("Renewal pass: no registered users");
            return summary;
        }

        tracing::info!(users = users.len(), "Renewal pass started");

        let outcomes: Vec<UserOutcome> = stream::iter(users)
            .map(|user| self.process_user(user, now))
            .buffer_unordered(MAX_CONCURRENT_USERS)
            .collect()
            .await;

        for outcome in outcomes {
            summary.credentials_renewed += outcome.credential_renewed as usize;
            summary.subscriptions_renewed += outcome.subscriptions_renewed;
            summary.subscriptions_pruned += outcome.subscriptions_pruned;
            summary.reauths_signaled += outcome.reauth_signaled as usize;
            summary.failures += outcome.failures;
        }

        tracing::info!(
            users = summary.users,
            credentials_renewed = summary.credentials_renewed,
            subscriptions_renewed = summary.subscriptions_renewed,
            subscriptions_pruned = summary.subscriptions_pruned,
            reauths_signaled = summary.reauths_signaled,
            failures = summary.failures,
            "Renewal pass finished"
        );

        summary
    }

    /// Process one user: credential stage, then subscription stage.
    ///
    /// Infallible by construction; every remote failure is classified and
    /// folded into the outcome, so no user can abort the pass for another.
    async fn process_user(&self, user: UserRecord, now: DateTime<Utc>) -> UserOutcome {
        let mut outcome = UserOutcome::default();
        let user_id = user.user_id.as_str();

        // Credential stage. On success the refreshed token is used for the
        // subscription stage below.
        let mut access_token = user.access_token.clone();

        if credential_due(user.token_expires_at, now, self.policy.credential_lead) {
            tracing::info!(user_id, "Refreshing access credential");

            match self.credentials.refresh(&user.account).await {
                Ok(tokens) => {
                    self.registry.update_credential(user_id, &tokens).await;
                    access_token = tokens.access_token;
                    outcome.credential_renewed = true;
                    tracing::info!(user_id, expires_at = %tokens.expires_at, "Credential refreshed");
                }
                Err(RefreshError::ReauthRequired(reason)) => {
                    // The stored credential is stale and subscription calls
                    // would fail anyway; skip the rest of this user's work.
                    tracing::error!(user_id, %reason, "Silent refresh impossible");
                    self.notifier.deliver(user_id).await;
                    outcome.reauth_signaled = true;
                    return outcome;
                }
                Err(RefreshError::Transient(reason)) => {
                    // Still worth attempting subscription renewals with the
                    // existing token; it may not have expired yet.
                    tracing::warn!(user_id, %reason, "Credential refresh failed, retrying next pass");
                    outcome.failures += 1;
                }
            }
        }

        // Subscription stage, strictly in order within this user.
        for sub in &user.subscriptions {
            if !subscription_due(sub.expires_at, now, self.policy.subscription_lead) {
                continue;
            }

            match self.subscriptions.renew(&access_token, &sub.id).await {
                Ok(new_expiry) => {
                    self.registry
                        .update_subscription_expiry(user_id, &sub.id, new_expiry)
                        .await;
                    outcome.subscriptions_renewed += 1;
                    tracing::info!(
                        user_id,
                        subscription_id = %sub.id,
                        expires_at = %new_expiry,
                        "Subscription renewed"
                    );
                }
                Err(GraphApiError::NotFound) => {
                    // Gone on the remote side; it can never become renewable
                    // again, so drop the record.
                    tracing::warn!(user_id, subscription_id = %sub.id, "Subscription gone remotely, pruning");
                    self.registry.remove_subscription(user_id, &sub.id).await;
                    outcome.subscriptions_pruned += 1;
                }
                Err(GraphApiError::Unauthorized) => {
                    // The token was acquired but is not accepted: treat as a
                    // reauth signal and abandon this user's remaining
                    // subscriptions for this pass.
                    tracing::error!(user_id, subscription_id = %sub.id, "Subscription renewal unauthorized");
                    self.notifier.deliver(user_id).await;
                    outcome.reauth_signaled = true;
                    break;
                }
                Err(GraphApiError::RateLimited) => {
                    // Expiry untouched, so it stays due and is naturally
                    // retried next pass.
                    tracing::warn!(user_id, subscription_id = %sub.id, "Rate limited, retrying next pass");
                    outcome.failures += 1;
                }
                Err(GraphApiError::Other(detail)) => {
                    tracing::warn!(user_id, subscription_id = %sub.id, %detail, "Subscription renewal failed");
                    outcome.failures += 1;
                }
            }
        }

        outcome
    }
}

/// Owns the recurring renewal loop.
///
/// Explicit lifecycle state rather than ambient module state, so tests can
/// drive single passes deterministically through [`RenewalScheduler::run_now`].
pub struct RenewalScheduler {
    service: Arc<RenewalService>,
    tick_period: std::time::Duration,
    handle: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl RenewalScheduler {
    pub fn new(service: Arc<RenewalService>, tick_period: std::time::Duration) -> Self {
        Self {
            service,
            tick_period,
            handle: std::sync::Mutex::new(None),
        }
    }

    /// Start the recurring loop. The first pass runs immediately. Calling
    /// start on a running scheduler is a no-op.
    pub fn start(&self) {
        let mut handle = self.handle.lock().expect("scheduler lock poisoned");

        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::debug!("Renewal scheduler already running");
            return;
        }

        let service = Arc::clone(&self.service);
        let tick_period = self.tick_period;

        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                service.run_pass().await;
            }
        }));

        tracing::info!(tick_secs = self.tick_period.as_secs(), "Renewal scheduler started");
    }

    /// Stop the recurring loop. A pass in flight is aborted; that is safe
    /// because the next pass re-evaluates due-ness from scratch. Calling stop
    /// on a stopped scheduler is a no-op.
    pub fn stop(&self) {
        let mut handle = self.handle.lock().expect("scheduler lock poisoned");

        if let Some(task) = handle.take() {
            task.abort();
            tracing::info!("Renewal scheduler stopped");
        } else {
            tracing::debug!("Renewal scheduler already stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .expect("scheduler lock poisoned")
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Run a single pass immediately, regardless of scheduler state. The
    /// pass lock inside [`RenewalService`] keeps it from overlapping a
    /// scheduled pass.
    pub async fn run_now(&self) -> PassSummary {
        self.service.run_pass().await
    }
}
