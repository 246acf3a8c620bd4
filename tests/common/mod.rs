// SPDX-License-Identifier: MIT

//! Shared test fixtures: recording mock clients and app/service builders.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use graph_watch::config::Config;
use graph_watch::models::{AccountHandle, SubscriptionRecord, TokenSet, UserRecord};
use graph_watch::registry::{MemoryRegistry, UserRegistry};
use graph_watch::routes::create_router;
use graph_watch::services::{
    AadAuthClient, CredentialClient, GraphApiError, GraphClient, ReauthNotifier, RefreshError,
    RenewalPolicy, RenewalScheduler, RenewalService, SubscriptionClient,
};
use graph_watch::AppState;

// ============================================================================
// MockCredentialClient
// ============================================================================

#[derive(Clone, Copy)]
#[allow(dead_code)]
pub enum RefreshBehavior {
    Succeed,
    ReauthRequired,
    Transient,
}

/// Credential client with per-account scripted behavior; records every call.
pub struct MockCredentialClient {
    behaviors: Mutex<HashMap<String, RefreshBehavior>>,
    /// Account IDs passed to `refresh`, in call order.
    pub calls: Mutex<Vec<String>>,
}

impl MockCredentialClient {
    pub fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[allow(dead_code)]
    pub fn set_behavior(&self, account_id: &str, behavior: RefreshBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(account_id.to_string(), behavior);
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialClient for MockCredentialClient {
    async fn refresh(&self, account: &AccountHandle) -> Result<TokenSet, RefreshError> {
        self.calls.lock().unwrap().push(account.account_id.clone());

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&account.account_id)
            .copied()
            .unwrap_or(RefreshBehavior::Succeed);

        match behavior {
            RefreshBehavior::Succeed => Ok(TokenSet {
                access_token: format!("refreshed-{}", account.account_id),
                expires_at: Utc::now() + Duration::hours(1),
                account: account.clone(),
            }),
            RefreshBehavior::ReauthRequired => {
                Err(RefreshError::ReauthRequired("invalid_grant".to_string()))
            }
            RefreshBehavior::Transient => {
                Err(RefreshError::Transient("connection reset".to_string()))
            }
        }
    }
}

// ============================================================================
// MockSubscriptionClient
// ============================================================================

#[derive(Clone, Copy)]
#[allow(dead_code)]
pub enum RenewBehavior {
    Succeed,
    NotFound,
    Unauthorized,
    RateLimited,
    Other,
}

/// Subscription client with per-subscription scripted behavior; records the
/// token and subscription ID of every renew call.
pub struct MockSubscriptionClient {
    behaviors: Mutex<HashMap<String, RenewBehavior>>,
    /// (access_token, subscription_id) pairs passed to `renew`, in call order.
    pub renew_calls: Mutex<Vec<(String, String)>>,
}

impl MockSubscriptionClient {
    pub fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            renew_calls: Mutex::new(Vec::new()),
        }
    }

    #[allow(dead_code)]
    pub fn set_behavior(&self, subscription_id: &str, behavior: RenewBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(subscription_id.to_string(), behavior);
    }

    #[allow(dead_code)]
    pub fn renew_count(&self) -> usize {
        self.renew_calls.lock().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn renewed_ids(&self) -> Vec<String> {
        self.renew_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }
}

#[async_trait]
impl SubscriptionClient for MockSubscriptionClient {
    async fn create(
        &self,
        _access_token: &str,
        resource: &str,
    ) -> Result<SubscriptionRecord, GraphApiError> {
        Ok(SubscriptionRecord {
            id: format!("sub-{}", resource.len()),
            resource: resource.to_string(),
            expires_at: Utc::now() + Duration::minutes(4230),
        })
    }

    async fn renew(
        &self,
        access_token: &str,
        subscription_id: &str,
    ) -> Result<DateTime<Utc>, GraphApiError> {
        self.renew_calls
            .lock()
            .unwrap()
            .push((access_token.to_string(), subscription_id.to_string()));

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(subscription_id)
            .copied()
            .unwrap_or(RenewBehavior::Succeed);

        match behavior {
            RenewBehavior::Succeed => Ok(Utc::now() + Duration::minutes(4230)),
            RenewBehavior::NotFound => Err(GraphApiError::NotFound),
            RenewBehavior::Unauthorized => Err(GraphApiError::Unauthorized),
            RenewBehavior::RateLimited => Err(GraphApiError::RateLimited),
            RenewBehavior::Other => Err(GraphApiError::Other("HTTP 503".to_string())),
        }
    }

    async fn delete(
        &self,
        _access_token: &str,
        _subscription_id: &str,
    ) -> Result<(), GraphApiError> {
        Ok(())
    }
}

// ============================================================================
// RecordingNotifier
// ============================================================================

/// Notifier that records delivered user IDs.
#[derive(Default)]
pub struct RecordingNotifier {
    pub delivered: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    #[allow(dead_code)]
    pub fn deliveries_for(&self, user_id: &str) -> usize {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == user_id)
            .count()
    }
}

#[async_trait]
impl ReauthNotifier for RecordingNotifier {
    async fn deliver(&self, user_id: &str) {
        self.delivered.lock().unwrap().push(user_id.to_string());
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Renewal service wired to mocks, with handles to inspect them.
pub struct RenewalHarness {
    pub registry: Arc<MemoryRegistry>,
    pub credentials: Arc<MockCredentialClient>,
    pub subscriptions: Arc<MockSubscriptionClient>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: Arc<RenewalService>,
}

#[allow(dead_code)]
pub fn renewal_harness() -> RenewalHarness {
    let registry = Arc::new(MemoryRegistry::new());
    let credentials = Arc::new(MockCredentialClient::new());
    let subscriptions = Arc::new(MockSubscriptionClient::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let service = Arc::new(RenewalService::new(
        Arc::clone(&registry) as Arc<dyn UserRegistry>,
        Arc::clone(&credentials) as Arc<dyn CredentialClient>,
        Arc::clone(&subscriptions) as Arc<dyn SubscriptionClient>,
        Arc::clone(&notifier) as Arc<dyn ReauthNotifier>,
        RenewalPolicy::from_config(&Config::default()),
    ));

    RenewalHarness {
        registry,
        credentials,
        subscriptions,
        notifier,
        service,
    }
}

/// A user record whose credential expires `token_expires_in` from now, with
/// one subscription per `(id, expires_in)` pair.
#[allow(dead_code)]
pub fn user_record(
    user_id: &str,
    token_expires_in: Duration,
    subscriptions: &[(&str, Duration)],
) -> UserRecord {
    let now = Utc::now();
    UserRecord {
        user_id: user_id.to_string(),
        account: AccountHandle {
            account_id: user_id.to_string(),
            refresh_token: format!("rt-{}", user_id),
        },
        access_token: format!("at-{}", user_id),
        token_expires_at: now + token_expires_in,
        subscriptions: subscriptions
            .iter()
            .map(|(id, expires_in)| SubscriptionRecord {
                id: id.to_string(),
                resource: "/me/mailFolders/inbox/messages".to_string(),
                expires_at: now + *expires_in,
            })
            .collect(),
    }
}

/// Create a test app with offline dependencies.
/// Returns the router, the shared state and the renewal harness behind it.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, RenewalHarness) {
    let config = Config::default();
    let harness = renewal_harness();

    let scheduler = Arc::new(RenewalScheduler::new(
        Arc::clone(&harness.service),
        config.tick_period(),
    ));

    let state = Arc::new(AppState {
        auth: AadAuthClient::new(&config),
        graph: Arc::new(GraphClient::new(&config)),
        registry: Arc::clone(&harness.registry) as Arc<dyn UserRegistry>,
        scheduler,
        config,
    });

    (create_router(state.clone()), state, harness)
}
