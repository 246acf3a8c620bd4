//! Service layer: OAuth, Graph API, renewal orchestration, notifications.

pub mod auth;
pub mod graph;
pub mod notify;
pub mod renewal;

pub use auth::{AadAuthClient, CredentialClient, RefreshError};
pub use graph::{GraphApiError, GraphClient, SubscriptionClient};
pub use notify::{LogNotifier, ReauthNotifier, WebhookNotifier};
pub use renewal::{PassSummary, RenewalPolicy, RenewalScheduler, RenewalService};
