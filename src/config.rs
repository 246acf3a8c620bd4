//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Azure AD application ---
    /// Azure AD application (client) ID
    pub client_id: String,
    /// Azure AD tenant ID (or "common")
    pub tenant_id: String,
    /// Azure AD client secret
    pub client_secret: String,
    /// OAuth redirect URI back to this service
    pub redirect_uri: String,

    // --- Graph subscriptions ---
    /// Public URL Graph delivers change notifications to
    pub notification_url: String,
    /// Shared secret echoed back in every notification's clientState
    pub client_state_secret: String,
    /// Resource path new subscriptions watch
    pub watched_resource: String,

    // --- Notifications ---
    /// Optional webhook to deliver reauth events to; log-only when unset
    pub reauth_webhook_url: Option<String>,

    // --- Server ---
    pub port: u16,

    // --- Renewal timing ---
    /// Seconds between renewal passes
    pub renewal_tick_secs: u64,
    /// Renew the credential when it expires within this many seconds
    pub credential_lead_secs: i64,
    /// Renew a subscription when it expires within this many seconds
    pub subscription_lead_secs: i64,
    /// Timeout for every outbound call
    pub request_timeout_secs: u64,
    /// Lifetime requested for created/renewed subscriptions (Graph caps
    /// mailbox subscriptions at 4230 minutes)
    pub subscription_lifetime_mins: i64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            tenant_id: "test-tenant".to_string(),
            client_secret: "test_secret".to_string(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            notification_url: "http://localhost:3000/api/notifications".to_string(),
            client_state_secret: "test_client_state".to_string(),
            watched_resource: "/me/mailFolders/inbox/messages".to_string(),
            reauth_webhook_url: None,
            port: 3000,
            renewal_tick_secs: 5 * 60,
            credential_lead_secs: 10 * 60,
            subscription_lead_secs: 60 * 60,
            request_timeout_secs: 30,
            subscription_lifetime_mins: 4230,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            client_id: env::var("CLIENT_ID").map_err(|_| ConfigError::Missing("CLIENT_ID"))?,
            tenant_id: env::var("TENANT_ID").map_err(|_| ConfigError::Missing("TENANT_ID"))?,
            client_secret: env::var("CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLIENT_SECRET"))?,
            redirect_uri: env::var("REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("REDIRECT_URI"))?,
            notification_url: env::var("NOTIFICATION_URL")
                .map_err(|_| ConfigError::Missing("NOTIFICATION_URL"))?,
            client_state_secret: env::var("CLIENT_STATE_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLIENT_STATE_SECRET"))?,
            watched_resource: env::var("WATCHED_RESOURCE")
                .unwrap_or_else(|_| "/me/mailFolders/inbox/messages".to_string()),
            reauth_webhook_url: env::var("REAUTH_WEBHOOK_URL").ok(),
            port: env_parse("PORT", 3000),
            renewal_tick_secs: env_parse("RENEWAL_TICK_SECS", 5 * 60),
            credential_lead_secs: env_parse("CREDENTIAL_LEAD_SECS", 10 * 60),
            subscription_lead_secs: env_parse("SUBSCRIPTION_LEAD_SECS", 60 * 60),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            subscription_lifetime_mins: env_parse("SUBSCRIPTION_LIFETIME_MINS", 4230),
        })
    }

    /// Timeout applied to every outbound HTTP call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Period between renewal passes.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.renewal_tick_secs)
    }
}

/// Read an env var and parse it, falling back to the default when unset or
/// unparseable.
fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
