//! Data models for users, tokens and subscriptions.

pub mod user;

pub use user::{AccountHandle, SubscriptionRecord, TokenSet, UserRecord};
