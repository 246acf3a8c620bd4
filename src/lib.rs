// SPDX-License-Identifier: MIT

//! graph-watch: keep Microsoft Graph change-notification subscriptions alive.
//!
//! Users sign in once; after that a recurring renewal pass refreshes each
//! user's access credential and mailbox subscriptions before they expire,
//! flagging users whose only way back is an interactive sign-in.

pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use registry::UserRegistry;
use services::{AadAuthClient, GraphClient, RenewalScheduler};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<dyn UserRegistry>,
    pub auth: AadAuthClient,
    pub graph: Arc<GraphClient>,
    pub scheduler: Arc<RenewalScheduler>,
}
