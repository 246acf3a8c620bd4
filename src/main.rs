// SPDX-License-Identifier: MIT

//! graph-watch API server.
//!
//! Serves the sign-in flow and notification receiver, and runs the
//! background renewal scheduler that keeps credentials and Graph
//! subscriptions from expiring.

use std::sync::Arc;

use graph_watch::{
    config::Config,
    registry::MemoryRegistry,
    services::{
        AadAuthClient, GraphClient, LogNotifier, ReauthNotifier, RenewalPolicy, RenewalScheduler,
        RenewalService, WebhookNotifier,
    },
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting graph-watch");

    let registry: Arc<dyn graph_watch::registry::UserRegistry> = Arc::new(MemoryRegistry::new());
    let auth = AadAuthClient::new(&config);
    let graph = Arc::new(GraphClient::new(&config));

    let notifier: Arc<dyn ReauthNotifier> = match &config.reauth_webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Reauth notifications via webhook");
            Arc::new(WebhookNotifier::new(url.clone(), config.request_timeout()))
        }
        None => Arc::new(LogNotifier),
    };

    let renewal = Arc::new(RenewalService::new(
        Arc::clone(&registry),
        Arc::new(auth.clone()),
        Arc::clone(&graph) as Arc<dyn graph_watch::services::SubscriptionClient>,
        notifier,
        RenewalPolicy::from_config(&config),
    ));

    let scheduler = Arc::new(RenewalScheduler::new(renewal, config.tick_period()));
    scheduler.start();

    let state = Arc::new(AppState {
        config: config.clone(),
        registry,
        auth,
        graph,
        scheduler,
    });

    let app = graph_watch::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("graph_watch=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
