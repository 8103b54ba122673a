//! rutx-sms-gateway - SMS and signal gateway for Teltonika RUTX routers
//!
//! Talks to the router's local REST API, keeps connection and signal
//! states fresh, and exposes SMS/test commands to the home-automation host.

mod api;
mod config;
mod dispatch;
mod error;
mod models;
mod rutx;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::GatewayState;
use crate::dispatch::CommandDispatcher;
use crate::rutx::{RouterClient, StatusPoller};
use crate::state::StateStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rutx_sms_gateway=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting rutx-sms-gateway...");

    // Load configuration
    let config = config::Config::load()?;
    let client_config = config.client_config()?;
    tracing::info!(
        "Configuration loaded (router {}, modem priority {})",
        client_config.host,
        client_config.modem_priority.join(" > ")
    );

    let client = Arc::new(RouterClient::new(client_config)?);
    let states = Arc::new(StateStore::new());

    // Initial connection test publishes connection and signal states
    let poller = Arc::new(StatusPoller::new(
        client.clone(),
        states.clone(),
        Duration::from_secs(config.poller.interval_secs.max(1)),
    ));
    if poller.poll_once().await {
        tracing::info!("Connected to RUTX50 at {}", client.config().host);
    }

    start_background_tasks(poller);

    let dispatcher = CommandDispatcher::new(client, states.clone()).spawn();

    // Build application router
    let app = api::routes()
        .with_state(GatewayState { dispatcher, states })
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("rutx-sms-gateway stopped");
    Ok(())
}

/// Start background tasks (status poller)
fn start_background_tasks(poller: Arc<StatusPoller>) {
    tokio::spawn(async move {
        poller.start().await;
    });

    tracing::info!("Background tasks started");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
