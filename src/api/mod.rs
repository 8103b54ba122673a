//! API module - HTTP surface for the host platform

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::dispatch::DispatcherHandle;
use crate::state::StateStore;

/// Shared handler state
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: DispatcherHandle,
    pub states: Arc<StateStore>,
}

pub fn routes() -> Router<GatewayState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Router commands
        .route("/api/command", post(handlers::run_command))
        // States
        .route("/api/states", get(handlers::list_states))
        .route(
            "/api/states/:id",
            get(handlers::get_state).put(handlers::write_state),
        )
        .route("/api/definitions", get(handlers::list_definitions))
}
