//! Command handlers
//!
//! POST /api/command relays the router operation's full result object.

use axum::{extract::State, Json};

use crate::api::GatewayState;
use crate::dispatch::CommandRequest;

/// POST /api/command - Run a router command
pub async fn run_command(
    State(state): State<GatewayState>,
    Json(req): Json<CommandRequest>,
) -> Json<serde_json::Value> {
    let result = state.dispatcher.dispatch(&req.command, req.message).await;
    Json(result)
}
