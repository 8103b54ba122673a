//! State handlers
//!
//! Hosts read published states and write the SMS control states. Writing
//! `sms.send = true` sends the SMS built from `sms.recipient`/`sms.message`.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::GatewayState;
use crate::dispatch::Command;
use crate::error::{AppError, RouterError};
use crate::models::{find_definition, state_ids, STATE_DEFINITIONS};

#[derive(Debug, Deserialize)]
pub struct WriteStateRequest {
    pub value: serde_json::Value,
}

/// GET /api/states - All states
pub async fn list_states(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.states.snapshot().await)
}

/// GET /api/states/:id - One state
pub async fn get_state(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .states
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("State {}", id)))
}

/// PUT /api/states/:id - Host write to a writable state
pub async fn write_state(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(req): Json<WriteStateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if find_definition(&id).is_none() {
        return Err(AppError::NotFound(format!("State {}", id)));
    }

    let trigger = id == state_ids::SMS_SEND && req.value == serde_json::Value::Bool(true);

    state
        .states
        .write(&id, req.value)
        .await
        .map_err(|e| match e {
            RouterError::Validation(msg) => AppError::BadRequest(msg),
            other => AppError::InternalError(other.to_string()),
        })?;

    if trigger {
        let result = state.dispatcher.submit(Command::SendFromStates).await;
        return Ok(Json(serde_json::json!({ "ok": true, "result": result })));
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/definitions - State definitions
pub async fn list_definitions() -> impl IntoResponse {
    Json(STATE_DEFINITIONS)
}
