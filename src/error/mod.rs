//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures talking to the router REST API
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Auth(String),

    #[error("Authentication token expired")]
    SessionExpired,

    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RouterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RouterError::Network(format!("request timed out: {}", e))
        } else {
            RouterError::Network(e.to_string())
        }
    }
}

/// Errors surfaced by the host HTTP API
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_carries_status_and_body() {
        let err = RouterError::Api {
            status: 500,
            body: "{\"error\":\"modem busy\"}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error: 500 - {\"error\":\"modem busy\"}"
        );
    }

    #[test]
    fn test_session_expired_message() {
        assert!(RouterError::SessionExpired
            .to_string()
            .contains("token expired"));
    }

    #[test]
    fn test_app_error_status_codes() {
        let resp = AppError::NotFound("state x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::BadRequest("read-only".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
