//! HTTP handlers module

mod command;
mod states;

pub use self::command::*;
pub use self::states::*;

use axum::{response::IntoResponse, Json};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "rutx-sms-gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        Router,
    };
    use tower::ServiceExt;

    use crate::api::{routes, GatewayState};
    use crate::config::ClientConfig;
    use crate::dispatch::CommandDispatcher;
    use crate::rutx::transport::mock::MockTransport;
    use crate::rutx::RouterClient;
    use crate::state::StateStore;

    pub fn app(mock: &Arc<MockTransport>) -> (Router, Arc<StateStore>) {
        let client = RouterClient::with_transport(
            ClientConfig::new("192.168.1.1", "admin", "admin01"),
            mock.clone(),
        );
        let states = Arc::new(StateStore::new());
        let dispatcher = CommandDispatcher::new(Arc::new(client), states.clone()).spawn();
        let app = routes().with_state(GatewayState {
            dispatcher,
            states: states.clone(),
        });
        (app, states)
    }

    pub async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (u16, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = app
            .clone()
            .oneshot(req.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status().as_u16();
        let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::Method;

    use super::test_support::{app, call};
    use crate::rutx::transport::mock::MockTransport;

    #[tokio::test]
    async fn test_health_check() {
        let mock = Arc::new(MockTransport::new());
        let (app, _) = app(&mock);

        let (status, body) = call(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "rutx-sms-gateway");
    }
}
