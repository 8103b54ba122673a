//! Session token lifecycle
//!
//! Two states: no token held (unauthenticated) or one token held. Tokens
//! carry no expiry; a 401 from the router is the only expiry signal.
//! Logins are single-flight so concurrent callers without a token share
//! one `/api/login` round-trip.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::error::RouterError;
use crate::rutx::transport::{ApiRequest, Transport};

const LOGIN_PATH: &str = "/api/login";

#[derive(Debug, Clone)]
pub struct SessionToken {
    value: String,
    acquired_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

pub struct SessionManager {
    transport: Arc<dyn Transport>,
    username: String,
    password: String,
    token: RwLock<Option<SessionToken>>,
    login_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, username: String, password: String) -> Self {
        Self {
            transport,
            username,
            password,
            token: RwLock::new(None),
            login_lock: Mutex::new(()),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn current_token(&self) -> Option<SessionToken> {
        self.token.read().await.clone()
    }

    /// Always posts credentials, replacing any held token
    pub async fn authenticate(&self) -> Result<String, RouterError> {
        let _guard = self.login_lock.lock().await;
        self.login().await
    }

    /// Held token, or a fresh login if none is held
    pub async fn ensure_token(&self) -> Result<String, RouterError> {
        if let Some(t) = self.token.read().await.as_ref() {
            return Ok(t.value.clone());
        }

        let _guard = self.login_lock.lock().await;

        // Another caller may have logged in while we waited
        if let Some(t) = self.token.read().await.as_ref() {
            return Ok(t.value.clone());
        }

        self.login().await
    }

    /// Drop the held token unconditionally (logout)
    pub async fn invalidate(&self) {
        let mut token = self.token.write().await;
        if token.take().is_some() {
            tracing::debug!("[Session] Token cleared");
        }
    }

    /// Drop the held token only if it is the one the router rejected.
    /// A newer token from a concurrent login is kept.
    pub async fn invalidate_token(&self, rejected: &str) {
        let mut token = self.token.write().await;
        let age = token
            .as_ref()
            .filter(|t| t.value == rejected)
            .map(|t| Utc::now() - t.acquired_at());

        if let Some(age) = age {
            tracing::info!(
                "[Session] Token rejected by router after {}s, session invalidated",
                age.num_seconds()
            );
            *token = None;
        }
    }

    async fn login(&self) -> Result<String, RouterError> {
        tracing::info!("[Session] Authenticating as {}", self.username);
        tracing::debug!(
            "[Session] POST {} {{\"username\":\"{}\",\"password\":\"***\"}}",
            LOGIN_PATH,
            self.username
        );

        let body = serde_json::json!({
            "username": self.username,
            "password": self.password,
        });

        let result = match self.transport.request(ApiRequest::post(LOGIN_PATH, body)).await {
            Ok(resp) if (200..300).contains(&resp.status) => {
                let success = resp.data["success"].as_bool().unwrap_or(false);
                match resp.data["data"]["token"].as_str() {
                    Some(token) if success && !token.is_empty() => Ok(token.to_string()),
                    _ => Err(RouterError::Auth("No token received from login".to_string())),
                }
            }
            Ok(resp) => Err(RouterError::Auth(format!(
                "Authentication failed: login returned status {} - {}",
                resp.status,
                resp.body_text()
            ))),
            Err(e) => Err(RouterError::Auth(format!("Authentication failed: {}", e))),
        };

        let mut token = self.token.write().await;
        match result {
            Ok(value) => {
                *token = Some(SessionToken {
                    value: value.clone(),
                    acquired_at: Utc::now(),
                });
                tracing::info!("[Session] Authentication successful");
                Ok(value)
            }
            Err(e) => {
                *token = None;
                tracing::error!("[Session] {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rutx::transport::mock::MockTransport;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn manager(mock: &Arc<MockTransport>) -> SessionManager {
        SessionManager::new(mock.clone(), "admin".into(), "admin01".into())
    }

    fn login_ok(token: &str) -> serde_json::Value {
        json!({"success": true, "data": {"token": token}})
    }

    #[tokio::test]
    async fn test_authenticate_stores_token() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 200, login_ok("tok-1"));
        let session = manager(&mock);

        let token = assert_ok!(session.authenticate().await);
        assert_eq!(token, "tok-1");
        assert_eq!(session.current_token().await.unwrap().value(), "tok-1");

        let calls = mock.calls_to(LOGIN_PATH);
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].body,
            Some(json!({"username": "admin", "password": "admin01"}))
        );
        assert!(calls[0].bearer.is_none());
    }

    #[tokio::test]
    async fn test_login_without_token_stays_unauthenticated() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 200, json!({"success": false}));
        let session = manager(&mock);

        let err = assert_err!(session.authenticate().await);
        assert_eq!(err.to_string(), "No token received from login");
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_success_flag_required() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 200, json!({"success": false, "data": {"token": "x"}}));
        let session = manager(&mock);

        assert_err!(session.authenticate().await);
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_transport_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(LOGIN_PATH, "timeout of 30000ms exceeded");
        let session = manager(&mock);

        let err = assert_err!(session.authenticate().await);
        assert!(matches!(err, RouterError::Auth(_)));
        assert!(err.to_string().starts_with("Authentication failed:"));
        assert!(err.to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn test_login_bad_credentials_status() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 401, json!({"success": false, "errors": [{"code": 121}]}));
        let session = manager(&mock);

        let err = assert_err!(session.authenticate().await);
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_authenticate_always_reposts() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 200, login_ok("tok-1"))
            .respond(LOGIN_PATH, 200, login_ok("tok-2"));
        let session = manager(&mock);

        assert_ok!(session.authenticate().await);
        assert_ok!(session.authenticate().await);
        assert_eq!(mock.calls_to(LOGIN_PATH).len(), 2);
        assert_eq!(session.current_token().await.unwrap().value(), "tok-2");
    }

    #[tokio::test]
    async fn test_ensure_token_reuses_held_token() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 200, login_ok("tok-1"));
        let session = manager(&mock);

        assert_eq!(assert_ok!(session.ensure_token().await), "tok-1");
        assert_eq!(assert_ok!(session.ensure_token().await), "tok-1");
        assert_eq!(mock.calls_to(LOGIN_PATH).len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_token_logs_in_once() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 200, login_ok("tok-1"));
        let session = Arc::new(manager(&mock));

        let (a, b) = tokio::join!(session.ensure_token(), session.ensure_token());
        assert_eq!(assert_ok!(a), "tok-1");
        assert_eq!(assert_ok!(b), "tok-1");
        assert_eq!(mock.calls_to(LOGIN_PATH).len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_token_keeps_newer_token() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 200, login_ok("tok-1"))
            .respond(LOGIN_PATH, 200, login_ok("tok-2"));
        let session = manager(&mock);

        assert_ok!(session.authenticate().await);
        assert_ok!(session.authenticate().await);

        // A stale request carrying tok-1 got a 401
        session.invalidate_token("tok-1").await;
        assert_eq!(session.current_token().await.unwrap().value(), "tok-2");

        session.invalidate_token("tok-2").await;
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_invalidate_then_ensure_logs_in_again() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(LOGIN_PATH, 200, login_ok("tok-1"))
            .respond(LOGIN_PATH, 200, login_ok("tok-2"));
        let session = manager(&mock);

        assert_ok!(session.ensure_token().await);
        session.invalidate().await;
        assert!(!session.is_authenticated().await);

        assert_eq!(assert_ok!(session.ensure_token().await), "tok-2");
        assert_eq!(mock.calls_to(LOGIN_PATH).len(), 2);
    }
}
