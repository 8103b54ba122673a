//! RUTX router API client
//!
//! Every operation returns a result struct with a `success` flag instead of
//! an error. Authenticated calls log in on demand and drop the session when
//! the router answers 401; the failed call is not replayed.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::RouterError;
use crate::models::{
    AuthResult, ConnectionTestResult, DeviceStatus, ModemAvailability, SignalStatus, SmsResult,
    UNKNOWN,
};
use crate::rutx::session::SessionManager;
use crate::rutx::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

const SEND_SMS_PATH: &str = "/api/messages/actions/send";
const MOBILE_PATH: &str = "/api/network/mobile";
const DEVICE_STATUS_PATH: &str = "/unauthorized/status";

pub struct RouterClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: SessionManager,
}

/// One modem slot from `/api/network/mobile`, with defaults applied
#[derive(Debug, Clone, PartialEq)]
struct ModemEntry {
    id: String,
    enabled: bool,
    sim_state: Option<String>,
    connection_state: Option<String>,
    signal_level: i64,
    operator: Option<String>,
    network_type: Option<String>,
}

impl ModemEntry {
    fn from_value(id: &str, v: &Value) -> Self {
        let enabled = match v.get("enabled") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !matches!(s.as_str(), "0" | "false"),
            _ => true,
        };

        Self {
            id: id.to_string(),
            enabled,
            sim_state: non_empty_str(v, "sim_state"),
            connection_state: non_empty_str(v, "connection_state"),
            signal_level: signal_level(v.get("signal_level")),
            operator: non_empty_str(v, "operator"),
            network_type: non_empty_str(v, "network_type"),
        }
    }

    fn sim_present(&self) -> bool {
        !matches!(self.sim_state.as_deref(), Some("absent") | Some("error"))
    }
}

fn non_empty_str(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Router reports the level as a number or a numeric string
fn signal_level(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.round() as i64)
            .unwrap_or(0),
        _ => 0,
    }
}

/// First configured modem id present in the interface map wins
fn resolve_modem(priority: &[String], interfaces: &Value) -> Option<ModemEntry> {
    priority.iter().find_map(|id| {
        interfaces
            .get(id.as_str())
            .filter(|entry| !entry.is_null())
            .map(|entry| ModemEntry::from_value(id, entry))
    })
}

impl RouterClient {
    pub fn new(config: ClientConfig) -> Result<Self, RouterError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        tracing::info!("[Rutx] Router API at {}", transport.base_url());
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let session = SessionManager::new(
            transport.clone(),
            config.username.clone(),
            config.password.clone(),
        );
        Self {
            config,
            transport,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Log in, replacing any held token
    pub async fn authenticate(&self) -> AuthResult {
        match self.session.authenticate().await {
            Ok(_) => AuthResult {
                success: true,
                error: None,
            },
            Err(e) => AuthResult {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// Clear the session token; no network call
    pub async fn logout(&self) {
        self.session.invalidate().await;
    }

    /// Attach the session token and classify the status.
    /// 401 invalidates the token that was sent.
    async fn authed_request(&self, req: ApiRequest) -> Result<ApiResponse, RouterError> {
        let token = self.session.ensure_token().await?;
        let resp = self.transport.request(req.bearer(&token)).await?;

        match resp.status {
            200..=299 => Ok(resp),
            401 => {
                self.session.invalidate_token(&token).await;
                Err(RouterError::SessionExpired)
            }
            status => Err(RouterError::Api {
                status,
                body: resp.body_text(),
            }),
        }
    }

    pub async fn send_sms(&self, number: &str, message: &str) -> SmsResult {
        if number.trim().is_empty() || message.is_empty() {
            return SmsResult::failed(number, message, "Recipient and message are required");
        }

        tracing::info!(
            "[Rutx] Sending SMS to {} via modem {} ({} chars)",
            number,
            self.config.modem_id,
            message.chars().count()
        );

        let body = serde_json::json!({
            "data": {
                "number": number,
                "message": message,
                "modem": self.config.modem_id,
            }
        });

        match self.authed_request(ApiRequest::post(SEND_SMS_PATH, body)).await {
            Ok(resp) if resp.status == 200 => {
                tracing::info!("[Rutx] SMS sent successfully to {}", number);
                SmsResult::sent(number, message)
            }
            Ok(resp) => {
                let error = format!("SMS API returned status {}", resp.status);
                tracing::error!("[Rutx] SMS to {} failed: {}", number, error);
                SmsResult::failed(number, message, error)
            }
            Err(e) => {
                let error = match e {
                    RouterError::Api { status, body } => {
                        format!("SMS API error: {} - {}", status, body)
                    }
                    RouterError::Network(msg) => format!("SMS sending failed: {}", msg),
                    other => other.to_string(),
                };
                tracing::error!("[Rutx] SMS to {} failed: {}", number, error);
                SmsResult::failed(number, message, error)
            }
        }
    }

    /// Unauthenticated device info; failures are reported, never raised
    pub async fn get_device_status(&self) -> DeviceStatus {
        let failed = |error: String| DeviceStatus {
            success: false,
            device_info: None,
            error: Some(error),
        };

        match self.transport.request(ApiRequest::get(DEVICE_STATUS_PATH)).await {
            Ok(resp) if resp.status == 200 && !resp.data.is_null() => DeviceStatus {
                success: true,
                device_info: Some(resp.data),
                error: None,
            },
            Ok(resp) => {
                tracing::debug!("[Rutx] Device status returned status {}", resp.status);
                failed(format!(
                    "No device status received (status {})",
                    resp.status
                ))
            }
            Err(e) => {
                tracing::debug!("[Rutx] Device status failed: {}", e);
                failed(e.to_string())
            }
        }
    }

    /// Mobile interface map, unwrapped from the `data` envelope when present
    async fn fetch_mobile_interfaces(&self) -> Result<Value, RouterError> {
        let resp = self.authed_request(ApiRequest::get(MOBILE_PATH)).await?;
        let mut data = resp.data;

        let interfaces = if data.get("data").map(Value::is_object).unwrap_or(false) {
            data["data"].take()
        } else {
            data
        };

        if !interfaces.is_object() {
            return Err(RouterError::Api {
                status: resp.status,
                body: "No mobile configuration received".to_string(),
            });
        }
        Ok(interfaces)
    }

    fn mobile_error(e: RouterError) -> String {
        match e {
            RouterError::Api { status, body } => {
                format!("Mobile status request failed: {} - {}", status, body)
            }
            other => other.to_string(),
        }
    }

    pub async fn check_modem_availability(&self) -> ModemAvailability {
        let interfaces = match self.fetch_mobile_interfaces().await {
            Ok(i) => i,
            Err(e) => {
                let error = Self::mobile_error(e);
                tracing::debug!("[Rutx] Modem availability check failed: {}", error);
                return ModemAvailability::failed(error);
            }
        };

        let Some(modem) = resolve_modem(&self.config.modem_priority, &interfaces) else {
            tracing::warn!(
                "[Rutx] Modem {} not found in configuration (tried {})",
                self.config.modem_id,
                self.config.modem_priority.join(", ")
            );
            return ModemAvailability::absent();
        };

        ModemAvailability {
            success: true,
            modem_present: true,
            modem_enabled: modem.enabled,
            sim_present: modem.sim_present(),
            sim_state: modem.sim_state.clone().unwrap_or_else(|| "unknown".to_string()),
            connection_state: modem
                .connection_state
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            signal: modem.signal_level,
            operator: modem.operator.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            modem_id: Some(modem.id),
            error: None,
        }
    }

    pub async fn get_signal_status(&self) -> SignalStatus {
        let interfaces = match self.fetch_mobile_interfaces().await {
            Ok(i) => i,
            Err(e) => {
                let error = Self::mobile_error(e);
                tracing::debug!("[Rutx] Signal status failed: {}", error);
                return SignalStatus::failed(&self.config.modem_id, error);
            }
        };

        match resolve_modem(&self.config.modem_priority, &interfaces) {
            Some(modem) => SignalStatus {
                success: true,
                signal: modem.signal_level,
                operator: modem.operator.unwrap_or_else(|| UNKNOWN.to_string()),
                connection: modem.connection_state.unwrap_or_else(|| UNKNOWN.to_string()),
                sim_state: modem.sim_state.unwrap_or_else(|| UNKNOWN.to_string()),
                network_type: modem.network_type.unwrap_or_else(|| UNKNOWN.to_string()),
                modem_id: modem.id,
                error: None,
            },
            None => SignalStatus::failed(
                &self.config.modem_id,
                format!("Modem {} not found", self.config.modem_id),
            ),
        }
    }

    /// Device status (best effort) plus a fresh login, then a modem check
    /// when the login succeeded
    pub async fn test_connection(&self) -> ConnectionTestResult {
        let device = self.get_device_status().await;
        let device_status = if device.success {
            device.device_info
        } else {
            None
        };

        let auth = self.authenticate().await;
        if !auth.success {
            return ConnectionTestResult {
                success: false,
                message: None,
                authenticated: false,
                device_status,
                modem_status: None,
                error: auth.error,
            };
        }

        let modem = self.check_modem_availability().await;
        ConnectionTestResult {
            success: true,
            message: Some("Connected to RUTX50".to_string()),
            authenticated: true,
            device_status,
            modem_status: Some(modem),
            error: None,
        }
    }
}
