//! Data models for the RUTX SMS gateway

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Router operation results
// ============================================================================

/// Current time as an ISO-8601 UTC timestamp with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub recipient: String,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SmsResult {
    pub fn sent(recipient: &str, message: &str) -> Self {
        let now = Utc::now();
        Self {
            success: true,
            message_id: Some(format!("sms_{}", now.timestamp_millis())),
            recipient: recipient.to_string(),
            message: message.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            error: None,
        }
    }

    pub fn failed(recipient: &str, message: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            recipient: recipient.to_string(),
            message: message.to_string(),
            timestamp: now_iso(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalStatus {
    pub success: bool,
    /// Signal level as reported by the router (dBm)
    pub signal: i64,
    pub operator: String,
    pub connection: String,
    pub sim_state: String,
    pub network_type: String,
    pub modem_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignalStatus {
    pub fn failed(modem_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            signal: 0,
            operator: UNKNOWN.to_string(),
            connection: UNKNOWN.to_string(),
            sim_state: UNKNOWN.to_string(),
            network_type: UNKNOWN.to_string(),
            modem_id: modem_id.to_string(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModemAvailability {
    pub success: bool,
    pub modem_present: bool,
    pub modem_enabled: bool,
    pub sim_present: bool,
    pub sim_state: String,
    pub connection_state: String,
    pub signal: i64,
    pub operator: String,
    /// Modem entry that matched, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modem_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModemAvailability {
    pub fn absent() -> Self {
        Self {
            success: true,
            modem_present: false,
            modem_enabled: false,
            sim_present: false,
            sim_state: "unknown".to_string(),
            connection_state: "unknown".to_string(),
            signal: 0,
            operator: UNKNOWN.to_string(),
            modem_id: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::absent()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub authenticated: bool,
    pub device_status: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modem_status: Option<ModemAvailability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub const UNKNOWN: &str = "Unknown";

// ============================================================================
// Published states
// ============================================================================

pub mod state_ids {
    pub const CONNECTION: &str = "info.connection";
    pub const SIGNAL_STRENGTH: &str = "signal.strength";
    pub const SIGNAL_OPERATOR: &str = "signal.operator";
    pub const SMS_RECIPIENT: &str = "sms.recipient";
    pub const SMS_MESSAGE: &str = "sms.message";
    pub const SMS_SEND: &str = "sms.send";
    pub const SMS_LAST_MESSAGE: &str = "sms.lastMessage";
    pub const SMS_LAST_RECIPIENT: &str = "sms.lastRecipient";
    pub const SMS_LAST_SEND_RESULT: &str = "sms.lastSendResult";
    pub const SMS_LAST_SEND_TIME: &str = "sms.lastSendTime";
    pub const SMS_LAST_ERROR: &str = "sms.lastError";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    Boolean,
    Number,
    String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateDefinition {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub state_type: StateType,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    pub write: bool,
}

impl StateDefinition {
    pub fn default_value(&self) -> serde_json::Value {
        match self.state_type {
            StateType::Boolean => serde_json::Value::Bool(false),
            StateType::Number => serde_json::json!(0),
            StateType::String => serde_json::Value::String(String::new()),
        }
    }

    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self.state_type {
            StateType::Boolean => value.is_boolean(),
            StateType::Number => value.is_number(),
            StateType::String => value.is_string(),
        }
    }
}

const fn def(
    id: &'static str,
    name: &'static str,
    state_type: StateType,
    role: &'static str,
    write: bool,
) -> StateDefinition {
    StateDefinition {
        id,
        name,
        state_type,
        role,
        unit: None,
        write,
    }
}

pub const STATE_DEFINITIONS: &[StateDefinition] = &[
    def(state_ids::CONNECTION, "Router connection status", StateType::Boolean, "indicator.connected", false),
    def(state_ids::SMS_RECIPIENT, "SMS recipient phone number", StateType::String, "text.phone", true),
    def(state_ids::SMS_MESSAGE, "SMS message text", StateType::String, "text", true),
    def(state_ids::SMS_SEND, "Send SMS trigger", StateType::Boolean, "button", true),
    def(state_ids::SMS_LAST_MESSAGE, "Last sent SMS message", StateType::String, "text", false),
    def(state_ids::SMS_LAST_RECIPIENT, "Last SMS recipient", StateType::String, "text.phone", false),
    def(state_ids::SMS_LAST_SEND_RESULT, "Last SMS send result", StateType::Boolean, "indicator", false),
    def(state_ids::SMS_LAST_SEND_TIME, "Last SMS send timestamp", StateType::String, "date", false),
    def(state_ids::SMS_LAST_ERROR, "Last SMS error message", StateType::String, "text", false),
    StateDefinition {
        unit: Some("dBm"),
        ..def(state_ids::SIGNAL_STRENGTH, "Signal strength", StateType::Number, "value", false)
    },
    def(state_ids::SIGNAL_OPERATOR, "Mobile operator", StateType::String, "text", false),
];

pub fn find_definition(id: &str) -> Option<&'static StateDefinition> {
    STATE_DEFINITIONS.iter().find(|d| d.id == id)
}
