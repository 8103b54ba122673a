//! In-memory state store published to the host platform
//!
//! Adapter-published values are acknowledged (`ack = true`); host writes to
//! the writable SMS control states are not.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::RouterError;
use crate::models::{find_definition, now_iso, state_ids, SignalStatus, SmsResult, STATE_DEFINITIONS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateValue {
    pub val: Value,
    pub ack: bool,
    pub ts: String,
}

pub struct StateStore {
    states: RwLock<BTreeMap<String, StateValue>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Store seeded with every defined state at its default value
    pub fn new() -> Self {
        let ts = now_iso();
        let states = STATE_DEFINITIONS
            .iter()
            .map(|d| {
                (
                    d.id.to_string(),
                    StateValue {
                        val: d.default_value(),
                        ack: true,
                        ts: ts.clone(),
                    },
                )
            })
            .collect();

        Self {
            states: RwLock::new(states),
        }
    }

    pub async fn get(&self, id: &str) -> Option<StateValue> {
        self.states.read().await.get(id).cloned()
    }

    pub async fn get_str(&self, id: &str) -> String {
        self.get(id)
            .await
            .and_then(|s| s.val.as_str().map(String::from))
            .unwrap_or_default()
    }

    pub async fn snapshot(&self) -> BTreeMap<String, StateValue> {
        self.states.read().await.clone()
    }

    /// Publish a value from the adapter side
    pub async fn set(&self, id: &str, val: impl Into<Value>) {
        self.put(id, val.into(), true).await;
    }

    /// Host write; only writable states of the matching type are accepted
    pub async fn write(&self, id: &str, val: Value) -> Result<(), RouterError> {
        let def = find_definition(id)
            .ok_or_else(|| RouterError::Validation(format!("Unknown state {}", id)))?;

        if !def.write {
            return Err(RouterError::Validation(format!("State {} is read-only", id)));
        }
        if !def.accepts(&val) {
            return Err(RouterError::Validation(format!(
                "State {} expects a {:?} value",
                id, def.state_type
            )));
        }

        self.put(id, val, false).await;
        Ok(())
    }

    async fn put(&self, id: &str, val: Value, ack: bool) {
        let mut states = self.states.write().await;
        states.insert(
            id.to_string(),
            StateValue {
                val,
                ack,
                ts: now_iso(),
            },
        );
    }

    pub async fn publish_connection(&self, connected: bool) {
        self.set(state_ids::CONNECTION, connected).await;
    }

    pub async fn publish_signal(&self, signal: &SignalStatus) {
        self.set(state_ids::SIGNAL_STRENGTH, signal.signal).await;
        self.set(state_ids::SIGNAL_OPERATOR, signal.operator.as_str()).await;
    }

    /// Record the outcome of one send attempt into the `sms.last*` slots
    pub async fn record_sms(&self, result: &SmsResult) {
        self.set(state_ids::SMS_LAST_MESSAGE, result.message.as_str()).await;
        self.set(state_ids::SMS_LAST_RECIPIENT, result.recipient.as_str()).await;
        self.record_send_outcome(result.success, result.error.as_deref()).await;
    }

    pub async fn record_send_outcome(&self, success: bool, error: Option<&str>) {
        self.set(state_ids::SMS_LAST_SEND_RESULT, success).await;
        self.set(state_ids::SMS_LAST_SEND_TIME, now_iso()).await;
        let error = if success {
            ""
        } else {
            error.unwrap_or("Unknown error")
        };
        self.set(state_ids::SMS_LAST_ERROR, error).await;
    }
}
