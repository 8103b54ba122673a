//! Command dispatcher
//!
//! Inbound commands from the host are validated, then queued to a single
//! task that runs them against the router client one at a time. Each
//! command carries a oneshot sender, so the caller gets exactly one reply.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::RouterError;
use crate::models::{state_ids, SmsResult};
use crate::rutx::RouterClient;
use crate::state::StateStore;

const QUEUE_DEPTH: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub message: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SendSms { recipient: String, message: String },
    /// Send from the `sms.recipient` / `sms.message` states
    SendFromStates,
    TestConnection,
    GetSignalStatus,
    CheckModem,
    GetDeviceStatus,
    Logout,
}

impl Command {
    pub fn parse(name: &str, payload: &Value) -> Result<Self, RouterError> {
        match name {
            "sendSMS" => {
                let field = |key: &str| {
                    payload
                        .get(key)
                        .and_then(Value::as_str)
                        .filter(|s| !s.trim().is_empty())
                };
                match (field("recipient"), field("message")) {
                    // Message body goes out untouched
                    (Some(recipient), Some(message)) => Ok(Command::SendSms {
                        recipient: recipient.trim().to_string(),
                        message: message.to_string(),
                    }),
                    _ => Err(RouterError::Validation(
                        "Recipient and message are required".to_string(),
                    )),
                }
            }
            "testConnection" => Ok(Command::TestConnection),
            "getSignalStatus" => Ok(Command::GetSignalStatus),
            "checkModem" => Ok(Command::CheckModem),
            "getDeviceStatus" => Ok(Command::GetDeviceStatus),
            "logout" => Ok(Command::Logout),
            other => Err(RouterError::Validation(format!("Unknown command: {}", other))),
        }
    }
}

struct Job {
    command: Command,
    reply: oneshot::Sender<Value>,
}

fn failure(error: impl std::fmt::Display) -> Value {
    serde_json::json!({ "success": false, "error": error.to_string() })
}

fn to_reply<T: Serialize>(result: &T) -> Value {
    serde_json::to_value(result).unwrap_or_else(|e| failure(e))
}

/// Cloneable handle for submitting commands
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Job>,
}

impl DispatcherHandle {
    /// Validate and run one command, returning the operation's full result.
    /// Invalid commands are rejected here without touching the router.
    pub async fn dispatch(&self, name: &str, payload: Value) -> Value {
        let command = match Command::parse(name, &payload) {
            Ok(c) => c,
            Err(e) => {
                let error = match e {
                    RouterError::Validation(msg) => msg,
                    other => other.to_string(),
                };
                tracing::warn!("[Dispatch] Rejected {}: {}", name, error);
                return failure(error);
            }
        };
        self.submit(command).await
    }

    pub async fn submit(&self, command: Command) -> Value {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Job { command, reply }).await.is_err() {
            return failure("Dispatcher stopped");
        }
        rx.await.unwrap_or_else(|_| failure("Dispatcher dropped the command"))
    }
}

pub struct CommandDispatcher {
    client: Arc<RouterClient>,
    states: Arc<StateStore>,
}

impl CommandDispatcher {
    pub fn new(client: Arc<RouterClient>, states: Arc<StateStore>) -> Self {
        Self { client, states }
    }

    /// Start the dispatcher task; it ends when every handle is dropped
    pub fn spawn(self) -> DispatcherHandle {
        let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let reply = self.execute(job.command).await;
                let _ = job.reply.send(reply);
            }
            tracing::debug!("[Dispatch] Command queue closed");
        });

        DispatcherHandle { tx }
    }

    async fn execute(&self, command: Command) -> Value {
        tracing::debug!("[Dispatch] {:?}", command);

        match command {
            Command::SendSms { recipient, message } => {
                to_reply(&self.send_sms(&recipient, &message).await)
            }
            Command::SendFromStates => self.send_from_states().await,
            Command::TestConnection => {
                let result = self.client.test_connection().await;
                self.states.publish_connection(result.success).await;
                if result.success {
                    let signal = self.client.get_signal_status().await;
                    if signal.success {
                        self.states.publish_signal(&signal).await;
                    }
                }
                to_reply(&result)
            }
            Command::GetSignalStatus => {
                let signal = self.client.get_signal_status().await;
                if signal.success {
                    self.states.publish_signal(&signal).await;
                }
                to_reply(&signal)
            }
            Command::CheckModem => to_reply(&self.client.check_modem_availability().await),
            Command::GetDeviceStatus => to_reply(&self.client.get_device_status().await),
            Command::Logout => {
                self.client.logout().await;
                serde_json::json!({ "success": true })
            }
        }
    }

    async fn send_sms(&self, recipient: &str, message: &str) -> SmsResult {
        let result = self.client.send_sms(recipient, message).await;
        self.states.record_sms(&result).await;
        result
    }

    async fn send_from_states(&self) -> Value {
        let recipient = self.states.get_str(state_ids::SMS_RECIPIENT).await;
        let message = self.states.get_str(state_ids::SMS_MESSAGE).await;

        let reply = if recipient.trim().is_empty() || message.trim().is_empty() {
            let error = "Recipient and message cannot be empty";
            tracing::error!("[Dispatch] SMS send error: {}", error);
            self.states.record_send_outcome(false, Some(error)).await;
            failure(error)
        } else {
            to_reply(&self.send_sms(recipient.trim(), &message).await)
        };

        self.states.set(state_ids::SMS_SEND, false).await;
        reply
    }
}
