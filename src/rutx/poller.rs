//! StatusPoller: periodic connection and signal refresh
//!
//! Runs in a background tokio task. Each tick is an independent attempt:
//! connection test first, then signal status when the router is reachable.
//! No backoff; a failed tick just waits for the next one.

use std::sync::Arc;

use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::rutx::client::RouterClient;
use crate::state::StateStore;

pub struct StatusPoller {
    client: Arc<RouterClient>,
    states: Arc<StateStore>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(client: Arc<RouterClient>, states: Arc<StateStore>, interval: Duration) -> Self {
        Self {
            client,
            states,
            interval,
        }
    }

    /// Poll loop (runs forever). The first tick is one interval from now;
    /// startup runs `poll_once` itself.
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "[Poller] Starting status polling (interval: {}s)",
            self.interval.as_secs()
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// One connection test + signal refresh. Returns the connection state.
    pub async fn poll_once(&self) -> bool {
        let result = self.client.test_connection().await;
        self.states.publish_connection(result.success).await;

        if !result.success {
            tracing::error!(
                "[Poller] Connection to {} failed: {}",
                self.client.config().host,
                result.error.as_deref().unwrap_or("unknown error")
            );
            return false;
        }

        let signal = self.client.get_signal_status().await;
        if signal.success {
            self.states.publish_signal(&signal).await;
            tracing::debug!(
                "[Poller] Signal {} dBm, operator {} (modem {})",
                signal.signal,
                signal.operator,
                signal.modem_id
            );
        } else {
            tracing::warn!(
                "[Poller] Failed to update signal status: {}",
                signal.error.as_deref().unwrap_or("unknown error")
            );
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::models::state_ids;
    use crate::rutx::transport::mock::MockTransport;
    use serde_json::json;

    fn poller(mock: &Arc<MockTransport>, states: &Arc<StateStore>) -> StatusPoller {
        let client = RouterClient::with_transport(
            ClientConfig::new("192.168.1.1", "admin", "admin01"),
            mock.clone(),
        );
        StatusPoller::new(Arc::new(client), states.clone(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_poll_publishes_connection_and_signal() {
        let mock = Arc::new(MockTransport::new());
        let mobile = json!({"data": {"2-1": {"signal_level": -63, "operator": "O2"}}});
        mock.respond("/unauthorized/status", 200, json!({"model": "RUTX50"}))
            .respond("/api/login", 200, json!({"success": true, "data": {"token": "t"}}))
            .respond("/api/network/mobile", 200, mobile.clone())
            .respond("/api/network/mobile", 200, mobile);
        let states = Arc::new(StateStore::new());

        assert!(poller(&mock, &states).poll_once().await);
        assert_eq!(states.get(state_ids::CONNECTION).await.unwrap().val, json!(true));
        assert_eq!(states.get(state_ids::SIGNAL_STRENGTH).await.unwrap().val, json!(-63));
        assert_eq!(states.get_str(state_ids::SIGNAL_OPERATOR).await, "O2");
    }

    #[tokio::test]
    async fn test_poll_failure_publishes_disconnected() {
        let mock = Arc::new(MockTransport::new());
        let states = Arc::new(StateStore::new());
        states.publish_connection(true).await;

        // Nothing scripted: every request fails as unreachable
        assert!(!poller(&mock, &states).poll_once().await);
        assert_eq!(states.get(state_ids::CONNECTION).await.unwrap().val, json!(false));
        assert!(mock.calls_to("/api/network/mobile").is_empty());
    }

    #[tokio::test]
    async fn test_each_tick_is_fresh() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("/api/login", 200, json!({"success": false}))
            .respond("/api/login", 200, json!({"success": true, "data": {"token": "t"}}))
            .respond("/api/network/mobile", 200, json!({}))
            .respond("/api/network/mobile", 200, json!({}));
        let states = Arc::new(StateStore::new());
        let poller = poller(&mock, &states);

        assert!(!poller.poll_once().await);
        assert!(poller.poll_once().await);
        assert_eq!(mock.calls_to("/api/login").len(), 2);
    }
}
