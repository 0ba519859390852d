//! The WebSocket fan-out hub (§4.2).
//!
//! `Hub.clients` is the single owner of every connected client's state and
//! outbound sender; mutations (accept, drop, subscribe, unsubscribe) and
//! broadcast iteration are serialized per client entry via `DashMap`.
//! Actual network I/O happens in each client's own forwarder task reading
//! off its channel, so `broadcast` itself never blocks on a socket write.

use axum::extract::ws::Message;
use dashmap::DashMap;
use insure_core::{is_valid_channel, ClientState};
use insure_telemetry::Metrics;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Outbound channel capacity per client. A full channel means the client
/// is not draining fast enough; §4.2 says to drop rather than queue, so a
/// full send is treated the same as a closed one.
const CLIENT_SEND_CAPACITY: usize = 256;

struct ClientEntry {
    state: ClientState,
    sender: mpsc::Sender<Message>,
}

#[derive(Default)]
pub struct Hub {
    clients: DashMap<String, ClientEntry>,
}

impl Hub {
    pub fn new() -> Self {
        Self { clients: DashMap::new() }
    }

    /// Registers a newly accepted client, returning the receiving half of
    /// its outbound channel for the connection's forwarder task.
    pub fn register(&self, client_id: String, now: i64) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(CLIENT_SEND_CAPACITY);
        self.clients.insert(client_id.clone(), ClientEntry { state: ClientState::new(client_id, now), sender: tx });
        Metrics::ws_connected();
        rx
    }

    pub fn remove(&self, client_id: &str) {
        if self.clients.remove(client_id).is_some() {
            Metrics::ws_disconnected();
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Adds `channel` to the client's subscriptions. Returns `false` if the
    /// channel name is not one of `WS_CHANNELS`.
    pub fn subscribe(&self, client_id: &str, channel: &str) -> bool {
        if !is_valid_channel(channel) {
            return false;
        }
        if let Some(mut entry) = self.clients.get_mut(client_id) {
            entry.state.subscribed_channels.insert(channel.to_string());
        }
        true
    }

    pub fn unsubscribe(&self, client_id: &str, channel: &str) {
        if let Some(mut entry) = self.clients.get_mut(client_id) {
            entry.state.subscribed_channels.remove(channel);
        }
    }

    pub fn touch_ping(&self, client_id: &str, now: i64) {
        if let Some(mut entry) = self.clients.get_mut(client_id) {
            entry.state.last_ping = now;
        }
    }

    /// Sends `message` directly to one client, e.g. a reply to its own
    /// subscribe/ping request. Removes the client if the send fails.
    pub fn send_to(&self, client_id: &str, message: serde_json::Value) -> bool {
        let Ok(text) = serde_json::to_string(&message) else {
            return false;
        };
        let ok = match self.clients.get(client_id) {
            Some(entry) => entry.sender.try_send(Message::Text(text.into())).is_ok(),
            None => false,
        };
        if !ok {
            self.clients.remove(client_id);
        }
        ok
    }

    /// Sends `message` to every client subscribed to `channel`. A client
    /// whose channel is full or closed is dropped immediately (§5: no
    /// back-pressure on producers). Returns the number of clients reached.
    pub fn broadcast(&self, channel: &str, message: serde_json::Value) -> usize {
        let Ok(text) = serde_json::to_string(&message) else {
            warn!(channel, "failed to serialize broadcast message");
            return 0;
        };

        let mut dead = Vec::new();
        let mut sent = 0;
        for entry in self.clients.iter() {
            if !entry.state.subscribed_channels.contains(channel) {
                continue;
            }
            match entry.sender.try_send(Message::Text(text.clone().into())) {
                Ok(()) => sent += 1,
                Err(_) => dead.push(entry.key().clone()),
            }
        }
        for client_id in &dead {
            self.clients.remove(client_id);
        }
        if !dead.is_empty() {
            Metrics::ws_clients_reaped("send_failed", dead.len());
        }
        if sent > 0 {
            Metrics::ws_broadcast(channel);
        }
        sent
    }

    /// Removes every client whose `last_ping` is older than
    /// `timeout_secs`. Returns the number removed.
    pub fn reap_stale(&self, now: i64, timeout_secs: i64) -> usize {
        let stale: Vec<String> = self
            .clients
            .iter()
            .filter(|entry| entry.state.is_stale(now, timeout_secs))
            .map(|entry| entry.key().clone())
            .collect();
        for client_id in &stale {
            self.clients.remove(client_id);
        }
        if !stale.is_empty() {
            info!(count = stale.len(), "heartbeat reaper removed stale clients");
            Metrics::ws_clients_reaped("heartbeat_timeout", stale.len());
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_rejects_unknown_channel() {
        let hub = Hub::new();
        let _rx = hub.register("client-1".to_string(), 0);
        assert!(!hub.subscribe("client-1", "not_a_channel"));
        assert!(hub.subscribe("client-1", "risk_alerts"));
    }

    #[tokio::test]
    async fn broadcast_only_reaches_subscribers() {
        let hub = Hub::new();
        let mut rx1 = hub.register("client-1".to_string(), 0);
        let _rx2 = hub.register("client-2".to_string(), 0);
        hub.subscribe("client-1", "risk_alerts");

        let sent = hub.broadcast("risk_alerts", serde_json::json!({"type": "new_alert"}));
        assert_eq!(sent, 1);
        let received = rx1.try_recv();
        assert!(received.is_ok());
    }

    #[tokio::test]
    async fn reap_stale_removes_clients_past_timeout() {
        let hub = Hub::new();
        let _rx = hub.register("client-1".to_string(), 0);
        hub.touch_ping("client-1", 0);

        assert_eq!(hub.reap_stale(100, 300), 0);
        assert_eq!(hub.reap_stale(500, 300), 1);
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_drops_client_whose_channel_is_full() {
        let hub = Hub::new();
        let rx = hub.register("client-1".to_string(), 0);
        hub.subscribe("client-1", "risk_alerts");
        drop(rx);

        let sent = hub.broadcast("risk_alerts", serde_json::json!({"type": "new_alert"}));
        assert_eq!(sent, 0);
        assert_eq!(hub.client_count(), 0);
    }
}
