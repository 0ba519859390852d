//! Axum WebSocket server: accepts connections, speaks the subscription
//! protocol from §4.2, and forwards hub broadcasts to each socket.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use insure_core::WS_CHANNELS;
use serde_json::json;
use tracing::{debug, info};

use crate::config::HubConfig;
use crate::hub::Hub;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub config: HubConfig,
}

pub fn create_router(state: AppState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let client_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();
    let mut outbox = state.hub.register(client_id.clone(), now);

    let (mut sender, mut receiver) = socket.split();

    let welcome = json!({
        "type": "welcome",
        "client_id": client_id,
        "available_channels": WS_CHANNELS,
        "timestamp": now,
    });
    if sender.send(Message::Text(welcome.to_string().into())).await.is_err() {
        state.hub.remove(&client_id);
        return;
    }

    let mut forward_task = tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&state, &client_id, &text);
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(client_id, "client sent close frame");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(client_id, error = %e, "websocket receive error");
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut forward_task => {
                break;
            }
        }
    }

    forward_task.abort();
    state.hub.remove(&client_id);
    info!(client_id, clients = state.hub.client_count(), "websocket connection closed");
}

/// Parses and applies one inbound client message per the §4.2 action table.
/// Replies are pushed onto the client's own outbound channel, so a reply
/// emitted here always goes out through the same forwarder loop as a
/// broadcast message would.
fn handle_client_message(state: &AppState, client_id: &str, text: &str) {
    let now = chrono::Utc::now().timestamp();

    let parsed: Result<serde_json::Value, _> = serde_json::from_str(text);
    let Ok(value) = parsed else {
        reply(state, client_id, json!({"type": "error", "message": "Invalid subscription message format"}));
        return;
    };

    match value.get("action").and_then(|a| a.as_str()) {
        Some("subscribe") => {
            let channel = value.get("channel").and_then(|c| c.as_str()).unwrap_or("");
            if state.hub.subscribe(client_id, channel) {
                reply(state, client_id, json!({"type": "subscribed", "channel": channel, "timestamp": now}));
            } else {
                reply(
                    state,
                    client_id,
                    json!({
                        "type": "error",
                        "message": format!("Unknown channel: {channel}"),
                        "valid_channels": WS_CHANNELS,
                        "timestamp": now,
                    }),
                );
            }
        }
        Some("unsubscribe") => {
            let channel = value.get("channel").and_then(|c| c.as_str()).unwrap_or("");
            state.hub.unsubscribe(client_id, channel);
            reply(state, client_id, json!({"type": "unsubscribed", "channel": channel, "timestamp": now}));
        }
        Some("ping") => {
            state.hub.touch_ping(client_id, now);
            reply(state, client_id, json!({"type": "pong", "timestamp": now}));
        }
        _ => {
            reply(state, client_id, json!({"type": "error", "message": "Unknown action"}));
        }
    }
}

fn reply(state: &AppState, client_id: &str, message: serde_json::Value) {
    let _ = state.hub.send_to(client_id, message);
}

/// Spawns the heartbeat reaper and serves the hub on `config.port`.
pub async fn run_server(hub: Arc<Hub>, config: HubConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let reaper_hub = hub.clone();
    let interval_secs = config.heartbeat_interval_secs;
    let timeout_secs = config.client_timeout_secs;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            reaper_hub.reap_stale(now, timeout_secs);
        }
    });

    let state = AppState { hub, config: config.clone() };
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "starting websocket hub server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
