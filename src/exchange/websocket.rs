//! Bybit private WebSocket listener for real-time order updates.

use crate::config::BybitConfig;
use crate::exchange::client::sign_payload;
use crate::exchange::types::lenient_string;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Heartbeat interval expected by the private stream.
const PING_INTERVAL: Duration = Duration::from_secs(20);

/// Fixed delay before reconnecting after the socket drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Validity window of the auth signature.
const AUTH_EXPIRY_MS: i64 = 10_000;

/// WebSocket event types.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// Connection established
    Connected,
    /// Auth frame accepted
    Authenticated,
    /// Auth or subscribe rejected by the server
    Rejected(String),
    /// Order status change
    OrderUpdate(OrderUpdate),
    /// Connection lost
    Disconnected,
}

/// One entry of an `order` topic push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub qty: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub avg_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cum_exec_qty: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stop_order_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trigger_price: String,
    #[serde(default)]
    pub reduce_only: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_time: String,
}

#[derive(Debug, Deserialize)]
struct TopicMessage {
    topic: String,
    #[serde(default)]
    data: Vec<OrderUpdate>,
}

#[derive(Debug, Deserialize)]
struct OpResponse {
    op: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    ret_msg: String,
}

/// Turn one text frame into zero or more events.
///
/// Pongs, subscribe acks and unknown topics produce nothing.
pub fn parse_message(text: &str) -> Vec<WsEvent> {
    if let Ok(msg) = serde_json::from_str::<TopicMessage>(text) {
        if msg.topic == "order" {
            return msg.data.into_iter().map(WsEvent::OrderUpdate).collect();
        }
        debug!(topic = %msg.topic, "Ignoring topic");
        return vec![];
    }

    match serde_json::from_str::<OpResponse>(text) {
        Ok(resp) if resp.success == Some(false) => {
            vec![WsEvent::Rejected(format!("{}: {}", resp.op, resp.ret_msg))]
        }
        Ok(resp) if resp.op == "auth" => vec![WsEvent::Authenticated],
        Ok(_) => vec![],
        Err(e) => {
            debug!("Unparsed WebSocket frame ({}): {}", e, text);
            vec![]
        }
    }
}

/// Listener for the `order` topic on the private stream.
#[derive(Debug, Clone)]
pub struct OrderStreamListener {
    url: String,
    api_key: String,
    api_secret: String,
}

impl OrderStreamListener {
    pub fn new(config: &BybitConfig) -> Self {
        Self {
            url: config.ws_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    /// Build the auth frame for a signature valid until `expires` (ms).
    pub fn auth_frame(&self, expires: i64) -> String {
        let signature = sign_payload(&self.api_secret, &format!("GET/realtime{}", expires));
        json!({
            "op": "auth",
            "args": [self.api_key, expires, signature]
        })
        .to_string()
    }

    fn subscribe_frame() -> String {
        json!({"op": "subscribe", "args": ["order"]}).to_string()
    }

    fn ping_frame() -> String {
        json!({"op": "ping"}).to_string()
    }

    /// Run the listener in the background, reconnecting until the receiver is dropped.
    pub fn spawn(self, tx: mpsc::Sender<WsEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.connect_and_handle(&tx).await {
                    error!("Order stream error: {:#}", e);
                }

                if tx.send(WsEvent::Disconnected).await.is_err() {
                    info!("Order stream receiver dropped, stopping listener");
                    return;
                }

                warn!("Order stream disconnected, reconnecting in {:?}", RECONNECT_DELAY);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }

    /// Connect, authenticate, subscribe and pump frames until the socket closes.
    async fn connect_and_handle(&self, tx: &mpsc::Sender<WsEvent>) -> Result<()> {
        info!("Connecting to WebSocket: {}", self.url);

        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .context("Failed to connect to WebSocket")?;

        let (mut write, mut read) = ws_stream.split();

        let expires = chrono::Utc::now().timestamp_millis() + AUTH_EXPIRY_MS;
        write
            .send(Message::Text(self.auth_frame(expires).into()))
            .await
            .context("Failed to send auth frame")?;
        write
            .send(Message::Text(Self::subscribe_frame().into()))
            .await
            .context("Failed to send subscribe frame")?;

        if tx.send(WsEvent::Connected).await.is_err() {
            return Ok(());
        }

        let mut heartbeat = tokio::time::interval(PING_INTERVAL);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    write
                        .send(Message::Text(Self::ping_frame().into()))
                        .await
                        .context("Failed to send heartbeat")?;
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        for event in parse_message(&text) {
                            if let WsEvent::Rejected(reason) = &event {
                                warn!("Order stream request rejected: {}", reason);
                            }
                            if tx.send(event).await.is_err() {
                                warn!("Event receiver dropped");
                                return Ok(());
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Pong is handled automatically by tungstenite
                        debug!("Received ping");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket closed by server");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("WebSocket read failed"),
                }
            }
        }
    }
}
