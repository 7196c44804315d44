//! Supabase backend.
//!
//! The initial batch comes from the PostgREST endpoint and live inserts from
//! the Realtime websocket, which speaks the Phoenix channel protocol:
//!
//! ```text
//! client                                   realtime
//!   │── phx_join (postgres_changes filter) ──▶│
//!   │◀─────────────── phx_reply {status: ok} ─│
//!   │◀──────────────── postgres_changes {...} ─│  (per insert)
//!   │── heartbeat ───────────────────────────▶│  (periodic)
//!   │── phx_leave ───────────────────────────▶│  (on close)
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::{ChangeEvent, MeasurementBackend, PushChannel, TableFilter};
use crate::data::Measurement;
use crate::error::{FetchError, SubscriptionError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const JOIN_REF: &str = "1";

/// Connection settings for a Supabase project.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    pub url: String,
    /// Anonymous (or service) API key.
    #[serde(alias = "anon_key")]
    pub api_key: String,
    /// Seconds between Realtime heartbeats.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_heartbeat_secs() -> u64 {
    25
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            heartbeat_secs: default_heartbeat_secs(),
        }
    }

    fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Websocket endpoint of the Realtime service.
    pub fn realtime_url(&self) -> String {
        let base = self.base_url();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base, self.api_key
        )
    }
}

/// A backend reading from a Supabase table.
#[derive(Debug)]
pub struct SupabaseBackend {
    http: reqwest::Client,
    config: SupabaseConfig,
    table: TableFilter,
    description: String,
}

impl SupabaseBackend {
    /// Create a backend for `table`.
    pub fn new(config: SupabaseConfig, table: TableFilter) -> Result<Self, FetchError> {
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| FetchError::Transport(format!("invalid API key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| FetchError::Transport(format!("invalid API key: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        let description = format!("supabase: {}/{}", config.base_url(), table.table);

        Ok(Self {
            http,
            config,
            table,
            description,
        })
    }
}

#[async_trait]
impl MeasurementBackend for SupabaseBackend {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Measurement>, FetchError> {
        let url = format!("{}/rest/v1/{}", self.config.base_url(), self.table.table);
        let limit = limit.to_string();

        debug!("Fetching latest {} rows from {}", limit, url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("select", "*"),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .header("Accept-Profile", self.table.schema.as_str())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Vec<Measurement>>().await?)
    }

    async fn subscribe(&self, filter: &TableFilter) -> Result<PushChannel, SubscriptionError> {
        let (mut ws, _) = connect_async(self.config.realtime_url())
            .await
            .map_err(|e| SubscriptionError::Open(e.to_string()))?;

        let topic = channel_topic(filter);
        let join = PhoenixMessage::new(&topic, "phx_join", join_payload(filter, &self.config), JOIN_REF);
        send(&mut ws, &join)
            .await
            .map_err(|e| SubscriptionError::Open(e.to_string()))?;
        await_join(&mut ws).await?;
        info!("Joined {}", topic);

        let period = Duration::from_secs(self.config.heartbeat_secs.max(1));
        Ok(PushChannel::spawn(move |tx, mut shutdown| async move {
            let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
            let mut next_ref: u64 = 2;

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        let leave = PhoenixMessage::new(&topic, "phx_leave", json!({}), &next_ref.to_string());
                        let _ = send(&mut ws, &leave).await;
                        let _ = ws.close(None).await;
                        return Ok(());
                    }
                    _ = heartbeat.tick() => {
                        let beat = PhoenixMessage::new("phoenix", "heartbeat", json!({}), &next_ref.to_string());
                        next_ref += 1;
                        send(&mut ws, &beat).await?;
                    }
                    frame = ws.next() => match frame {
                        Some(Ok(Message::Text(text))) => match interpret(text.as_str()) {
                            Incoming::Change(event) => {
                                if tx.send(event).await.is_err() {
                                    // Receiver dropped
                                    return Ok(());
                                }
                            }
                            Incoming::Fault(e) => return Err(e),
                            Incoming::Ignore => {}
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| f.reason.as_str().to_string())
                                .unwrap_or_else(|| "no reason given".to_string());
                            return Err(SubscriptionError::Closed(reason));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(SubscriptionError::Transport(e.to_string())),
                        None => {
                            return Err(SubscriptionError::Closed("connection dropped".to_string()));
                        }
                    },
                }
            }
        }))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// A Phoenix channel frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
}

impl PhoenixMessage {
    fn new(topic: &str, event: &str, payload: Value, reference: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }
}

fn channel_topic(filter: &TableFilter) -> String {
    format!("realtime:{}_changes", filter.table)
}

fn join_payload(filter: &TableFilter, config: &SupabaseConfig) -> Value {
    json!({
        "config": {
            "broadcast": { "ack": false, "self": false },
            "presence": { "key": "" },
            "postgres_changes": [
                { "event": "INSERT", "schema": filter.schema, "table": filter.table }
            ],
            "private": false
        },
        "access_token": config.api_key
    })
}

async fn send(ws: &mut Socket, message: &PhoenixMessage) -> Result<(), SubscriptionError> {
    let text = serde_json::to_string(message)
        .map_err(|e| SubscriptionError::Transport(e.to_string()))?;
    ws.send(Message::Text(text.into()))
        .await
        .map_err(|e| SubscriptionError::Transport(e.to_string()))
}

async fn await_join(ws: &mut Socket) -> Result<(), SubscriptionError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let Ok(reply) = serde_json::from_str::<PhoenixMessage>(text.as_str()) else {
                    continue;
                };
                if reply.event != "phx_reply" || reply.reference.as_deref() != Some(JOIN_REF) {
                    continue;
                }
                return match reply.payload.get("status").and_then(Value::as_str) {
                    Some("ok") => Ok(()),
                    _ => Err(SubscriptionError::Rejected(
                        reply.payload.get("response").cloned().unwrap_or(Value::Null).to_string(),
                    )),
                };
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(SubscriptionError::Open(e.to_string())),
            None => {
                return Err(SubscriptionError::Open("connection closed during join".to_string()));
            }
        }
    }
}

/// What an incoming frame means for the channel.
#[derive(Debug, PartialEq)]
enum Incoming {
    Change(ChangeEvent),
    Fault(SubscriptionError),
    Ignore,
}

fn interpret(text: &str) -> Incoming {
    let Ok(message) = serde_json::from_str::<PhoenixMessage>(text) else {
        return Incoming::Ignore;
    };

    match message.event.as_str() {
        "postgres_changes" => message
            .payload
            .get("data")
            .cloned()
            .and_then(|data| serde_json::from_value(data).ok())
            .map_or(Incoming::Ignore, Incoming::Change),
        // Older Realtime servers send the change as the whole payload.
        "INSERT" | "UPDATE" | "DELETE" => serde_json::from_value(message.payload)
            .map_or(Incoming::Ignore, Incoming::Change),
        "phx_error" => Incoming::Fault(SubscriptionError::Transport("channel error".to_string())),
        "phx_close" => Incoming::Fault(SubscriptionError::Closed("channel closed by server".to_string())),
        "system" if message.payload.get("status").and_then(Value::as_str) == Some("error") => {
            let reason = message
                .payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("system error")
                .to_string();
            Incoming::Fault(SubscriptionError::Rejected(reason))
        }
        _ => Incoming::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ChangeKind;

    #[test]
    fn test_realtime_url() {
        let config = SupabaseConfig::new("https://demo.supabase.co/", "key123");
        assert_eq!(
            config.realtime_url(),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=key123&vsn=1.0.0"
        );

        let local = SupabaseConfig::new("http://localhost:54321", "k");
        assert!(local.realtime_url().starts_with("ws://localhost:54321/realtime/v1/"));
    }

    #[test]
    fn test_config_accepts_anon_key_alias() {
        let config: SupabaseConfig =
            serde_json::from_value(json!({"url": "https://x.supabase.co", "anon_key": "k"})).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.heartbeat_secs, 25);
    }

    #[test]
    fn test_join_payload_filters_inserts() {
        let filter = TableFilter::default();
        let payload = join_payload(&filter, &SupabaseConfig::new("https://x", "k"));
        let change = &payload["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "INSERT");
        assert_eq!(change["schema"], "public");
        assert_eq!(change["table"], "mediciones_distancia");
        assert_eq!(channel_topic(&filter), "realtime:mediciones_distancia_changes");
    }

    #[test]
    fn test_interpret_postgres_changes() {
        let frame = r#"{
            "topic": "realtime:mediciones_distancia_changes",
            "event": "postgres_changes",
            "ref": null,
            "payload": {
                "ids": [1],
                "data": {
                    "type": "INSERT",
                    "schema": "public",
                    "table": "mediciones_distancia",
                    "commit_timestamp": "2024-05-01T12:00:00Z",
                    "record": {"id": 10}
                }
            }
        }"#;

        match interpret(frame) {
            Incoming::Change(event) => {
                assert_eq!(event.kind, ChangeKind::Insert);
                assert_eq!(event.new_row["id"], 10);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_interpret_faults_and_noise() {
        let error = r#"{"topic":"t","event":"phx_error","payload":{},"ref":"1"}"#;
        assert!(matches!(interpret(error), Incoming::Fault(SubscriptionError::Transport(_))));

        let close = r#"{"topic":"t","event":"phx_close","payload":{},"ref":"1"}"#;
        assert!(matches!(interpret(close), Incoming::Fault(SubscriptionError::Closed(_))));

        let system = r#"{"topic":"t","event":"system","payload":{"status":"error","message":"bad filter"}}"#;
        assert_eq!(
            interpret(system),
            Incoming::Fault(SubscriptionError::Rejected("bad filter".to_string()))
        );

        let system_ok = r#"{"topic":"t","event":"system","payload":{"status":"ok"}}"#;
        assert_eq!(interpret(system_ok), Incoming::Ignore);

        let reply = r#"{"topic":"phoenix","event":"phx_reply","payload":{"status":"ok"},"ref":"3"}"#;
        assert_eq!(interpret(reply), Incoming::Ignore);

        assert_eq!(interpret("garbage"), Incoming::Ignore);
    }
}
