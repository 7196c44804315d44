//! Stream-based backend.
//!
//! Receives change events from an async byte stream of newline-delimited
//! JSON. Each line is either a change event (`{"type": "INSERT", "table":
//! ..., "record": {...}}`) or a bare measurement row, which is taken as an
//! insert on the subscribed table.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::{load_seed, ChangeEvent, MeasurementBackend, PushChannel, TableFilter};
use crate::data::Measurement;
use crate::error::{FetchError, SubscriptionError};

/// A backend that streams rows from a TCP endpoint.
///
/// A new connection is opened for every subscription. The initial batch
/// comes from an optional JSON seed file; without one the dashboard starts
/// empty and fills from the stream.
#[derive(Debug)]
pub struct StreamBackend {
    addr: String,
    seed: Option<PathBuf>,
    description: String,
}

impl StreamBackend {
    /// Stream from `host:port`.
    pub fn tcp(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let description = format!("stream: tcp://{}", addr);
        Self {
            addr,
            seed: None,
            description,
        }
    }

    /// Load the initial batch from a JSON file of rows.
    pub fn with_seed(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed = Some(path.into());
        self
    }
}

#[async_trait]
impl MeasurementBackend for StreamBackend {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Measurement>, FetchError> {
        match self.seed {
            Some(ref path) => load_seed(path, limit).await,
            None => {
                debug!("No seed file configured, starting with an empty batch");
                Ok(Vec::new())
            }
        }
    }

    async fn subscribe(&self, filter: &TableFilter) -> Result<PushChannel, SubscriptionError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| SubscriptionError::Open(format!("{}: {}", self.addr, e)))?;
        info!("Connected to {}", self.addr);
        Ok(channel_from_reader(stream, filter.clone()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Spawn a channel that reads newline-delimited JSON from `reader`.
///
/// Unparseable lines are skipped. End of stream ends the channel with
/// [`SubscriptionError::Closed`].
pub fn channel_from_reader<R>(reader: R, filter: TableFilter) -> PushChannel
where
    R: AsyncRead + Unpin + Send + 'static,
{
    PushChannel::spawn(move |tx, mut shutdown| async move {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            tokio::select! {
                _ = &mut shutdown => return Ok(()),
                read = reader.read_line(&mut line) => match read {
                    Ok(0) => {
                        return Err(SubscriptionError::Closed("end of stream".to_string()));
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match parse_line(trimmed, &filter) {
                            Some(event) => {
                                if tx.send(event).await.is_err() {
                                    // Receiver dropped
                                    return Ok(());
                                }
                            }
                            None => warn!("Skipping unparseable line: {}", trimmed),
                        }
                    }
                    Err(e) => return Err(SubscriptionError::Transport(e.to_string())),
                },
            }
        }
    })
}

fn parse_line(line: &str, filter: &TableFilter) -> Option<ChangeEvent> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    if value.get("type").is_some() {
        serde_json::from_value(value).ok()
    } else if value.is_object() {
        Some(ChangeEvent::insert(filter, value))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloseOutcome;
    use crate::source::{ChangeKind, CLOSE_TIMEOUT};
    use std::io::Cursor;
    use tokio::io::AsyncWriteExt;

    fn sample_row() -> &'static str {
        r#"{"id":1,"created_at":"2024-05-01T12:00:00Z","device_id":"a","sensor_data":{"distance_cm":18.0,"alert":false}}"#
    }

    #[tokio::test]
    async fn test_reader_bare_rows_become_inserts() {
        let data = format!("{}\n{}\n", sample_row(), sample_row());
        let filter = TableFilter::new("readings");
        let mut channel = channel_from_reader(Cursor::new(data), filter.clone());

        let first = channel.recv().await.unwrap();
        assert!(filter.matches(&first));
        assert!(channel.recv().await.is_some());

        // End of stream
        assert!(channel.recv().await.is_none());
        assert!(matches!(channel.fault(), Some(SubscriptionError::Closed(_))));
    }

    #[tokio::test]
    async fn test_reader_change_events_pass_through() {
        let data = format!(
            "{{\"type\":\"UPDATE\",\"table\":\"readings\",\"record\":{}}}\n",
            sample_row()
        );
        let mut channel = channel_from_reader(Cursor::new(data), TableFilter::new("readings"));

        let event = channel.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
    }

    #[tokio::test]
    async fn test_reader_skips_invalid_lines() {
        let data = format!("not valid json\n\n42\n{}\n", sample_row());
        let mut channel = channel_from_reader(Cursor::new(data), TableFilter::default());

        let event = channel.recv().await.unwrap();
        assert_eq!(event.new_row["id"], 1);
        assert!(channel.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_tcp_subscribe_and_close() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(format!("{}\n", sample_row()).as_bytes()).await.unwrap();
            // Keep the connection open until the client hangs up.
            let mut buf = [0u8; 16];
            let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
        });

        let backend = StreamBackend::tcp(addr.to_string());
        let mut channel = backend.subscribe(&TableFilter::default()).await.unwrap();

        let event = channel.recv().await.unwrap();
        assert_eq!(event.new_row["device_id"], "a");

        assert_eq!(channel.close(CLOSE_TIMEOUT).await, CloseOutcome::Closed);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_connect_failure_is_open_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = StreamBackend::tcp(addr.to_string());
        let result = backend.subscribe(&TableFilter::default()).await;
        assert!(matches!(result, Err(SubscriptionError::Open(_))));
    }

    #[tokio::test]
    async fn test_fetch_without_seed_is_empty() {
        let backend = StreamBackend::tcp("127.0.0.1:1");
        assert!(backend.fetch_latest(50).await.unwrap().is_empty());
        assert_eq!(backend.description(), "stream: tcp://127.0.0.1:1");
    }
}
