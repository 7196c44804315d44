//! Backend abstraction for fetching and streaming measurements.
//!
//! A backend supplies two things: an initial batch of the newest rows, and a
//! push channel of change events for the measurement table. Implementations
//! exist for an in-process feed ([`ChannelBackend`]), newline-delimited JSON
//! over TCP ([`StreamBackend`]) and, with the `supabase` feature, Supabase
//! REST + Realtime ([`SupabaseBackend`]).
//!
//! [`StreamSubscription`] wraps a backend channel with the lifecycle the
//! dashboard needs: at most one open channel, idempotent stop, and decoding
//! of change events into [`Measurement`]s.

mod channel;
mod file;
mod stream;
mod subscription;
#[cfg(feature = "supabase")]
mod supabase;

pub use channel::{ChannelBackend, ChannelFeed};
pub use file::load_seed;
pub use stream::{channel_from_reader, StreamBackend};
pub use subscription::StreamSubscription;
#[cfg(feature = "supabase")]
pub use supabase::{SupabaseBackend, SupabaseConfig};

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::data::Measurement;
use crate::error::{CloseOutcome, FetchError, SubscriptionError};

/// How long a close waits for the channel task before aborting it.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Buffered change events per channel.
const CHANNEL_BUFFER: usize = 64;

/// Default table holding the measurements, as created by the sensor firmware.
pub const DEFAULT_TABLE: &str = "mediciones_distancia";

/// Default database schema.
pub const DEFAULT_SCHEMA: &str = "public";

/// Trait for the external data source.
///
/// # Example
///
/// ```
/// use distwatch::source::{ChannelBackend, MeasurementBackend};
///
/// # tokio_test::block_on(async {
/// let (_feed, backend) = ChannelBackend::create("memory");
/// let rows = backend.fetch_latest(50).await.unwrap();
/// assert!(rows.is_empty());
/// # });
/// ```
#[async_trait]
pub trait MeasurementBackend: Send + Sync + Debug {
    /// Fetch at most `limit` rows, newest first by `created_at`.
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Measurement>, FetchError>;

    /// Open a push channel of change events for the given table.
    async fn subscribe(&self, filter: &TableFilter) -> Result<PushChannel, SubscriptionError>;

    /// Close a channel previously returned by [`subscribe`](Self::subscribe).
    async fn unsubscribe(&self, channel: PushChannel) -> CloseOutcome {
        channel.close(CLOSE_TIMEOUT).await
    }

    /// Returns a human-readable description of the backend.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}

/// Kind of row change reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row change pushed by the backend.
///
/// Field names follow the Postgres change payload (`type`, `schema`,
/// `table`, `record`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    /// The row after the change. `Null` for deletes.
    #[serde(rename = "record", alias = "new", default)]
    pub new_row: serde_json::Value,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

impl ChangeEvent {
    /// An insert event carrying `row`.
    pub fn insert(filter: &TableFilter, row: serde_json::Value) -> Self {
        Self {
            kind: ChangeKind::Insert,
            schema: filter.schema.clone(),
            table: filter.table.clone(),
            new_row: row,
        }
    }
}

/// Selects "new row created" events for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    pub schema: String,
    pub table: String,
}

impl Default for TableFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE)
    }
}

impl TableFilter {
    /// Filter inserts on `table` in the default schema.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            table: table.into(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Whether the event is an insert on the filtered table.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.kind == ChangeKind::Insert && event.table == self.table && event.schema == self.schema
    }
}

/// An open stream of change events.
///
/// The producing side runs as a background task that feeds an mpsc channel.
/// The task is told to stop through a oneshot signal and reports how it
/// ended; a failure is also kept in a shared slot so it can be inspected
/// without awaiting the task.
#[derive(Debug)]
pub struct PushChannel {
    events: mpsc::Receiver<ChangeEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), SubscriptionError>>,
    fault: Arc<Mutex<Option<SubscriptionError>>>,
}

impl PushChannel {
    /// Spawn the producing task.
    ///
    /// `run` receives the event sender and a shutdown signal. It should
    /// return `Ok(())` when shut down on request and an error when the
    /// transport fails.
    pub fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(mpsc::Sender<ChangeEvent>, oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = Result<(), SubscriptionError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let fault = Arc::new(Mutex::new(None));
        let fault_handle = fault.clone();

        // Held until the fault is recorded, so a reader that sees the channel
        // disconnect can always see why.
        let keep_open = tx.clone();
        let work = run(tx, shutdown_rx);
        let task = tokio::spawn(async move {
            let result = work.await;
            if let Err(ref e) = result {
                *fault_handle.lock() = Some(e.clone());
            }
            drop(keep_open);
            result
        });

        Self {
            events: rx,
            shutdown: Some(shutdown_tx),
            task,
            fault,
        }
    }

    /// Receive the next event without blocking.
    pub fn try_recv(&mut self) -> Result<ChangeEvent, mpsc::error::TryRecvError> {
        self.events.try_recv()
    }

    /// Wait for the next event. Returns `None` once the producer has ended.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// The failure that ended the producer, if any.
    pub fn fault(&self) -> Option<SubscriptionError> {
        self.fault.lock().clone()
    }

    /// Stop the producer and report how it ended.
    ///
    /// Waits at most `timeout` before aborting the task.
    pub async fn close(mut self, timeout: Duration) -> CloseOutcome {
        self.events.close();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(Ok(()))) => CloseOutcome::Closed,
            Ok(Ok(Err(e))) => CloseOutcome::Errored(e),
            Ok(Err(join_err)) => {
                CloseOutcome::Errored(SubscriptionError::Transport(join_err.to_string()))
            }
            Err(_) => {
                self.task.abort();
                CloseOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "created_at": "2024-05-01T12:00:00Z",
            "device_id": "d",
            "sensor_data": { "distance_cm": 10.0, "alert": false }
        })
    }

    #[test]
    fn test_filter_matches_insert_on_table() {
        let filter = TableFilter::new("readings");
        assert!(filter.matches(&ChangeEvent::insert(&filter, row())));

        let mut update = ChangeEvent::insert(&filter, row());
        update.kind = ChangeKind::Update;
        assert!(!filter.matches(&update));

        let other = ChangeEvent::insert(&TableFilter::new("other"), row());
        assert!(!filter.matches(&other));

        let other_schema = ChangeEvent::insert(&filter.clone().with_schema("audit"), row());
        assert!(!filter.matches(&other_schema));
    }

    #[test]
    fn test_change_event_wire_format() {
        let json = r#"{
            "type": "INSERT",
            "schema": "public",
            "table": "mediciones_distancia",
            "commit_timestamp": "2024-05-01T12:00:00Z",
            "record": { "id": 3 }
        }"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.new_row["id"], 3);
        assert!(TableFilter::default().matches(&event));

        let delete = r#"{"type": "DELETE", "table": "t", "old_record": {"id": 3}}"#;
        let event: ChangeEvent = serde_json::from_str(delete).unwrap();
        assert_eq!(event.schema, "public");
        assert!(event.new_row.is_null());
    }

    #[tokio::test]
    async fn test_push_channel_close_on_request() {
        let filter = TableFilter::default();
        let mut channel = PushChannel::spawn(move |tx, shutdown| async move {
            tx.send(ChangeEvent::insert(&filter, row()))
                .await
                .map_err(|e| SubscriptionError::Transport(e.to_string()))?;
            let _ = shutdown.await;
            Ok(())
        });

        assert!(channel.recv().await.is_some());
        assert_eq!(channel.close(CLOSE_TIMEOUT).await, CloseOutcome::Closed);
    }

    #[tokio::test]
    async fn test_push_channel_reports_fault() {
        let mut channel = PushChannel::spawn(|_tx, _shutdown| async move {
            Err(SubscriptionError::Transport("reset by peer".to_string()))
        });

        assert!(channel.recv().await.is_none());
        assert_eq!(
            channel.fault(),
            Some(SubscriptionError::Transport("reset by peer".to_string()))
        );
        assert!(matches!(
            channel.close(CLOSE_TIMEOUT).await,
            CloseOutcome::Errored(SubscriptionError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_push_channel_times_out_when_producer_ignores_shutdown() {
        let channel = PushChannel::spawn(|_tx, _shutdown| async move {
            std::future::pending::<()>().await;
            Ok(())
        });

        let outcome = channel.close(Duration::from_millis(20)).await;
        assert_eq!(outcome, CloseOutcome::TimedOut);
    }
}
