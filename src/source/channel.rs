//! In-process backend.
//!
//! Rows and change events are pushed through a [`ChannelFeed`] held by the
//! producer. This is useful for embedding the dashboard next to code that
//! already receives sensor readings, and for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::warn;

use super::{ChangeEvent, MeasurementBackend, PushChannel, TableFilter};
use crate::data::Measurement;
use crate::error::{FetchError, SubscriptionError};

/// Messages carried from the feed to open channels.
#[derive(Debug, Clone)]
enum FeedMessage {
    Event(ChangeEvent),
    Fail(String),
}

#[derive(Debug, Default)]
struct Shared {
    rows: Mutex<Vec<Measurement>>,
    offline: AtomicBool,
    refuse_subscriptions: AtomicBool,
}

/// A backend fed from the same process.
///
/// The backend does not filter events: every event sent through the feed
/// reaches every open channel, and filtering is left to the subscriber.
///
/// # Example
///
/// ```
/// use distwatch::source::ChannelBackend;
///
/// let (feed, backend) = ChannelBackend::create("sensor bridge");
/// ```
#[derive(Debug)]
pub struct ChannelBackend {
    shared: Arc<Shared>,
    events: broadcast::Sender<FeedMessage>,
    description: String,
}

/// Producer handle for a [`ChannelBackend`].
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    shared: Arc<Shared>,
    events: broadcast::Sender<FeedMessage>,
    filter: TableFilter,
}

impl ChannelBackend {
    /// Create a feed/backend pair.
    ///
    /// Returns (feed, backend) where the feed is used to store rows and push
    /// change events, and the backend is handed to the dashboard.
    pub fn create(source_description: &str) -> (ChannelFeed, Self) {
        let shared = Arc::new(Shared::default());
        let (events, _) = broadcast::channel(256);

        let feed = ChannelFeed {
            shared: shared.clone(),
            events: events.clone(),
            filter: TableFilter::default(),
        };
        let backend = Self {
            shared,
            events,
            description: format!("channel: {}", source_description),
        };
        (feed, backend)
    }
}

impl ChannelFeed {
    /// Target a different table for [`insert`](Self::insert) events.
    pub fn with_table(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Store a row without notifying subscribers.
    pub fn store(&self, measurement: Measurement) {
        self.shared.rows.lock().push(measurement);
    }

    /// Store a row and push an insert event for it.
    pub fn insert(&self, measurement: Measurement) {
        let row = match serde_json::to_value(&measurement) {
            Ok(row) => row,
            Err(e) => {
                warn!("Failed to encode measurement {}: {}", measurement.id, e);
                return;
            }
        };
        self.store(measurement);
        self.send(ChangeEvent::insert(&self.filter, row));
    }

    /// Push a raw change event to every open channel.
    pub fn send(&self, event: ChangeEvent) {
        // No receivers simply means nobody is subscribed yet.
        let _ = self.events.send(FeedMessage::Event(event));
    }

    /// Make every open channel fail with `reason`.
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.events.send(FeedMessage::Fail(reason.into()));
    }

    /// While offline, fetches and new subscriptions are refused.
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// While set, new subscriptions are refused but fetches still succeed.
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.shared.refuse_subscriptions.store(refuse, Ordering::SeqCst);
    }

    /// Number of currently open channels.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl MeasurementBackend for ChannelBackend {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Measurement>, FetchError> {
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("feed offline".to_string()));
        }

        let mut rows = self.shared.rows.lock().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn subscribe(&self, _filter: &TableFilter) -> Result<PushChannel, SubscriptionError> {
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(SubscriptionError::Open("feed offline".to_string()));
        }
        if self.shared.refuse_subscriptions.load(Ordering::SeqCst) {
            return Err(SubscriptionError::Rejected("subscriptions refused".to_string()));
        }

        let mut feed = self.events.subscribe();
        Ok(PushChannel::spawn(move |tx, mut shutdown| async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown => return Ok(()),
                    message = feed.recv() => match message {
                        Ok(FeedMessage::Event(event)) => {
                            if tx.send(event).await.is_err() {
                                // Receiver dropped
                                return Ok(());
                            }
                        }
                        Ok(FeedMessage::Fail(reason)) => {
                            return Err(SubscriptionError::Transport(reason));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Channel subscriber lagged, skipped {} events", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(SubscriptionError::Closed("feed dropped".to_string()));
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
