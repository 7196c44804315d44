//! Push subscription lifecycle.

use std::sync::Arc;

use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use super::{ChangeEvent, MeasurementBackend, PushChannel, TableFilter};
use crate::data::Measurement;
use crate::error::{CloseOutcome, SubscriptionError};

/// Live feed of new measurements from a backend.
///
/// Holds at most one open [`PushChannel`]. Change events are filtered to
/// inserts on the configured table and decoded into [`Measurement`]s, which
/// the owner drains with [`try_next`](Self::try_next) or
/// [`next`](Self::next). Nothing is delivered after [`stop`](Self::stop)
/// returns.
///
/// Failures after a successful start are not retried here; they are kept in
/// [`fault`](Self::fault) and reported by the next `stop`.
#[derive(Debug)]
pub struct StreamSubscription {
    backend: Arc<dyn MeasurementBackend>,
    filter: TableFilter,
    channel: Option<PushChannel>,
    fault: Option<SubscriptionError>,
}

impl StreamSubscription {
    pub fn new(backend: Arc<dyn MeasurementBackend>, filter: TableFilter) -> Self {
        Self {
            backend,
            filter,
            channel: None,
            fault: None,
        }
    }

    /// Open the push channel, closing any channel that is already open.
    pub async fn start(&mut self) -> Result<(), SubscriptionError> {
        if self.channel.is_some() {
            let outcome = self.stop().await;
            debug!("Closed previous channel before restart: {:?}", outcome);
        }

        self.fault = None;
        let channel = self.backend.subscribe(&self.filter).await?;
        info!(
            "Subscribed to inserts on {}.{} via {}",
            self.filter.schema,
            self.filter.table,
            self.backend.description()
        );
        self.channel = Some(channel);
        Ok(())
    }

    /// Close the push channel.
    ///
    /// Stopping a subscription that is not running yields
    /// [`CloseOutcome::Closed`].
    pub async fn stop(&mut self) -> CloseOutcome {
        let Some(channel) = self.channel.take() else {
            return CloseOutcome::Closed;
        };

        let outcome = self.backend.unsubscribe(channel).await;
        match outcome {
            CloseOutcome::Closed => info!("Subscription closed"),
            CloseOutcome::TimedOut => warn!("Subscription close timed out"),
            CloseOutcome::Errored(ref e) => warn!("Subscription ended with error: {}", e),
        }
        self.fault = None;
        outcome
    }

    /// Take the next pending measurement without blocking.
    pub fn try_next(&mut self) -> Option<Measurement> {
        loop {
            let channel = self.channel.as_mut()?;
            match channel.try_recv() {
                Ok(event) => {
                    if let Some(measurement) = decode_event(&self.filter, event) {
                        return Some(measurement);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.record_fault();
                    return None;
                }
            }
        }
    }

    /// Wait for the next measurement.
    ///
    /// Returns `None` when not running or once the channel has ended.
    pub async fn next(&mut self) -> Option<Measurement> {
        loop {
            let channel = self.channel.as_mut()?;
            match channel.recv().await {
                Some(event) => {
                    if let Some(measurement) = decode_event(&self.filter, event) {
                        return Some(measurement);
                    }
                }
                None => {
                    self.record_fault();
                    return None;
                }
            }
        }
    }

    /// Whether a channel is open.
    pub fn is_active(&self) -> bool {
        self.channel.is_some()
    }

    /// The failure that ended the open channel, if it has ended.
    pub fn fault(&self) -> Option<&SubscriptionError> {
        self.fault.as_ref()
    }

    pub fn filter(&self) -> &TableFilter {
        &self.filter
    }

    pub fn backend(&self) -> &Arc<dyn MeasurementBackend> {
        &self.backend
    }

    fn record_fault(&mut self) {
        if self.fault.is_some() {
            return;
        }
        let fault = self
            .channel
            .as_ref()
            .and_then(PushChannel::fault)
            .unwrap_or_else(|| SubscriptionError::Closed("channel ended".to_string()));
        warn!("Live updates stopped: {}", fault);
        self.fault = Some(fault);
    }
}

fn decode_event(filter: &TableFilter, event: ChangeEvent) -> Option<Measurement> {
    if !filter.matches(&event) {
        debug!(
            "Ignoring {:?} on {}.{}",
            event.kind, event.schema, event.table
        );
        return None;
    }

    match Measurement::from_value(event.new_row) {
        Ok(measurement) => Some(measurement),
        Err(e) => {
            warn!("Failed to decode inserted row: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChangeKind, ChannelBackend, ChannelFeed};
    use chrono::{TimeZone, Utc};

    fn measurement(id: i64, distance: f64) -> Measurement {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(id);
        Measurement::new(id, t, "sensor-1", distance, false)
    }

    fn setup() -> (ChannelFeed, StreamSubscription) {
        let (feed, backend) = ChannelBackend::create("test");
        let subscription = StreamSubscription::new(Arc::new(backend), TableFilter::default());
        (feed, subscription)
    }

    #[tokio::test]
    async fn test_delivers_inserted_measurements() {
        let (feed, mut subscription) = setup();
        subscription.start().await.unwrap();

        feed.insert(measurement(1, 12.0));
        feed.insert(measurement(2, 31.0));

        assert_eq!(subscription.next().await.unwrap().id, 1);
        assert_eq!(subscription.next().await.unwrap().id, 2);
        assert!(subscription.try_next().is_none());
    }

    #[tokio::test]
    async fn test_skips_other_tables_kinds_and_bad_rows() {
        let (feed, mut subscription) = setup();
        subscription.start().await.unwrap();

        let row = serde_json::to_value(measurement(1, 10.0)).unwrap();
        feed.send(ChangeEvent::insert(&TableFilter::new("other"), row.clone()));
        let mut update = ChangeEvent::insert(&TableFilter::default(), row);
        update.kind = ChangeKind::Update;
        feed.send(update);
        feed.send(ChangeEvent::insert(
            &TableFilter::default(),
            serde_json::json!({"id": "bogus"}),
        ));
        feed.insert(measurement(9, 10.0));

        assert_eq!(subscription.next().await.unwrap().id, 9);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (_feed, mut subscription) = setup();

        // Never started
        assert_eq!(subscription.stop().await, CloseOutcome::Closed);

        subscription.start().await.unwrap();
        assert!(subscription.is_active());
        assert_eq!(subscription.stop().await, CloseOutcome::Closed);
        assert!(!subscription.is_active());
        assert_eq!(subscription.stop().await, CloseOutcome::Closed);
    }

    #[tokio::test]
    async fn test_restart_keeps_single_channel() {
        let (feed, mut subscription) = setup();
        subscription.start().await.unwrap();
        subscription.start().await.unwrap();
        assert_eq!(feed.subscriber_count(), 1);

        feed.insert(measurement(1, 10.0));
        assert_eq!(subscription.next().await.unwrap().id, 1);
        assert!(subscription.try_next().is_none());
    }

    #[tokio::test]
    async fn test_nothing_delivered_after_stop() {
        let (feed, mut subscription) = setup();
        subscription.start().await.unwrap();

        feed.insert(measurement(1, 10.0));
        subscription.stop().await;
        feed.insert(measurement(2, 10.0));

        assert!(subscription.try_next().is_none());
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn test_open_failure_surfaces_at_start() {
        let (feed, mut subscription) = setup();
        feed.set_offline(true);

        let result = subscription.start().await;
        assert!(matches!(result, Err(SubscriptionError::Open(_))));
        assert!(!subscription.is_active());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_reported_on_stop() {
        let (feed, mut subscription) = setup();
        subscription.start().await.unwrap();

        feed.fail("connection reset");

        assert!(subscription.next().await.is_none());
        assert_eq!(
            subscription.fault(),
            Some(&SubscriptionError::Transport("connection reset".to_string()))
        );
        assert!(matches!(subscription.stop().await, CloseOutcome::Errored(_)));
        assert!(subscription.fault().is_none());
    }
}
