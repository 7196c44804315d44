//! Bounded, newest-first measurement history.

use std::collections::vec_deque::{self, VecDeque};

use super::limits::WINDOW_CAPACITY;
use super::measurement::Measurement;
use super::status::{classify, Status};

/// Bounded history of the most recent measurements, newest first.
///
/// The window is seeded once from the initial batch and then grows by
/// prepending pushed measurements. Entries are kept in arrival order and are
/// never re-sorted or deduplicated: a notification delivered twice shows up
/// twice.
#[derive(Debug, Clone)]
pub struct MeasurementWindow {
    items: VecDeque<Measurement>,
    capacity: usize,
}

impl Default for MeasurementWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementWindow {
    /// Create an empty window with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    /// Create an empty window holding at most `capacity` measurements.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Replace the contents with an initial batch.
    ///
    /// The batch must already be newest-first; its order is kept as given.
    /// Anything past the capacity is dropped from the old end.
    pub fn seed(&mut self, batch: impl IntoIterator<Item = Measurement>) {
        self.items.clear();
        self.items.extend(batch.into_iter().take(self.capacity));
    }

    /// Prepend a measurement, evicting the oldest one if the cap is exceeded.
    pub fn push(&mut self, measurement: Measurement) {
        self.items.push_front(measurement);
        if self.items.len() > self.capacity {
            self.items.pop_back();
        }
    }

    /// The most recent measurement, if any.
    pub fn latest(&self) -> Option<&Measurement> {
        self.items.front()
    }

    /// All measurements, newest first.
    pub fn all(&self) -> vec_deque::Iter<'_, Measurement> {
        self.items.iter()
    }

    /// Status of the latest measurement, recomputed on every call.
    pub fn status(&self) -> Status {
        classify(self.latest().map(Measurement::distance_cm))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
