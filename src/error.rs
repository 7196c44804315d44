//! Error types for backend access.

use thiserror::Error;

/// Errors that can occur while fetching the initial batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backend could not be reached.
    #[error("Connection failed: {0}")]
    Transport(String),

    /// The backend answered with an error status.
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// The response body was not a list of measurements.
    #[error("Failed to decode measurements: {0}")]
    Decode(String),

    /// Reading a local seed file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a push subscription.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The channel could not be opened.
    #[error("Failed to open channel: {0}")]
    Open(String),

    /// The backend refused the subscription.
    #[error("Subscription rejected: {0}")]
    Rejected(String),

    /// The transport failed after the channel was open.
    #[error("Channel transport failed: {0}")]
    Transport(String),

    /// The remote side closed the channel.
    #[error("Channel closed by remote: {0}")]
    Closed(String),
}

/// Result of closing a push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The channel shut down cleanly, or was never open.
    Closed,
    /// The channel did not acknowledge the close in time and was aborted.
    TimedOut,
    /// The channel had failed, or failed while closing.
    Errored(SubscriptionError),
}

impl CloseOutcome {
    pub fn is_closed(&self) -> bool {
        matches!(self, CloseOutcome::Closed)
    }
}

#[cfg(feature = "supabase")]
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Backend {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}
