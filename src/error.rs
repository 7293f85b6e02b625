//! Error types for the channel primitives.
//!
//! Streams never carry errors: a cancelled pipeline simply yields fewer values
//! and closes. These errors only surface from the low-level [`Sender`] and
//! [`Context`] operations, which workers use to decide when to stop.
//!
//! [`Sender`]: crate::stream::Sender
//! [`Context`]: crate::context::Context

use tokio::sync::mpsc::error::SendError;

/// Why a send or a wait on a [`Context`](crate::context::Context) was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// The context was cancelled
    #[error("context canceled")]
    Cancelled,

    /// The context's deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The receiving half of the stream was dropped
    #[error("stream receiver was dropped")]
    Disconnected,
}

impl Error {
    /// Whether this error comes from the context rather than the channel.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

impl<T> From<SendError<T>> for Error {
    fn from(_: SendError<T>) -> Self {
        Error::Disconnected
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cancellation() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::Disconnected.is_cancellation());
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::Cancelled.to_string(), "context canceled");
        assert_eq!(
            Error::DeadlineExceeded.to_string(),
            "context deadline exceeded"
        );
    }

    #[test]
    fn test_from_send_error() {
        let err: Error = SendError(42).into();
        assert_eq!(err, Error::Disconnected);
    }
}
