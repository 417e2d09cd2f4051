//! Outbound frame sink
//!
//! The HTTP layer turns the receiving half into the streaming response body.
//! When the client goes away the body, and with it the receiver, is dropped,
//! which the session observes as [`EventSink::closed`] or a failed send.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

/// The client transport is gone or did not accept a frame in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("client transport closed")]
    Closed,

    #[error("client did not accept frame within {0:?}")]
    TimedOut(Duration),
}

/// Writer for SSE frames towards one client
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Bytes>,
}

impl EventSink {
    /// Create a sink and the receiver that feeds the response body
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Write one frame, waiting at most `timeout` for the transport
    pub async fn send(&self, frame: Bytes, timeout: Duration) -> Result<(), SinkError> {
        self.tx.send_timeout(frame, timeout).await.map_err(|e| match e {
            mpsc::error::SendTimeoutError::Timeout(_) => SinkError::TimedOut(timeout),
            mpsc::error::SendTimeoutError::Closed(_) => SinkError::Closed,
        })
    }

    /// Resolves once the client side has been dropped
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
