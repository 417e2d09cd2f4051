//! Registry error types

use std::time::Duration;

/// Why a message could not be handed to a conduit
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Conduit buffer full; the message was discarded
    #[error("conduit full, message dropped")]
    Full,

    /// No buffer space freed up within the policy's wait
    #[error("conduit still full after {0:?}, message dropped")]
    TimedOut(Duration),

    /// The owning session already closed the conduit
    #[error("conduit closed")]
    Closed,
}
