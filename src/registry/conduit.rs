//! Conduits: the per-connection message channel
//!
//! A conduit is a bounded `mpsc` channel. The registry holds the sending
//! half and hands out clones to publishers; the receiving half belongs to
//! exactly one [`StreamSession`](crate::session::StreamSession).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};

use super::error::DeliveryError;
use crate::ids::UserId;

/// Text payload relayed to subscribers
///
/// Cloning shares the underlying allocation, so fan-out to many
/// subscribers does not copy the text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message(Arc<str>);

impl Message {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-unique conduit identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConduitId(pub u64);

impl fmt::Display for ConduitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a publisher does when a conduit's buffer is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Fail immediately and discard the new message
    DropNewest,
    /// Wait up to the given duration for space, then discard
    BoundedWait(Duration),
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        DeliveryPolicy::DropNewest
    }
}

/// Sending half of a conduit
#[derive(Debug, Clone)]
pub struct Conduit {
    id: ConduitId,
    user_id: UserId,
    policy: DeliveryPolicy,
    tx: mpsc::Sender<Message>,
}

impl Conduit {
    pub(super) fn channel(
        id: ConduitId,
        user_id: UserId,
        capacity: usize,
        policy: DeliveryPolicy,
    ) -> (Self, ConduitReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let conduit = Self {
            id,
            user_id,
            policy,
            tx,
        };
        let receiver = ConduitReceiver { id, user_id, rx };
        (conduit, receiver)
    }

    pub fn id(&self) -> ConduitId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Whether the owning session has closed its end
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Hand a message to the owning session
    ///
    /// Never waits longer than the conduit's [`DeliveryPolicy`] allows.
    pub async fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        match self.policy {
            DeliveryPolicy::DropNewest => self.tx.try_send(message).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::Full,
                TrySendError::Closed(_) => DeliveryError::Closed,
            }),
            DeliveryPolicy::BoundedWait(timeout) => {
                self.tx
                    .send_timeout(message, timeout)
                    .await
                    .map_err(|e| match e {
                        SendTimeoutError::Timeout(_) => DeliveryError::TimedOut(timeout),
                        SendTimeoutError::Closed(_) => DeliveryError::Closed,
                    })
            }
        }
    }
}

/// Receiving half of a conduit, owned by one stream session
#[derive(Debug)]
pub struct ConduitReceiver {
    id: ConduitId,
    user_id: UserId,
    rx: mpsc::Receiver<Message>,
}

impl ConduitReceiver {
    pub fn id(&self) -> ConduitId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Wait for the next message
    ///
    /// Returns `None` once every sender is gone, i.e. the registry no longer
    /// holds this conduit and no publisher is mid-delivery.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Take a buffered message without waiting
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting messages; anything already buffered is discarded on drop
    pub fn close(&mut self) {
        self.rx.close();
    }
}
