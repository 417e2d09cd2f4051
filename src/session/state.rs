//! Stream session state machine
//!
//! Tracks one SSE client from connection to disconnection:
//!
//! ```text
//!   Connecting ──connect(ok)──► Streaming ──close(reason)──► Closed
//!       │                                                      ▲
//!       └───────────connect(invalid id)────────────────────────┘
//! ```
//!
//! Each transition is a method so it can be driven without a network
//! connection; [`StreamSession::run`] strings them together for a live
//! stream.

use std::sync::Arc;

use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::codec;
use super::config::SessionConfig;
use super::sink::{EventSink, SinkError};
use crate::ids::{IdParseError, UserId};
use crate::registry::{ConduitId, ConduitReceiver, ConnectionRegistry, Message};
use crate::stats::RelayStats;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Waiting for a valid user identity
    Connecting,
    /// Registered and relaying messages
    Streaming,
    /// Torn down; terminal
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Identity was missing or malformed
    Rejected,
    /// Server shutdown
    Cancelled,
    /// The client dropped the response body
    ClientGone,
    /// A frame could not be written to the client
    FlushFailed,
    /// The conduit closed underneath us, i.e. a newer connection for the
    /// same user took over the registration
    ConduitClosed,
    /// The session was dropped without an explicit close
    Dropped,
}

/// Errors from session transitions
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("missing user id")]
    MissingUserId,

    #[error(transparent)]
    InvalidUserId(#[from] IdParseError),

    #[error("cannot {action} a session in phase {phase:?}")]
    InvalidTransition {
        action: &'static str,
        phase: StreamPhase,
    },

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("session cancelled during write")]
    Cancelled,
}

/// One SSE client connection
pub struct StreamSession {
    registry: Arc<ConnectionRegistry>,
    stats: Arc<RelayStats>,
    config: SessionConfig,
    phase: StreamPhase,
    user_id: Option<UserId>,
    conduit: Option<ConduitReceiver>,
    close_reason: Option<CloseReason>,
}

impl StreamSession {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        stats: Arc<RelayStats>,
        config: SessionConfig,
    ) -> Self {
        Self {
            registry,
            stats,
            config,
            phase: StreamPhase::Connecting,
            user_id: None,
            conduit: None,
            close_reason: None,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// ID of the conduit this session owns, while streaming
    pub fn conduit_id(&self) -> Option<ConduitId> {
        self.conduit.as_ref().map(ConduitReceiver::id)
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Validate the identity and register a conduit for it
    pub fn connect(&mut self, raw_user_id: Option<&str>) -> Result<UserId, SessionError> {
        if self.phase != StreamPhase::Connecting {
            return Err(SessionError::InvalidTransition {
                action: "connect",
                phase: self.phase,
            });
        }

        let parsed = match raw_user_id {
            Some(raw) => raw.parse::<UserId>().map_err(SessionError::from),
            None => Err(SessionError::MissingUserId),
        };
        let user_id = match parsed {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::warn!(raw_user_id = ?raw_user_id, error = %e, "Stream rejected");
                self.close(CloseReason::Rejected);
                return Err(e);
            }
        };

        let conduit = self.registry.register(user_id);
        self.stats.stream_opened();

        tracing::info!(
            user_id = %user_id,
            conduit_id = %conduit.id(),
            "Stream connected"
        );

        self.user_id = Some(user_id);
        self.conduit = Some(conduit);
        self.phase = StreamPhase::Streaming;
        Ok(user_id)
    }

    /// Wait for the next message on the conduit
    ///
    /// Returns `None` if the conduit has closed or the session is not streaming.
    pub async fn recv(&mut self) -> Option<Message> {
        match self.conduit.as_mut() {
            Some(conduit) => conduit.recv().await,
            None => None,
        }
    }

    /// Write one message to the client
    ///
    /// A write failure closes the session with [`CloseReason::FlushFailed`].
    pub async fn deliver(&mut self, message: &Message, sink: &EventSink) -> Result<(), SessionError> {
        if self.phase != StreamPhase::Streaming {
            return Err(SessionError::InvalidTransition {
                action: "deliver",
                phase: self.phase,
            });
        }

        self.relay(message, sink, None).await
    }

    async fn relay(
        &mut self,
        message: &Message,
        sink: &EventSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SessionError> {
        let frame = codec::encode_event(message)?;
        self.write(frame, sink, cancel).await?;

        tracing::debug!(
            user_id = ?self.user_id,
            bytes = message.len(),
            "Message delivered"
        );
        Ok(())
    }

    async fn send_keep_alive(
        &mut self,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        self.write(codec::keep_alive(), sink, Some(cancel)).await
    }

    /// Write one frame; a cancelled `cancel` abandons a write that is still
    /// waiting on the transport and closes with [`CloseReason::Cancelled`].
    async fn write(
        &mut self,
        frame: bytes::Bytes,
        sink: &EventSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SessionError> {
        let timeout = self.config.write_timeout;
        let sent = match cancel {
            Some(cancel) => tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    self.close(CloseReason::Cancelled);
                    return Err(SessionError::Cancelled);
                }
                result = sink.send(frame, timeout) => result,
            },
            None => sink.send(frame, timeout).await,
        };

        if let Err(e) = sent {
            tracing::debug!(user_id = ?self.user_id, error = %e, "Write to client failed");
            self.close(CloseReason::FlushFailed);
            return Err(e.into());
        }
        Ok(())
    }

    /// Tear the session down
    ///
    /// Releases the registry entry (only if this session still owns it) and
    /// closes the conduit. Returns `false` if the session was already closed.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if self.phase == StreamPhase::Closed {
            return false;
        }

        self.phase = StreamPhase::Closed;
        self.close_reason = Some(reason);

        if let Some(mut conduit) = self.conduit.take() {
            let user_id = conduit.user_id();
            self.stats.stream_closed();
            let released = self.registry.release(user_id, conduit.id());
            conduit.close();

            tracing::info!(
                user_id = %user_id,
                conduit_id = %conduit.id(),
                reason = ?reason,
                released = released,
                "Stream closed"
            );
        }

        true
    }

    /// Relay messages to `sink` until the stream ends
    ///
    /// Ends on cancellation, when the client goes away, when a write fails,
    /// or when the conduit is closed by a newer registration.
    pub async fn run(mut self, sink: EventSink, cancel: CancellationToken) -> CloseReason {
        if self.phase != StreamPhase::Streaming {
            self.close(CloseReason::Cancelled);
            return self.close_reason.unwrap_or(CloseReason::Cancelled);
        }

        let mut keep_alive = self.config.keep_alive.map(|period| {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let reason = loop {
            let Some(conduit) = self.conduit.as_mut() else {
                break self.close_reason.unwrap_or(CloseReason::ConduitClosed);
            };

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break CloseReason::Cancelled,
                _ = sink.closed() => break CloseReason::ClientGone,
                message = conduit.recv() => match message {
                    Some(message) => {
                        if self.relay(&message, &sink, Some(&cancel)).await.is_err() {
                            break self.close_reason.unwrap_or(CloseReason::FlushFailed);
                        }
                    }
                    None => break CloseReason::ConduitClosed,
                },
                _ = tick(&mut keep_alive) => {
                    if self.send_keep_alive(&sink, &cancel).await.is_err() {
                        break self.close_reason.unwrap_or(CloseReason::FlushFailed);
                    }
                }
            }
        };

        self.close(reason);
        self.close_reason.unwrap_or(reason)
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close(CloseReason::Dropped);
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
