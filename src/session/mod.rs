//! Per-connection stream sessions
//!
//! A [`StreamSession`] owns the receiving half of one conduit and relays
//! what arrives there to the client as server-sent events.

pub mod codec;
pub mod config;
pub mod sink;
pub mod state;

pub use codec::{EventDecoder, EventPayload};
pub use config::SessionConfig;
pub use sink::{EventSink, SinkError};
pub use state::{CloseReason, SessionError, StreamPhase, StreamSession};
