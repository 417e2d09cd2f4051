//! Connection registry for per-user routing
//!
//! The registry maps a user to the conduit of its live stream. Publishers
//! look a subscriber up and push into its conduit; the stream session on the
//! other end drains it and writes SSE frames to the client.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<ConnectionRegistry>
//!                 ┌───────────────────────────────┐
//!                 │ conduits: Mutex<HashMap<      │
//!                 │   UserId, Conduit { tx }      │
//!                 │ >>                            │
//!                 └──────┬─────────────────▲──────┘
//!                        │ lookup()        │ register() / release()
//!                        ▼                 │
//!                  [Publisher]       [StreamSession]
//!                  deliver() ──mpsc──► recv() ──► client
//! ```
//!
//! # Ownership
//!
//! The registry owns the only long-lived sender of each conduit; the
//! session owns the receiver. Replacing or removing an entry therefore
//! closes the conduit from the session's point of view once in-flight
//! publisher clones are dropped.

pub mod conduit;
pub mod config;
pub mod error;
pub mod store;

pub use conduit::{Conduit, ConduitId, ConduitReceiver, DeliveryPolicy, Message};
pub use config::RegistryConfig;
pub use error::DeliveryError;
pub use store::ConnectionRegistry;
