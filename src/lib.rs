//! Project-scoped server-sent event relay
//!
//! Clients hold an SSE stream open under a user identity. Publishers post a
//! message for a project, and the relay forwards it to every subscriber of
//! that project that is connected at that moment.
//!
//! ```text
//!   POST /post?projectid=P           GET /events?id=U
//!          │                                │
//!          ▼                                ▼
//!     [Publisher] ──lookup(P)──► [ProjectDirectory]
//!          │                                │
//!          │  lookup(U)                register(U)
//!          ▼                                ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ ConnectionRegistry: Mutex<HashMap<U, Conduit>> │
//!   └──────────────────────────────────────────────┘
//!          │ deliver()                      ▲
//!          └──────► mpsc ──► [StreamSession] ──► data: {...} \n\n ──► client
//! ```
//!
//! Delivery is best-effort: subscribers that are not connected miss the
//! message, and a full conduit sheds load according to its
//! [`DeliveryPolicy`](registry::DeliveryPolicy).

pub mod directory;
pub mod error;
pub mod ids;
pub mod publish;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use directory::{Project, ProjectDirectory, StaticDirectory};
pub use error::{Error, Result};
pub use ids::{ProjectId, UserId};
pub use publish::{PublishOutcome, PublishReport, Publisher};
pub use registry::{ConnectionRegistry, DeliveryPolicy, Message, RegistryConfig};
pub use server::{RelayServer, ServerConfig};
pub use session::{CloseReason, SessionConfig, StreamPhase, StreamSession};
pub use stats::RelayStats;
