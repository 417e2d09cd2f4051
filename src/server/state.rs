use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::publish::Publisher;
use crate::registry::ConnectionRegistry;
use crate::session::SessionConfig;
use crate::stats::RelayStats;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Live stream conduits per user
    pub registry: Arc<ConnectionRegistry>,
    /// Routes posted messages to subscribers
    pub publisher: Arc<Publisher>,
    pub stats: Arc<RelayStats>,
    /// Settings for each new stream session
    pub session: SessionConfig,
    /// Cancelled on shutdown; every stream holds a child token
    pub shutdown: CancellationToken,
    pub index_file: Option<Arc<PathBuf>>,
}
