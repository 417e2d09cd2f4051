//! HTTP server for the relay

pub mod config;
pub mod error;
pub mod listener;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use listener::RelayServer;
pub use state::AppState;
