//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::{DeliveryPolicy, RegistryConfig};
use crate::session::SessionConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Connection registry settings (conduit buffer, delivery policy)
    pub registry: RegistryConfig,

    /// Per-stream settings (keep-alive, write timeout)
    pub session: SessionConfig,

    /// HTML page served at `/`
    pub index_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            registry: RegistryConfig::default(),
            session: SessionConfig::default(),
            index_file: None,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the per-conduit message buffer
    pub fn conduit_capacity(mut self, capacity: usize) -> Self {
        self.registry = self.registry.conduit_capacity(capacity);
        self
    }

    /// Set what happens when a subscriber's buffer is full
    pub fn delivery_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.registry = self.registry.delivery_policy(policy);
        self
    }

    /// Set the keep-alive interval for idle streams
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.session = self.session.keep_alive(interval);
        self
    }

    /// Disable keep-alive comments
    pub fn disable_keep_alive(mut self) -> Self {
        self.session = self.session.disable_keep_alive();
        self
    }

    /// Set the per-frame write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.session = self.session.write_timeout(timeout);
        self
    }

    /// Serve a static page at `/`
    pub fn index_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_file = Some(path.into());
        self
    }
}
