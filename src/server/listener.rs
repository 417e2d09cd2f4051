//! Relay server listener
//!
//! Binds the HTTP listener and serves the router until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::directory::ProjectDirectory;
use crate::error::Result;
use crate::publish::Publisher;
use crate::registry::ConnectionRegistry;
use crate::server::config::ServerConfig;
use crate::server::routes;
use crate::server::state::AppState;
use crate::stats::RelayStats;

/// SSE relay server
pub struct RelayServer {
    config: ServerConfig,
    state: AppState,
}

impl RelayServer {
    /// Create a new server with the given configuration and project directory
    pub fn new(config: ServerConfig, directory: Arc<dyn ProjectDirectory>) -> Self {
        let registry = Arc::new(ConnectionRegistry::with_config(config.registry.clone()));
        let stats = Arc::new(RelayStats::new());
        let publisher = Arc::new(Publisher::new(
            Arc::clone(&registry),
            directory,
            Arc::clone(&stats),
        ));

        let state = AppState {
            registry,
            publisher,
            stats,
            session: config.session.clone(),
            shutdown: CancellationToken::new(),
            index_file: config.index_file.clone().map(Arc::new),
        };

        Self { config, state }
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.state.publisher
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.state.stats
    }

    /// Token that ends every open stream when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Build the HTTP router over this server's state
    pub fn router(&self) -> Router {
        routes::build_router(self.state.clone())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    ///
    /// When `shutdown` resolves, open streams are cancelled so that in-flight
    /// responses finish and the server can drain.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Relay server listening");

        let streams = self.state.shutdown.clone();
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
                streams.cancel();
            })
            .await;

        self.state.shutdown.cancel();
        result?;

        tracing::info!("Relay server stopped");
        Ok(())
    }
}
