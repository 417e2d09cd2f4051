use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use notify_relay::registry::DeliveryPolicy;
use notify_relay::{ProjectDirectory, RelayServer, ServerConfig, StaticDirectory};

/// Project-scoped server-sent event relay
#[derive(Parser, Debug)]
#[command(name = "notify-relay", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// JSON file with the project table; the built-in demo table is used if omitted
    #[arg(long, env = "RELAY_PROJECTS")]
    projects: Option<PathBuf>,

    /// HTML page to serve at /
    #[arg(long, env = "RELAY_INDEX_FILE")]
    index_file: Option<PathBuf>,

    /// Messages buffered per connected user
    #[arg(long, env = "RELAY_CONDUIT_CAPACITY", default_value_t = 64)]
    conduit_capacity: usize,

    /// How long a publish waits on a full buffer, in milliseconds (0 = drop immediately)
    #[arg(long, env = "RELAY_DELIVERY_TIMEOUT_MS", default_value_t = 0)]
    delivery_timeout_ms: u64,

    /// Seconds between keep-alive comments on idle streams (0 = off)
    #[arg(long, env = "RELAY_KEEP_ALIVE_SECS", default_value_t = 15)]
    keep_alive_secs: u64,

    /// Enable structured JSON logging
    #[arg(long, env = "RELAY_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let policy = match self.delivery_timeout_ms {
            0 => DeliveryPolicy::DropNewest,
            ms => DeliveryPolicy::BoundedWait(Duration::from_millis(ms)),
        };

        let mut config = ServerConfig::with_addr(self.bind)
            .conduit_capacity(self.conduit_capacity)
            .delivery_policy(policy);

        config = match self.keep_alive_secs {
            0 => config.disable_keep_alive(),
            secs => config.keep_alive(Duration::from_secs(secs)),
        };

        if let Some(ref index) = self.index_file {
            config = config.index_file(index.clone());
        }
        config
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("notify_relay=info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    tracing::info!("notify-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let directory = match cli.projects {
        Some(ref path) => StaticDirectory::from_json_file(path)?,
        None => StaticDirectory::builtin(),
    };
    tracing::info!(projects = directory.len(), "Project directory loaded");
    let directory: Arc<dyn ProjectDirectory> = Arc::new(directory);

    let server = RelayServer::new(cli.server_config(), directory);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
