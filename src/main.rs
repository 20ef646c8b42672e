//! Authenticating HTTP forward proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ net::listener ──▶ proxy::handler ──┬─▶ proxy::auth (407 on failure)
//!                                                 ├─▶ proxy::request
//!                                                 └─▶ net::origin ──▶ Origin
//!                                                          │
//!   Client ◀──────────────── net::relay ◀──────────────────┘
//!
//!   Cross-cutting: config, observability (tracing, access log, metrics),
//!   lifecycle (signals, shutdown + drain)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use forward_proxy::config::loader::{load_config, process_env};
use forward_proxy::config::{ConfigError, ProxyConfig};
use forward_proxy::lifecycle::Shutdown;
use forward_proxy::net::listener::Listener;
use forward_proxy::observability::{logging, metrics, AccessLog};
use forward_proxy::ProxyServer;

#[derive(Parser, Debug)]
#[command(name = "forward-proxy")]
#[command(about = "Authenticating HTTP/HTTPS forward proxy", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port on all interfaces (overrides listener.bind_address)
    #[arg(short, long)]
    port: Option<u16>,

    /// Full bind address, e.g. 127.0.0.1:3128
    #[arg(long, conflicts_with = "port")]
    bind: Option<String>,

    /// Access log file
    #[arg(long)]
    log_file: Option<String>,

    /// Do not mirror access log records to stdout
    #[arg(long)]
    no_console_log: bool,
}

impl Cli {
    fn apply(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            config.listener.bind_address = format!("0.0.0.0:{port}");
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(path) = &self.log_file {
            config.access_log.path = path.clone();
        }
        if self.no_console_log {
            config.access_log.console = false;
        }
    }
}

fn build_config(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    load_config(cli.config.as_deref(), process_env, |config| cli.apply(config))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        username = %config.auth.username,
        access_log = %config.access_log.path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let access_log = Arc::new(AccessLog::from_config(&config.access_log).await?);
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = ProxyServer::from_config(&config, access_log);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
