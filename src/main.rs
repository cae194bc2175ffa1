//! relay-proxy binary.
//!
//! Starts the stub origin and the forwarding proxy, then exits non-zero as
//! soon as either listener stops.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use relay_proxy::config::validation::validate_config;
use relay_proxy::config::{load_config, ConfigError, ProxyConfig};
use relay_proxy::lifecycle::{launch, signals::shutdown_signal, Shutdown};
use relay_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "relay-proxy")]
#[command(about = "Single-origin HTTP reverse proxy with a built-in stub origin", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; defaults are used without it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = ProxyConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!("relay-proxy v0.1.0 starting");
    tracing::info!(
        origin_bind = %config.origin.bind_address,
        proxy_bind = %config.proxy.bind_address,
        origin_url = %config.proxy.origin_url,
        read_timeout_secs = config.timeouts.read_secs,
        write_timeout_secs = config.timeouts.write_secs,
        idle_timeout_secs = config.timeouts.idle_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    let supervisor = launch(&config, &shutdown)?;

    tokio::select! {
        err = supervisor.wait() => {
            tracing::error!(error = %err, "Server exited with error");
            std::process::exit(1);
        }
        _ = shutdown_signal() => {
            shutdown.trigger();
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
