//! Cartridge Reflector (reflector)

use anyhow::Context;
use clap::Parser;
use reflector_core::ManifestFetcher;
use reflector_server::{Router, Server, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reflector")]
#[command(about = "Rewrites cartridge manifests to carry a resolvable Source-Url", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Worker threads (0 = one per CPU)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let fetcher = ManifestFetcher::new().context("failed to create HTTP client")?;
    let config = ServerConfig {
        bind: cli.bind,
        workers: cli.workers,
    };

    let server = Server::bind(&config).with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(
        addr = %server.local_addr()?,
        workers = config.worker_count(),
        "cartridge reflector listening"
    );

    server.run(Arc::new(Router::new(fetcher)))?;
    Ok(())
}
