//! Synthetic price feed server
//!
//! Generates prices for the configured instruments and serves them over
//! HTTP and WebSocket.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use feed_server::config::{build_config, CliArgs as ConfigCliArgs};
use feed_server::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Synthetic price feed server
#[derive(Parser, Debug)]
#[command(name = "feed_server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host address to bind to
    #[arg(long, env = "FEED_SERVER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "FEED_SERVER_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FEED_LOG_LEVEL")]
    log_level: Option<String>,

    /// Fixed random seed for reproducible price paths
    #[arg(long, env = "FEED_RNG_SEED")]
    seed: Option<u64>,
}

impl From<Args> for ConfigCliArgs {
    fn from(args: Args) -> Self {
        ConfigCliArgs {
            config_file: args.config,
            host: args.host,
            port: args.port,
            log_level: args.log_level,
            seed: args.seed,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cli_args: ConfigCliArgs = args.into();
    let config = build_config(&cli_args).context("failed to load configuration")?;

    init_tracing(config.log_level.as_filter_str());

    tracing::info!("Price feed server v{}", feed_server::VERSION);
    tracing::info!(
        host = %config.host,
        port = %config.port,
        log_level = %config.log_level,
        environment = %config.environment,
        instruments = config.instruments.len(),
        check_interval_ms = config.scheduler.check_interval_ms,
        persistence_interval_ms = config.scheduler.persistence_interval_ms,
        publish_interval_ms = config.scheduler.publish_interval_ms,
        "Server configuration loaded"
    );

    let server = Server::build(config)
        .await
        .context("failed to initialise the price feed")?;
    tracing::info!(address = %server.config().socket_addr(), "Starting server");

    server.run().await.context("server terminated with an error")?;

    Ok(())
}
