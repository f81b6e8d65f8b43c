//! HTTP and WebSocket server for the synthetic price feed
//!
//! Serves the model configuration API, price history and a live price
//! stream on top of `feed_engine`, backed by the in-memory store.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use config::{build_config, CliArgs, ConfigError, InstrumentSeed, ServerConfig};
pub use error::{ApiError, ErrorResponse, ServerError};
pub use server::Server;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
