//! Route modules for the feed server
//!
//! - health: liveness and readiness probes
//! - models: model catalogue and per-instrument configuration
//! - prices: price history and the live WebSocket stream

pub mod health;
pub mod models;
pub mod prices;

use std::sync::Arc;

use axum::Router;
use feed_engine::{GenerationScheduler, PriceFeedService};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
    /// Client-facing feed operations
    pub service: PriceFeedService,
    /// Generation loop, for status and snapshots
    pub scheduler: Arc<GenerationScheduler>,
    /// Turns true when the server shuts down; ends live streams
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        config: Arc<ServerConfig>,
        service: PriceFeedService,
        scheduler: Arc<GenerationScheduler>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            start_time: std::time::Instant::now(),
            service,
            scheduler,
            shutdown,
        }
    }
}

/// Build the main application router by merging all route modules
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(models::routes())
        .merge(prices::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
