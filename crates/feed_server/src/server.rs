//! Server startup and shutdown
//!
//! [`Server::build`] seeds the store with the configured instruments, wires
//! the engine components and starts the scheduler. [`Server::run`] then
//! serves HTTP while the generation loop runs in a background task.
//!
//! Shutdown is driven by one stop flag. It flips on Ctrl-C/SIGTERM or when
//! the generation loop stops on its own; live streams end, the listener
//! drains, and the loop gets `shutdown_timeout_secs` to finish.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use feed_engine::{
    BroadcastHub, EngineError, GenerationScheduler, ModelManager, PriceFeedService,
    SchedulerState,
};
use infra_store::{ConfigStore, InstrumentRecord, MemoryStore, PriceSample, PriceStore};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{InstrumentSeed, ServerConfig};
use crate::error::ServerError;
use crate::routes::{self, AppState};

/// Server instance that can be started
pub struct Server {
    config: Arc<ServerConfig>,
    store: Arc<MemoryStore>,
    scheduler: Arc<GenerationScheduler>,
    service: PriceFeedService,
    stop: watch::Sender<bool>,
    router: Router,
}

impl Server {
    /// Seeds the store, wires the engine and starts the scheduler.
    pub async fn build(config: ServerConfig) -> Result<Self, ServerError> {
        let config = Arc::new(config);
        let store = Arc::new(MemoryStore::new());
        seed_instruments(store.as_ref(), &config.instruments).await?;

        let manager = Arc::new(ModelManager::new(store.clone()));
        let hub = Arc::new(BroadcastHub::new(config.hub.clone(), store.clone()));
        let scheduler = Arc::new(GenerationScheduler::new(
            config.scheduler.clone(),
            manager.clone(),
            store.clone(),
            hub.clone(),
        ));
        scheduler.start().await?;

        let service = PriceFeedService::new(manager, hub);
        let (stop, stop_rx) = watch::channel(false);
        let state = AppState::new(config.clone(), service.clone(), scheduler.clone(), stop_rx);
        let router = routes::build_router(state);

        Ok(Self {
            config,
            store,
            scheduler,
            service,
            stop,
            router,
        })
    }

    /// Get the socket address the server will bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = self.config.socket_addr();
        addr.parse().map_err(|_| ServerError::InvalidAddress(addr))
    }

    /// Get the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Router sharing this server's state
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<GenerationScheduler> {
        &self.scheduler
    }

    pub fn service(&self) -> &PriceFeedService {
        &self.service
    }

    /// Binds the configured address and serves until a shutdown signal.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.run_with_listener(listener).await
    }

    /// Serves on an already bound listener until a shutdown signal.
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Serves until `signal` resolves or the generation loop stops.
    ///
    /// Returns the loop's error if it stopped on its own.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let Server {
            config,
            scheduler,
            stop,
            router,
            ..
        } = self;

        let generation = {
            let scheduler = Arc::clone(&scheduler);
            let mut stop_rx = stop.subscribe();
            tokio::spawn(async move {
                scheduler
                    .run(async move {
                        let _ = stop_rx.wait_for(|stopped| *stopped).await;
                    })
                    .await
            })
        };

        let mut states = scheduler.watch_state();
        let shutdown = async move {
            tokio::select! {
                _ = signal => info!("Shutdown signal received"),
                _ = states.wait_for(|state| *state == SchedulerState::Stopped) => {
                    warn!("Generation loop stopped, shutting down");
                }
            }
            stop.send_replace(true);
        };

        info!(%addr, "Server listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        let timeout = Duration::from_secs(config.shutdown_timeout_secs);
        match tokio::time::timeout(timeout, generation).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join)) => return Err(ServerError::Task(join.to_string())),
            Err(_) => warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "Generation loop did not stop in time"
            ),
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Creates every configured instrument with its first price.
async fn seed_instruments<S>(store: &S, seeds: &[InstrumentSeed]) -> Result<(), ServerError>
where
    S: ConfigStore + PriceStore,
{
    let now = Utc::now();
    for seed in seeds {
        let name = seed.name.trim();
        let mut record = InstrumentRecord::new(name, seed.tick_interval_ms);
        if let Some(model) = &seed.model {
            record = record.with_model(model.clone());
        }
        store
            .upsert_instrument(&record)
            .await
            .map_err(EngineError::from)?;
        store
            .append(PriceSample::new(name, seed.initial_price, now))
            .await
            .map_err(EngineError::from)?;
        info!(
            instrument = name,
            price = seed.initial_price,
            tick_interval_ms = seed.tick_interval_ms,
            "Instrument seeded"
        );
    }
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
