//! Collector server assembly: backend selection, restore, serve, final flush.

use crate::app_state::AppState;
use crate::backoff::Backoff;
use crate::config::{ServerConfig, TelemetryExporter};
use crate::domain::{MetricsStorage, StoragePtr, TelemetryPtr};
use crate::infrastructure::storage::{is_retryable_pg_error, is_retryable_redis_error};
use crate::infrastructure::{
    create_noop_telemetry, create_prom_telemetry, MemStorage, PgStorage, RedisStorage,
    RetryableStorage, SavePolicy, StorageSaver,
};
use crate::shutdown::Shutdown;
use crate::signer::Signer;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Picks the storage backend: PostgreSQL when a DSN is set, then Redis, then
/// in-memory. Remote backends always sit behind the retry decorator.
pub async fn create_storage(config: &ServerConfig) -> Result<StoragePtr> {
    // ---
    if let Some(dsn) = &config.database_dsn {
        let pg = Backoff::standard()
            .with_classifier(is_retryable_pg_error)
            .retry(|| PgStorage::connect(dsn))
            .await?;
        return Ok(Arc::new(RetryableStorage::new(Arc::new(pg), is_retryable_pg_error)));
    }

    if let Some(url) = &config.redis_url {
        let redis: StoragePtr = Arc::new(RedisStorage::open(url)?);
        let storage = Arc::new(RetryableStorage::new(redis, is_retryable_redis_error));
        storage.ping().await?;
        tracing::info!("Redis storage ready");
        return Ok(storage);
    }

    tracing::info!("Using in-memory storage");
    Ok(Arc::new(MemStorage::new()))
}

pub fn create_telemetry(exporter: TelemetryExporter) -> Result<TelemetryPtr> {
    match exporter {
        TelemetryExporter::Prometheus => create_prom_telemetry(),
        TelemetryExporter::Noop => create_noop_telemetry(),
    }
}

/// A fully wired collector server, ready to serve.
pub struct Server {
    // ---
    state: AppState,
    signer: Option<Signer>,
}

impl Server {
    // ---
    pub fn new(state: AppState, signer: Option<Signer>) -> Self {
        Self { state, signer }
    }

    /// Builds storage, telemetry and the saver from `config`, restoring the
    /// last snapshot when asked to.
    ///
    /// The saver is only attached to the in-memory backend; remote backends
    /// are durable on their own.
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        // ---
        let telemetry = create_telemetry(config.exporter)?;
        let storage = create_storage(config).await?;
        let mut state = AppState::new(storage.clone(), telemetry);

        let is_memory = config.database_dsn.is_none() && config.redis_url.is_none();
        if let (true, Some(path)) = (is_memory, &config.file_storage_path) {
            let saver = StorageSaver::open(storage, path).await?;

            if config.restore {
                if let Err(err) = saver.load().await {
                    tracing::warn!("Snapshot restore failed, continuing with what was loaded: {err:#}");
                }
            }

            tracing::info!(path = %path.display(), interval = ?config.store_interval, "Snapshot saver enabled");
            state = state.with_saver(saver, SavePolicy::new(config.store_interval));
        }

        let signer = config.key.as_deref().and_then(Signer::new);
        if signer.is_some() {
            tracing::info!("Request signing enabled");
        }

        Ok(Self::new(state, signer))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        crate::create_router(self.state.clone(), self.signer.clone())
    }

    /// Serves until `shutdown` fires, lets in-flight requests finish, then
    /// writes a final snapshot.
    pub async fn serve(self, listener: TcpListener, shutdown: Shutdown) -> Result<()> {
        // ---
        let address = listener.local_addr()?;
        tracing::info!("Listening on {address}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        // Graceful shutdown returns only after in-flight handlers complete,
        // so this flush sees every update a client got a response for.
        tracing::info!("Server stopped, flushing storage");
        self.state.flush().await;
        Ok(())
    }
}
