use anyhow::Result;
use metrics_relay::{shutdown, Server, ServerConfig};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting metrics server v{}...", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env()?;
    let server = Server::from_config(&config).await?;
    let listener = TcpListener::bind(&config.address).await?;

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        shutdown::os_signal().await;
        trigger.trigger();
    });

    server.serve(listener, shutdown).await
}
