use anyhow::Result;
use metrics_relay::{agent::run_agent, shutdown, AgentConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting metrics agent v{}...", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::from_env()?;

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        shutdown::os_signal().await;
        trigger.trigger();
    });

    run_agent(config, shutdown).await
}
