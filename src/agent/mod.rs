//! Agent side: polls runtime statistics and reports them to the server.

mod client;
mod collector;
mod runtime;

pub use client::{MetricsClient, QUEUE_CAPACITY};
pub use collector::{run_poll_loop, run_report_loop, Collector, RuntimeSource, POLL_COUNT};
pub use runtime::SystemSource;

use crate::config::AgentConfig;
use crate::shutdown::Shutdown;
use crate::signer::Signer;
use anyhow::Result;
use std::sync::Arc;

/// Runs the agent until `shutdown` fires.
///
/// Polling runs on its own task; reporting runs on the caller's task. After
/// shutdown the delivery workers are given the chance to finish what is
/// already queued.
pub async fn run_agent(config: AgentConfig, shutdown: Shutdown) -> Result<()> {
    // ---
    let signer = config.key.as_deref().and_then(Signer::new);
    let mut client = MetricsClient::new(&config.address, signer, config.rate_limit, shutdown.clone())?;
    let collector = Arc::new(Collector::new());

    tracing::info!(
        address = %config.address,
        poll = ?config.poll_interval,
        report = ?config.report_interval,
        workers = config.rate_limit,
        "Agent started"
    );

    let poller = tokio::spawn(run_poll_loop(
        collector.clone(),
        SystemSource::new(),
        config.poll_interval,
        shutdown.clone(),
    ));

    run_report_loop(collector, &client, config.report_interval, shutdown).await;

    if let Err(err) = poller.await {
        tracing::error!("Poll task failed: {err}");
    }
    client.close().await;

    tracing::info!("Agent stopped");
    Ok(())
}
