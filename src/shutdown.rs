//! Process-wide shutdown signal shared by loops, workers, and the server.

use tokio::sync::watch;

/// Fires the shutdown signal. Dropping it also counts as shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger {
    // ---
    tx: watch::Sender<bool>,
}

/// Cloneable observer of the shutdown signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    // ---
    rx: watch::Receiver<bool>,
}

/// Creates a connected trigger/observer pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    // ---
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    // ---
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    // ---
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once shutdown has been requested.
    pub async fn wait(&self) {
        // ---
        let mut rx = self.rx.clone();
        // Err means the trigger was dropped, which also ends the wait.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

/// Waits for Ctrl-C or, on unix, SIGTERM.
pub async fn os_signal() {
    // ---
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
