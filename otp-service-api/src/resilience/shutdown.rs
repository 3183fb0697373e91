//! Shutdown signalling and the bounded drain used by the server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info};

/// Fires on SIGINT, SIGTERM or a manual [`ShutdownSignal::trigger`].
///
/// Clones share state; triggering any clone releases every waiter.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Wait for an OS signal or a manual trigger, whichever comes first.
    pub async fn wait(&self) {
        tokio::select! {
            name = os_signal() => {
                info!(signal = name, "Received shutdown signal");
                self.tx.send_replace(true);
            }
            _ = self.triggered() => {}
        }
    }

    /// Resolves once the signal has been triggered by any clone.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Manually trigger shutdown
    pub fn trigger(&self) {
        info!("Manually triggering shutdown");
        self.tx.send_replace(true);
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

async fn os_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Shutdown errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ShutdownError {
    #[error("Shutdown timed out after {0:?}")]
    Timeout(Duration),
}

/// Wait for `drain` to finish, giving up after `deadline`.
pub async fn drain_with_deadline<F, T>(deadline: Duration, drain: F) -> Result<T, ShutdownError>
where
    F: Future<Output = T>,
{
    timeout(deadline, drain)
        .await
        .map_err(|_| ShutdownError::Timeout(deadline))
}
