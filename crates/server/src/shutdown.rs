use tokio_util::sync::CancellationToken;

/// Coordinates graceful shutdown of the server's long-lived tasks.
///
/// Owns the root `CancellationToken`. Every spawned task (projection, HTTP
/// server) holds a clone from `token()` and stops once the root cancels,
/// whether that came from an OS signal or from `trigger()`.
pub struct Shutdown {
    root: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
        }
    }

    /// Spawn the task that cancels the root token on SIGINT or SIGTERM.
    pub fn listen_for_signals(&self) {
        let root = self.root.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            tracing::info!("shutdown signal received");
            root.cancel();
        });
    }

    /// A token that cancels when shutdown begins.
    pub fn token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Begin shutdown without waiting for a signal.
    pub fn trigger(&self) {
        self.root.cancel();
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on the first of SIGINT or SIGTERM.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "SIGTERM handler unavailable, watching Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokens_start_live() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.token().is_cancelled());
    }

    #[tokio::test]
    async fn trigger_cancels_every_token() {
        let shutdown = Shutdown::new();
        let a = shutdown.token();
        let b = shutdown.token();

        shutdown.trigger();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        // Cancellation is sticky for tokens handed out afterwards too.
        assert!(shutdown.token().is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_token_resolves_immediately() {
        let shutdown = Shutdown::new();
        let token = shutdown.token();
        shutdown.trigger();
        token.cancelled().await;
    }
}
