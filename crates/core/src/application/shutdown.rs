//! Stop signal for the daemon's background loops
//!
//! Translation runs never listen to it; only the periodic loops do.

use tokio::sync::watch;

/// Signalling half, held by the daemon. Dropping it stops the loops as well.
pub struct ShutdownSender(watch::Sender<bool>);

impl ShutdownSender {
    /// Ask every loop to stop
    ///
    /// # Returns
    /// Number of loops still listening
    pub fn shutdown(&self) -> usize {
        self.0.send_replace(true);
        self.0.receiver_count()
    }
}

/// Listening half; clone one per loop
#[derive(Clone)]
pub struct ShutdownToken(watch::Receiver<bool>);

impl ShutdownToken {
    /// Resolves once a stop is requested or the sender is gone
    pub async fn wait(&mut self) {
        // Err means the sender was dropped
        let _ = self.0.wait_for(|stopped| *stopped).await;
    }
}

pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender(tx), ShutdownToken(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_after_shutdown() {
        let (sender, mut token) = shutdown_channel();
        let mut late = token.clone();

        assert_eq!(sender.shutdown(), 2);
        tokio::time::timeout(Duration::from_secs(1), token.wait())
            .await
            .unwrap();
        // A listener that arrives after the signal still sees it
        tokio::time::timeout(Duration::from_secs(1), late.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_shutdown() {
        let (sender, mut token) = shutdown_channel();
        drop(sender);

        tokio::time::timeout(Duration::from_secs(1), token.wait())
            .await
            .unwrap();
    }
}
