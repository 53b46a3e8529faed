//! In-process loopback fan-out.
//!
//! Single-node deployments and tests use this backend; every subscriber
//! in the process sees every published envelope, including the
//! publisher's own (dropped by the caller's origin filter).

use crate::traits::{FanOut, FanOutError};
use async_trait::async_trait;
use huddle_events::Envelope;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

const CHANNEL_CAPACITY: usize = 1024;

/// Loopback fan-out over a broadcast channel.
///
/// Cloning shares the underlying channel, so two gateways holding clones
/// of one `MemoryFanOut` behave like two processes on a shared fabric.
#[derive(Debug, Clone)]
pub struct MemoryFanOut {
    sender: broadcast::Sender<Envelope>,
}

impl MemoryFanOut {
    /// Create a new loopback fan-out.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl Default for MemoryFanOut {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FanOut for MemoryFanOut {
    async fn publish(&self, envelope: Envelope) -> Result<(), FanOutError> {
        // No subscribers yet is not an error; the envelope is simply lost.
        let _ = self.sender.send(envelope);
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Envelope>, FanOutError> {
        let mut source = self.sender.subscribe();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(envelope) => {
                        if tx.send(envelope).await.is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Memory fan-out subscriber lagged");
                        continue;
                    }
                }
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
