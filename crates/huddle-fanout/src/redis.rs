//! Redis pub/sub fan-out backend.
//!
//! Envelopes are published MessagePack-encoded on one namespaced channel.
//! Redis pub/sub preserves publish order per connection and delivers to
//! every subscribed process, which matches the fan-out contract:
//! at-least-once, ordered per originating process, no deduplication.

use crate::traits::{FanOut, FanOutError};
use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use futures_util::StreamExt;
use huddle_events::{codec, Envelope};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 1024;

/// Fan-out over a Redis pub/sub channel.
pub struct RedisFanOut {
    client: Client,
    manager: ConnectionManager,
    channel: String,
}

impl RedisFanOut {
    /// Connect to Redis and prepare the namespaced channel.
    ///
    /// # Errors
    ///
    /// Returns [`FanOutError::Connect`] if the server is unreachable.
    /// Callers treat this as fatal at startup.
    pub async fn connect(url: &str, namespace: &str) -> Result<Self, FanOutError> {
        let client = Client::open(url).map_err(|e| FanOutError::Connect(e.to_string()))?;
        let manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| FanOutError::Connect(e.to_string()))?;

        let channel = format!("huddle:{namespace}");
        info!(url = %url, channel = %channel, "Connected to Redis fan-out");

        Ok(Self {
            client,
            manager,
            channel,
        })
    }

    /// The pub/sub channel this fan-out publishes on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl FanOut for RedisFanOut {
    async fn publish(&self, envelope: Envelope) -> Result<(), FanOutError> {
        let payload = codec::encode(&envelope)?;

        let mut conn = self.manager.clone();
        let _receivers: i64 = conn
            .publish(&self.channel, payload.as_ref())
            .await
            .map_err(|e| FanOutError::Publish(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Envelope>, FanOutError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| FanOutError::Subscribe(e.to_string()))?;
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| FanOutError::Subscribe(e.to_string()))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(message) = stream.next().await {
                let payload: Vec<u8> = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Dropping unreadable fan-out payload");
                        continue;
                    }
                };

                match codec::decode(&payload) {
                    Ok(envelope) => {
                        if tx.send(envelope).await.is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Dropping undecodable fan-out payload");
                    }
                }
            }
            debug!("Redis fan-out subscription ended");
        });

        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
