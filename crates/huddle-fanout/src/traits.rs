//! Fan-out abstraction traits.
//!
//! The fan-out replicates locally emitted deliveries to every other
//! server process so each can deliver to its own locally connected
//! peers. The guarantee is at-least-once, order preserved per
//! originating process, no deduplication.

use async_trait::async_trait;
use huddle_events::{CodecError, Envelope};
use thiserror::Error;
use tokio::sync::mpsc;

/// Fan-out errors.
#[derive(Debug, Error)]
pub enum FanOutError {
    /// Failed to reach the backend at startup. Fatal: the process must
    /// not accept connections in a non-replicated state.
    #[error("Fan-out connect failed: {0}")]
    Connect(String),

    /// A publish was not accepted. Transient; the envelope is lost, not
    /// retried.
    #[error("Fan-out publish failed: {0}")]
    Publish(String),

    /// The subscription could not be established.
    #[error("Fan-out subscribe failed: {0}")]
    Subscribe(String),

    /// Envelope encoding/decoding error.
    #[error("Fan-out codec error: {0}")]
    Codec(#[from] CodecError),
}

/// A cross-process publish/subscribe backend.
///
/// Backends are responsible for the underlying fabric (Redis channel,
/// in-process loopback) and provide a uniform interface.
#[async_trait]
pub trait FanOut: Send + Sync {
    /// Publish an envelope to every subscribed process, including the
    /// publishing one on loopback backends. Best-effort.
    async fn publish(&self, envelope: Envelope) -> Result<(), FanOutError>;

    /// Open the inbound stream of envelopes published by any process.
    ///
    /// The origin filter is the caller's responsibility: a subscriber
    /// drops envelopes whose origin is its own process id.
    async fn subscribe(&self) -> Result<mpsc::Receiver<Envelope>, FanOutError>;

    /// Get the backend name (e.g., "redis", "memory").
    fn name(&self) -> &'static str;
}
