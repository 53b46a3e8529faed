//! # huddle-fanout
//!
//! Cross-process publish/subscribe fan-out for the Huddle session layer.
//!
//! A delivery emitted on one server process is replicated to every other
//! process so each can resolve it against its own locally connected
//! peers. Backends implement the [`FanOut`] trait:
//!
//! - **Redis** - pub/sub channel shared by all processes (default)
//! - **Memory** - in-process loopback for single-node runs and tests
//!
//! ```rust,ignore
//! use huddle_fanout::{FanOut, MemoryFanOut};
//!
//! let fanout = MemoryFanOut::new();
//! let mut inbound = fanout.subscribe().await?;
//! while let Some(envelope) = inbound.recv().await {
//!     // Resolve envelope.delivery against local peers
//! }
//! ```

pub mod memory;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryFanOut;
pub use traits::{FanOut, FanOutError};

#[cfg(feature = "redis")]
pub use redis::RedisFanOut;
