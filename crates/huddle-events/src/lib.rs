//! # huddle-events
//!
//! Wire-level definitions for the Huddle presence-and-messaging session
//! layer.
//!
//! This crate defines everything that crosses a process boundary:
//!
//! - **Records** - users, messages, room descriptors, connection ids
//! - **Events** - typed inbound (`ClientEvent`) and outbound (`ServerEvent`)
//!   events, JSON-framed on the client wire
//! - **Envelope** - addressing targets and the cross-process delivery
//!   record, MessagePack-framed on the fan-out
//!
//! ## Example
//!
//! ```rust
//! use huddle_events::{codec, Delivery, Envelope, ServerEvent, Target};
//!
//! let delivery = Delivery::new(
//!     Target::room("chat:lobby"),
//!     ServerEvent::RoomJoined { room: "chat:lobby".into() },
//! );
//! let envelope = Envelope::new("process-1", delivery);
//!
//! // Encode and decode
//! let encoded = codec::encode(&envelope).unwrap();
//! let decoded = codec::decode(&encoded).unwrap();
//! ```

pub mod codec;
pub mod envelope;
pub mod events;
pub mod records;

pub use codec::CodecError;
pub use envelope::{Delivery, Envelope, Target};
pub use events::{parse_frame, to_frame, ClientEvent, ServerEvent};
pub use records::{
    now_millis, ConnectionId, Message, PrivateMessage, RoomDescriptor, Status, User, UserProfile,
};
