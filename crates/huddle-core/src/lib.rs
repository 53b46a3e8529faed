//! # huddle-core
//!
//! Presence, session lifecycle, and message routing for the Huddle
//! realtime session layer.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **PresenceRegistry** - authoritative mapping of connection to user
//! - **TypingTracker** - ephemeral per-(connection, room) markers
//! - **MessageRouter** - pure routing: payload in, addressed deliveries out
//! - **SessionController** - the connection lifecycle state machine
//! - **RoomOps** / **RoomIndex** - membership queries and change operations
//! - **Facade** - read queries and fire-and-forget sends for embedders
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────────────┐     ┌─────────────┐
//! │  Connection │────▶│ SessionController  │────▶│   Router    │
//! └─────────────┘     └────────────────────┘     └─────────────┘
//!                        │              │               │
//!                        ▼              ▼               ▼
//!                 ┌──────────┐   ┌─────────────┐  ┌───────────┐
//!                 │ Presence │   │TypingTracker│  │ EventSink │
//!                 └──────────┘   └─────────────┘  └───────────┘
//! ```
//!
//! The transport (socket abstraction) and cross-process fan-out stay
//! outside this crate: the core only requires the [`EventSink`] and
//! [`RoomIndex`] capabilities and the [`SessionHooks`] strategy.

pub mod facade;
pub mod hooks;
pub mod presence;
pub mod rooms;
pub mod router;
pub mod session;
pub mod typing;

pub use facade::{EventSink, Facade};
pub use hooks::{AuthDecision, ConnectionContext, NoopHooks, SessionHooks};
pub use presence::PresenceRegistry;
pub use rooms::{LocalRoomIndex, RoomIndex, RoomOps};
pub use router::{MessageRouter, RouterFeatures};
pub use session::{SessionController, SessionState};
pub use typing::{TypingKey, TypingState, TypingTracker};
