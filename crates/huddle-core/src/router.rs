//! Pure message routing: payload in, addressed deliveries out.
//!
//! The router decides the delivery target and shapes the outbound payload
//! for every chat-plane event. It holds no connection state; room
//! membership stays transport-owned and is resolved downstream when a
//! [`Target::Room`] delivery is applied.
//!
//! Addressing rules:
//!
//! - Room-addressed events go to the room; a present, non-empty `room`
//!   always wins over global broadcast.
//! - Unaddressed events go to everyone except the sender.
//! - Room-addressed messages include the sender (its own copy doubles as
//!   the send confirmation); room-addressed typing excludes it.
//! - Room-addressed read receipts include the acknowledging sender,
//!   unaddressed ones exclude it. The asymmetry is intentional.
//! - Private messages go to exactly the addressed connection, plus an
//!   identical echo to the sender.

use huddle_events::{
    ConnectionId, Delivery, Message, PrivateMessage, ServerEvent, Target, User,
};

/// Feature switches evaluated once at startup.
///
/// A disabled feature routes its inbound events to an empty delivery set:
/// no broadcast, no acknowledgment, no error.
#[derive(Debug, Clone, Copy)]
pub struct RouterFeatures {
    pub typing_indicators: bool,
    pub read_receipts: bool,
}

impl Default for RouterFeatures {
    fn default() -> Self {
        Self {
            typing_indicators: true,
            read_receipts: true,
        }
    }
}

/// The message-routing engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRouter {
    features: RouterFeatures,
}

impl MessageRouter {
    /// Create a router with the given feature switches.
    #[must_use]
    pub fn new(features: RouterFeatures) -> Self {
        Self { features }
    }

    /// The feature switches this router was built with.
    #[must_use]
    pub fn features(&self) -> RouterFeatures {
        self.features
    }

    /// Route a chat message from a sender snapshot.
    pub fn route_message(
        &self,
        sender: &User,
        room: Option<String>,
        text: String,
        meta: Option<serde_json::Value>,
        reply_to: Option<String>,
    ) -> Vec<Delivery> {
        let room = room.filter(|r| !r.is_empty());
        let message = Message::new(sender.clone(), text, meta, reply_to, room.clone());

        let target = match room {
            Some(room) => Target::room(room),
            None => Target::broadcast_excluding(sender.id.clone()),
        };

        vec![Delivery::new(target, ServerEvent::Message(message))]
    }

    /// Route a private message: one delivery to the addressed connection
    /// and one echo back to the sender as its send confirmation.
    ///
    /// No existence check is performed on the recipient; delivery silently
    /// no-ops downstream if the id is not connected.
    pub fn route_private(
        &self,
        from: &User,
        to: ConnectionId,
        text: String,
        meta: Option<serde_json::Value>,
    ) -> Vec<Delivery> {
        let message = PrivateMessage::new(from.clone(), to.clone(), text, meta);

        vec![
            Delivery::new(
                Target::connection(to),
                ServerEvent::PrivateMessage(message.clone()),
            ),
            Delivery::new(
                Target::connection(from.id.clone()),
                ServerEvent::PrivateMessage(message),
            ),
        ]
    }

    /// Route a typing indicator. Empty when typing indicators are
    /// disabled.
    pub fn route_typing(
        &self,
        sender: &User,
        room: Option<String>,
        started: bool,
    ) -> Vec<Delivery> {
        if !self.features.typing_indicators {
            return Vec::new();
        }

        let room = room.filter(|r| !r.is_empty());
        let target = match &room {
            Some(r) => Target::room_excluding(r.clone(), sender.id.clone()),
            None => Target::broadcast_excluding(sender.id.clone()),
        };

        let event = if started {
            ServerEvent::TypingStart {
                id: sender.id.clone(),
                name: sender.name.clone(),
                room,
            }
        } else {
            ServerEvent::TypingStop {
                id: sender.id.clone(),
                name: sender.name.clone(),
                room,
            }
        };

        vec![Delivery::new(target, event)]
    }

    /// Route a read receipt. Empty when read receipts are disabled.
    pub fn route_read(
        &self,
        reader: &ConnectionId,
        message_id: String,
        room: Option<String>,
    ) -> Vec<Delivery> {
        if !self.features.read_receipts {
            return Vec::new();
        }

        let room = room.filter(|r| !r.is_empty());
        let target = match &room {
            // Room-addressed receipts reach the whole room, the
            // acknowledging sender included.
            Some(r) => Target::room(r.clone()),
            None => Target::broadcast_excluding(reader.clone()),
        };

        vec![Delivery::new(
            target,
            ServerEvent::MessageRead {
                message_id,
                user_id: reader.clone(),
                room,
            },
        )]
    }

    /// Route a status change broadcast to everyone but the subject.
    pub fn route_status(&self, user: &User) -> Vec<Delivery> {
        vec![Delivery::new(
            Target::broadcast_excluding(user.id.clone()),
            ServerEvent::UserStatusChanged {
                id: user.id.clone(),
                name: user.name.clone(),
                status: user.status,
            },
        )]
    }
}
