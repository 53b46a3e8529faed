//! Addressing targets and the cross-process envelope.
//!
//! A [`Delivery`] is a routing decision: which peer set receives which
//! event. An [`Envelope`] is a delivery stamped with its originating
//! process, replicated through the fan-out so every process can resolve
//! the target against its own locally connected peers.

use crate::events::ServerEvent;
use crate::records::ConnectionId;
use serde::{Deserialize, Serialize};

/// The peer set an event is addressed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// Exactly one peer. Delivery silently no-ops if the id has no route.
    Connection { id: ConnectionId },

    /// Every connection currently joined to the room, minus `exclude`.
    Room {
        room: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exclude: Option<ConnectionId>,
    },

    /// Every connection, minus `exclude`.
    Broadcast {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exclude: Option<ConnectionId>,
    },
}

impl Target {
    /// Address one connection.
    #[must_use]
    pub fn connection(id: impl Into<ConnectionId>) -> Self {
        Target::Connection { id: id.into() }
    }

    /// Address a whole room.
    #[must_use]
    pub fn room(room: impl Into<String>) -> Self {
        Target::Room {
            room: room.into(),
            exclude: None,
        }
    }

    /// Address a room, excluding one connection.
    #[must_use]
    pub fn room_excluding(room: impl Into<String>, exclude: impl Into<ConnectionId>) -> Self {
        Target::Room {
            room: room.into(),
            exclude: Some(exclude.into()),
        }
    }

    /// Address every connection.
    #[must_use]
    pub fn broadcast() -> Self {
        Target::Broadcast { exclude: None }
    }

    /// Address every connection except one.
    #[must_use]
    pub fn broadcast_excluding(exclude: impl Into<ConnectionId>) -> Self {
        Target::Broadcast {
            exclude: Some(exclude.into()),
        }
    }
}

/// One outbound event paired with its addressing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub target: Target,
    pub event: ServerEvent,
}

impl Delivery {
    /// Pair an event with a target.
    #[must_use]
    pub fn new(target: Target, event: ServerEvent) -> Self {
        Self { target, event }
    }
}

/// A delivery stamped with its originating process id.
///
/// Subscribers drop envelopes whose `origin` matches their own process,
/// since the originating process already delivered locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: String,
    pub delivery: Delivery,
}

impl Envelope {
    /// Stamp a delivery with its origin process id.
    #[must_use]
    pub fn new(origin: impl Into<String>, delivery: Delivery) -> Self {
        Self {
            origin: origin.into(),
            delivery,
        }
    }
}
