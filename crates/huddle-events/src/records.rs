//! Presence and message records carried on the wire.
//!
//! These are the payload shapes shared between the session core, the
//! gateway, and remote processes. Field names are camelCase on the wire
//! because the client protocol predates this implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as epoch milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Unique identifier for one live connection.
///
/// Assigned by the gateway at handshake time; the unit of identity for
/// presence. A reconnecting client receives a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a connection ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh connection ID.
    #[must_use]
    pub fn generate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        Self(format!("conn_{:x}", timestamp))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// User availability status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Away,
    Busy,
    Offline,
}

/// Profile fields supplied by the join event. All optional; absent
/// `name`/`email` default to connection-id-derived strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// One online user. Exactly one record exists per live connection; the
/// record never survives its connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: ConnectionId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub status: Status,
    pub connected_at: u64,
    pub last_seen: u64,
}

impl User {
    /// Build a user record from a join profile, defaulting absent
    /// `name`/`email` to connection-id-derived strings.
    #[must_use]
    pub fn from_profile(id: ConnectionId, profile: UserProfile) -> Self {
        let now = now_millis();
        let name = profile
            .name
            .unwrap_or_else(|| format!("user-{}", id.as_str()));
        let email = Some(
            profile
                .email
                .unwrap_or_else(|| format!("{}@huddle.local", id.as_str())),
        );

        Self {
            id,
            name,
            email,
            avatar: profile.avatar,
            status: profile.status.unwrap_or_default(),
            connected_at: now,
            last_seen: now,
        }
    }

    /// Minimal identity for a connection that never joined: `{id, name: id}`.
    #[must_use]
    pub fn placeholder(id: &ConnectionId) -> Self {
        let now = now_millis();
        Self {
            id: id.clone(),
            name: id.as_str().to_string(),
            email: None,
            avatar: None,
            status: Status::Online,
            connected_at: now,
            last_seen: now,
        }
    }

    /// Update the last seen timestamp.
    pub fn touch(&mut self) {
        self.last_seen = now_millis();
    }
}

/// A routed chat message. Transient: constructed on the inbound event,
/// emitted once, never retained afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Derived from `{connection id}-{timestamp}`. Collisions within one
    /// clock tick are acceptable since messages are neither persisted nor
    /// deduplicated.
    pub id: String,
    /// Snapshot of the sender at send time.
    pub user: User,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub ts: u64,
    /// Connection ids that have acknowledged the message, seeded with the
    /// sender.
    pub read_by: Vec<ConnectionId>,
}

impl Message {
    /// Construct a message from a sender snapshot and payload fields.
    #[must_use]
    pub fn new(
        user: User,
        text: String,
        meta: Option<serde_json::Value>,
        reply_to: Option<String>,
        room: Option<String>,
    ) -> Self {
        let ts = now_millis();
        Self {
            id: format!("{}-{}", user.id, ts),
            read_by: vec![user.id.clone()],
            user,
            text,
            meta,
            reply_to,
            room,
            ts,
        }
    }
}

/// A peer-addressed message: exactly one recipient, no read tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessage {
    pub id: String,
    pub from: User,
    pub to: ConnectionId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    pub ts: u64,
}

impl PrivateMessage {
    /// Construct a private message from a sender snapshot.
    #[must_use]
    pub fn new(
        from: User,
        to: ConnectionId,
        text: String,
        meta: Option<serde_json::Value>,
    ) -> Self {
        let ts = now_millis();
        Self {
            id: format!("{}-{}", from.id, ts),
            from,
            to,
            text,
            meta,
            ts,
        }
    }
}

/// Room creation announcement. Not the authoritative membership store;
/// `members` is a snapshot at creation time and is not kept in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDescriptor {
    pub name: String,
    pub id: String,
    pub created_by: ConnectionId,
    pub is_private: bool,
    pub created_at: u64,
    pub members: Vec<ConnectionId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_generation() {
        let id1 = ConnectionId::generate();
        let id2 = ConnectionId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("conn_"));
    }

    #[test]
    fn test_user_from_profile_defaults() {
        let user = User::from_profile("conn-1".into(), UserProfile::default());

        assert_eq!(user.name, "user-conn-1");
        assert_eq!(user.email.as_deref(), Some("conn-1@huddle.local"));
        assert_eq!(user.status, Status::Online);
        assert_eq!(user.connected_at, user.last_seen);
    }

    #[test]
    fn test_user_from_profile_supplied_fields() {
        let profile = UserProfile {
            name: Some("Alice".into()),
            email: Some("alice@example.com".into()),
            avatar: Some("https://example.com/a.png".into()),
            status: Some(Status::Away),
        };
        let user = User::from_profile("conn-1".into(), profile);

        assert_eq!(user.name, "Alice");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.status, Status::Away);
    }

    #[test]
    fn test_placeholder_identity() {
        let user = User::placeholder(&"conn-9".into());
        assert_eq!(user.id.as_str(), "conn-9");
        assert_eq!(user.name, "conn-9");
        assert!(user.email.is_none());
    }

    #[test]
    fn test_message_id_and_read_by_seed() {
        let user = User::placeholder(&"conn-1".into());
        let msg = Message::new(user, "hi".into(), None, None, Some("lobby".into()));

        assert!(msg.id.starts_with("conn-1-"));
        assert_eq!(msg.read_by, vec![ConnectionId::from("conn-1")]);
        assert_eq!(msg.room.as_deref(), Some("lobby"));
    }

    #[test]
    fn test_user_wire_field_names() {
        let user = User::placeholder(&"conn-1".into());
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("connectedAt").is_some());
        assert!(json.get("lastSeen").is_some());
        assert!(json.get("email").is_none());
    }
}
