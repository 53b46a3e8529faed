//! Typed inbound and outbound events.
//!
//! Events travel as JSON text frames, one event per frame, tagged by the
//! wire event name under `"type"`. [`ClientEvent`] is what a connection
//! sends; [`ServerEvent`] is what the session layer emits.

use crate::records::{ConnectionId, Message, PrivateMessage, RoomDescriptor, Status, User, UserProfile};
use serde::{Deserialize, Serialize};

/// An event received from a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Authenticate-and-join: the transition out of the unauthenticated
    /// state. Arbitrary user-supplied profile fields.
    #[serde(rename = "user:join")]
    UserJoin {
        #[serde(flatten)]
        profile: UserProfile,
    },

    /// Join a named room.
    #[serde(rename = "join")]
    JoinRoom { room: String },

    /// Leave a named room.
    #[serde(rename = "leave")]
    LeaveRoom { room: String },

    /// A chat message, room-addressed when `room` is present.
    ///
    /// `text` is not validated; an absent field passes through as empty.
    #[serde(rename = "message", rename_all = "camelCase")]
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_to: Option<String>,
    },

    /// Composition started.
    #[serde(rename = "typing:start")]
    TypingStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },

    /// Composition stopped.
    #[serde(rename = "typing:stop")]
    TypingStop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },

    /// Acknowledge a message as read.
    #[serde(rename = "message:read", rename_all = "camelCase")]
    MessageRead {
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },

    /// Change availability status.
    #[serde(rename = "user:status")]
    UserStatus { status: Status },

    /// Peer-addressed message.
    #[serde(rename = "message:private", rename_all = "camelCase")]
    PrivateMessage {
        to_user_id: ConnectionId,
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<serde_json::Value>,
    },

    /// Create and announce a room.
    #[serde(rename = "room:create", rename_all = "camelCase")]
    RoomCreate {
        room_name: String,
        #[serde(default)]
        is_private: bool,
    },
}

/// An event emitted by the session layer to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A user completed the join transition. Sent to everyone except the
    /// joiner.
    #[serde(rename = "user:joined")]
    UserJoined { user: User },

    /// Full snapshot of active users, sent to a joiner in reply to
    /// `user:join`. Always contains the joiner's own record.
    #[serde(rename = "users:list")]
    UsersList { users: Vec<User> },

    /// A routed chat message.
    #[serde(rename = "message")]
    Message(Message),

    /// A user's connection terminated.
    #[serde(rename = "user:left")]
    UserLeft {
        id: ConnectionId,
        name: String,
        reason: String,
    },

    #[serde(rename = "typing:start")]
    TypingStart {
        id: ConnectionId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },

    #[serde(rename = "typing:stop")]
    TypingStop {
        id: ConnectionId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },

    #[serde(rename = "message:read", rename_all = "camelCase")]
    MessageRead {
        message_id: String,
        user_id: ConnectionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },

    #[serde(rename = "user:status_changed")]
    UserStatusChanged {
        id: ConnectionId,
        name: String,
        status: Status,
    },

    /// Peer-addressed delivery; the sender receives the identical payload
    /// as its send confirmation.
    #[serde(rename = "message:private")]
    PrivateMessage(PrivateMessage),

    /// Room announcement, delivered process-wide so non-members can
    /// discover and join.
    #[serde(rename = "room:created")]
    RoomCreated(RoomDescriptor),

    /// Join confirmation to the joining connection.
    #[serde(rename = "room:joined")]
    RoomJoined { room: String },

    /// Leave confirmation to the leaving connection.
    #[serde(rename = "room:left")]
    RoomLeft { room: String },

    /// Membership notification to the other members of a room.
    #[serde(rename = "user:joined_room")]
    UserJoinedRoom {
        room: String,
        id: ConnectionId,
        name: String,
    },

    #[serde(rename = "user:left_room")]
    UserLeftRoom {
        room: String,
        id: ConnectionId,
        name: String,
    },

    /// An application-defined event sent through the utility facade.
    /// On the client wire the `event` name becomes the frame's `"type"`.
    #[serde(rename = "custom")]
    Custom {
        event: String,
        data: serde_json::Value,
    },
}

/// Encode a server event as a JSON text frame.
///
/// Facade-originated [`ServerEvent::Custom`] events are flattened so the
/// application-defined event name is the frame's `"type"`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_frame(event: &ServerEvent) -> serde_json::Result<String> {
    match event {
        ServerEvent::Custom { event, data } => {
            let mut obj = serde_json::Map::new();
            obj.insert("type".into(), serde_json::Value::String(event.clone()));
            obj.insert("data".into(), data.clone());
            serde_json::to_string(&serde_json::Value::Object(obj))
        }
        other => serde_json::to_string(other),
    }
}

/// Parse a JSON text frame into a client event.
///
/// # Errors
///
/// Returns an error if the frame is not a known event.
pub fn parse_frame(text: &str) -> serde_json::Result<ClientEvent> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_tags() {
        let event = parse_frame(r#"{"type":"user:join","name":"Alice"}"#).unwrap();
        match event {
            ClientEvent::UserJoin { profile } => {
                assert_eq!(profile.name.as_deref(), Some("Alice"));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let event = parse_frame(r#"{"type":"join","room":"lobby"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room: "lobby".into()
            }
        );
    }

    #[test]
    fn test_message_text_defaults_when_absent() {
        let event = parse_frame(r#"{"type":"message","room":"lobby"}"#).unwrap();
        match event {
            ClientEvent::Message { text, room, .. } => {
                assert_eq!(text, "");
                assert_eq!(room.as_deref(), Some("lobby"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_private_message_wire_fields() {
        let event =
            parse_frame(r#"{"type":"message:private","toUserId":"conn-2","text":"secret"}"#)
                .unwrap();
        match event {
            ClientEvent::PrivateMessage { to_user_id, text, .. } => {
                assert_eq!(to_user_id.as_str(), "conn-2");
                assert_eq!(text, "secret");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_room_create_wire_fields() {
        let event = parse_frame(r#"{"type":"room:create","roomName":"design"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::RoomCreate {
                room_name: "design".into(),
                is_private: false,
            }
        );
    }

    #[test]
    fn test_server_message_event_flattens_record() {
        let user = User::placeholder(&"conn-1".into());
        let msg = Message::new(user, "hi".into(), None, None, Some("lobby".into()));
        let frame = to_frame(&ServerEvent::Message(msg)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "message");
        assert_eq!(value["text"], "hi");
        assert_eq!(value["room"], "lobby");
    }

    #[test]
    fn test_custom_event_uses_event_name_as_type() {
        let event = ServerEvent::Custom {
            event: "announcement".into(),
            data: json!({"text": "maintenance at noon"}),
        };
        let frame = to_frame(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "announcement");
        assert_eq!(value["data"]["text"], "maintenance at noon");
    }

    #[test]
    fn test_read_receipt_roundtrip() {
        let event = ServerEvent::MessageRead {
            message_id: "conn-1-42".into(),
            user_id: "conn-2".into(),
            room: Some("lobby".into()),
        };
        let frame = to_frame(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "message:read");
        assert_eq!(value["messageId"], "conn-1-42");
        assert_eq!(value["userId"], "conn-2");
    }
}
