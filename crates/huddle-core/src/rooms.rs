//! Room membership queries and membership-change operations.
//!
//! Membership is transport-owned: the core queries a [`RoomIndex`] but
//! never keeps a second copy, except for the transient member snapshot
//! inside a creation announcement.

use crate::presence::PresenceRegistry;
use dashmap::{DashMap, DashSet};
use huddle_events::{
    now_millis, ConnectionId, Delivery, RoomDescriptor, ServerEvent, Target,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Queryable set-of-peers-per-room, owned by the transport layer.
///
/// Implementations degrade to empty results when not yet initialized;
/// none of these operations error.
pub trait RoomIndex: Send + Sync {
    /// Add a connection to a room.
    fn join(&self, conn: &ConnectionId, room: &str);

    /// Remove a connection from a room.
    fn leave(&self, conn: &ConnectionId, room: &str);

    /// Remove a connection from every room it is in. Returns the rooms
    /// it was removed from.
    fn leave_all(&self, conn: &ConnectionId) -> Vec<String>;

    /// Connections currently joined to a room.
    fn members(&self, room: &str) -> Vec<ConnectionId>;

    /// Names of all rooms with at least one member.
    fn rooms(&self) -> Vec<String>;

    /// Rooms a connection is currently joined to.
    fn rooms_of(&self, conn: &ConnectionId) -> Vec<String>;
}

/// In-process room index over concurrent sets. Empty rooms are removed
/// on last leave.
#[derive(Debug, Default)]
pub struct LocalRoomIndex {
    rooms: DashMap<String, DashSet<ConnectionId>>,
}

impl LocalRoomIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomIndex for LocalRoomIndex {
    fn join(&self, conn: &ConnectionId, room: &str) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn.clone());
        debug!(connection = %conn, room = %room, "Room: joined");
    }

    fn leave(&self, conn: &ConnectionId, room: &str) {
        if let Some(members) = self.rooms.get(room) {
            members.remove(conn);
            let empty = members.is_empty();
            drop(members);
            if empty {
                self.rooms.remove(room);
                debug!(room = %room, "Room: removed empty room");
            }
        }
        debug!(connection = %conn, room = %room, "Room: left");
    }

    fn leave_all(&self, conn: &ConnectionId) -> Vec<String> {
        let joined = self.rooms_of(conn);
        for room in &joined {
            self.leave(conn, room);
        }
        joined
    }

    fn members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().map(|m| m.clone()).collect())
            .unwrap_or_default()
    }

    fn rooms(&self) -> Vec<String> {
        self.rooms.iter().map(|e| e.key().clone()).collect()
    }

    fn rooms_of(&self, conn: &ConnectionId) -> Vec<String> {
        self.rooms
            .iter()
            .filter(|e| e.value().contains(conn))
            .map(|e| e.key().clone())
            .collect()
    }
}

/// Builds the deliveries for room membership changes and announcements.
pub struct RoomOps {
    index: Arc<dyn RoomIndex>,
    registry: Arc<PresenceRegistry>,
}

impl RoomOps {
    /// Assemble room operations over an index and the presence registry.
    pub fn new(index: Arc<dyn RoomIndex>, registry: Arc<PresenceRegistry>) -> Self {
        Self { index, registry }
    }

    /// Join a connection to a room: confirm to the joiner, notify the
    /// other members.
    pub fn join(&self, conn: &ConnectionId, room: &str) -> Vec<Delivery> {
        self.index.join(conn, room);
        let user = self.registry.snapshot_or_placeholder(conn);

        vec![
            Delivery::new(
                Target::connection(conn.clone()),
                ServerEvent::RoomJoined { room: room.into() },
            ),
            Delivery::new(
                Target::room_excluding(room, conn.clone()),
                ServerEvent::UserJoinedRoom {
                    room: room.into(),
                    id: conn.clone(),
                    name: user.name,
                },
            ),
        ]
    }

    /// Remove a connection from a room: confirm to the leaver, notify the
    /// remaining members.
    pub fn leave(&self, conn: &ConnectionId, room: &str) -> Vec<Delivery> {
        self.index.leave(conn, room);
        let user = self.registry.snapshot_or_placeholder(conn);

        vec![
            Delivery::new(
                Target::connection(conn.clone()),
                ServerEvent::RoomLeft { room: room.into() },
            ),
            Delivery::new(
                Target::room_excluding(room, conn.clone()),
                ServerEvent::UserLeftRoom {
                    room: room.into(),
                    id: conn.clone(),
                    name: user.name,
                },
            ),
        ]
    }

    /// Create a room: join the creator, snapshot the membership into a
    /// descriptor, and announce it process-wide.
    ///
    /// The announcement reaches connections that are not members, so they
    /// can discover and join.
    pub fn create(&self, conn: &ConnectionId, name: &str, is_private: bool) -> Vec<Delivery> {
        self.index.join(conn, name);

        let descriptor = RoomDescriptor {
            name: name.to_string(),
            id: Uuid::new_v4().to_string(),
            created_by: conn.clone(),
            is_private,
            created_at: now_millis(),
            members: self.index.members(name),
        };

        vec![Delivery::new(
            Target::broadcast(),
            ServerEvent::RoomCreated(descriptor),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_events::UserProfile;

    fn ops() -> (Arc<LocalRoomIndex>, Arc<PresenceRegistry>, RoomOps) {
        let index = Arc::new(LocalRoomIndex::new());
        let registry = Arc::new(PresenceRegistry::new());
        let ops = RoomOps::new(index.clone(), registry.clone());
        (index, registry, ops)
    }

    #[test]
    fn test_local_index_join_leave() {
        let index = LocalRoomIndex::new();
        index.join(&"conn-1".into(), "lobby");
        index.join(&"conn-2".into(), "lobby");

        assert_eq!(index.members("lobby").len(), 2);
        assert_eq!(index.rooms(), vec!["lobby".to_string()]);

        index.leave(&"conn-1".into(), "lobby");
        assert_eq!(index.members("lobby").len(), 1);

        // Last leave removes the room entirely.
        index.leave(&"conn-2".into(), "lobby");
        assert!(index.rooms().is_empty());
    }

    #[test]
    fn test_local_index_degrades_to_empty() {
        let index = LocalRoomIndex::new();
        assert!(index.members("nowhere").is_empty());
        assert!(index.rooms_of(&"conn-1".into()).is_empty());
    }

    #[test]
    fn test_leave_all() {
        let index = LocalRoomIndex::new();
        index.join(&"conn-1".into(), "lobby");
        index.join(&"conn-1".into(), "design");
        index.join(&"conn-2".into(), "lobby");

        let mut left = index.leave_all(&"conn-1".into());
        left.sort();
        assert_eq!(left, vec!["design".to_string(), "lobby".to_string()]);
        assert_eq!(index.members("lobby").len(), 1);
    }

    #[test]
    fn test_join_confirms_and_notifies() {
        let (_index, registry, ops) = ops();
        registry.register(
            &"conn-1".into(),
            UserProfile {
                name: Some("Alice".into()),
                ..Default::default()
            },
        );

        let deliveries = ops.join(&"conn-1".into(), "lobby");
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].target, Target::connection("conn-1"));
        assert_eq!(
            deliveries[1].target,
            Target::room_excluding("lobby", "conn-1")
        );
        match &deliveries[1].event {
            ServerEvent::UserJoinedRoom { name, .. } => assert_eq!(name, "Alice"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_create_announces_process_wide() {
        let (index, _registry, ops) = ops();
        let deliveries = ops.create(&"conn-1".into(), "design", true);

        assert_eq!(deliveries.len(), 1);
        // Creation announcements are not room-scoped.
        assert_eq!(deliveries[0].target, Target::broadcast());
        match &deliveries[0].event {
            ServerEvent::RoomCreated(descriptor) => {
                assert_eq!(descriptor.name, "design");
                assert!(descriptor.is_private);
                assert_eq!(descriptor.created_by.as_str(), "conn-1");
                // The creator was joined before the snapshot was taken.
                assert_eq!(descriptor.members, vec![ConnectionId::from("conn-1")]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(index.members("design").len(), 1);
    }
}
