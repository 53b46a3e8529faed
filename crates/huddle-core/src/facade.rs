//! Read queries and fire-and-forget sends for embedding layers.
//!
//! The facade is what a REST surface or embedding application calls; it
//! is safe to use concurrently with event processing since every
//! underlying structure is one of the concurrent ones.

use crate::presence::PresenceRegistry;
use crate::rooms::RoomIndex;
use huddle_events::{ConnectionId, Delivery, ServerEvent, Target, User};
use std::sync::Arc;

/// Capability to hand a delivery to the transport and fan-out.
///
/// Implementations must be non-blocking; a send reports no delivery
/// confirmation.
pub trait EventSink: Send + Sync {
    /// Deliver to the local peers a target resolves to, and replicate to
    /// other processes.
    fn deliver(&self, delivery: Delivery);

    /// Deliver one event to one connection.
    fn send_to(&self, conn: &ConnectionId, event: ServerEvent) {
        self.deliver(Delivery::new(Target::connection(conn.clone()), event));
    }
}

/// Read-only and imperative operations exposed to external callers.
pub struct Facade {
    registry: Arc<PresenceRegistry>,
    index: Arc<dyn RoomIndex>,
    sink: Arc<dyn EventSink>,
}

impl Facade {
    /// Assemble a facade over the shared registry, room index, and sink.
    pub fn new(
        registry: Arc<PresenceRegistry>,
        index: Arc<dyn RoomIndex>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            index,
            sink,
        }
    }

    /// Snapshot of all active users.
    #[must_use]
    pub fn active_users(&self) -> Vec<User> {
        self.registry.list()
    }

    /// Look up one user by connection id.
    #[must_use]
    pub fn find_user(&self, conn: &ConnectionId) -> Option<User> {
        self.registry.get(conn)
    }

    /// Names of all rooms with members. Empty if the index is not yet
    /// initialized.
    #[must_use]
    pub fn room_names(&self) -> Vec<String> {
        self.index.rooms()
    }

    /// Members of a room. Empty for unknown rooms.
    #[must_use]
    pub fn room_members(&self, room: &str) -> Vec<ConnectionId> {
        self.index.members(room)
    }

    /// Send an application-defined event to every member of a room.
    /// Fire-and-forget.
    pub fn send_to_room(&self, room: &str, event: &str, data: serde_json::Value) {
        self.sink.deliver(Delivery::new(
            Target::room(room),
            ServerEvent::Custom {
                event: event.to_string(),
                data,
            },
        ));
    }

    /// Send an application-defined event to one connection.
    /// Fire-and-forget; silently no-ops if the id has no route.
    pub fn send_to_user(&self, conn: &ConnectionId, event: &str, data: serde_json::Value) {
        self.sink.send_to(
            conn,
            ServerEvent::Custom {
                event: event.to_string(),
                data,
            },
        );
    }

    /// Send an application-defined event to every connection.
    /// Fire-and-forget.
    pub fn broadcast_all(&self, event: &str, data: serde_json::Value) {
        self.sink.deliver(Delivery::new(
            Target::broadcast(),
            ServerEvent::Custom {
                event: event.to_string(),
                data,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::LocalRoomIndex;
    use huddle_events::UserProfile;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        deliveries: Mutex<Vec<Delivery>>,
    }

    impl EventSink for RecordingSink {
        fn deliver(&self, delivery: Delivery) {
            self.deliveries.lock().unwrap().push(delivery);
        }
    }

    fn facade() -> (Arc<PresenceRegistry>, Arc<LocalRoomIndex>, Arc<RecordingSink>, Facade) {
        let registry = Arc::new(PresenceRegistry::new());
        let index = Arc::new(LocalRoomIndex::new());
        let sink = Arc::new(RecordingSink::default());
        let facade = Facade::new(registry.clone(), index.clone(), sink.clone());
        (registry, index, sink, facade)
    }

    #[test]
    fn test_read_queries() {
        let (registry, index, _sink, facade) = facade();
        registry.register(&"conn-1".into(), UserProfile::default());
        index.join(&"conn-1".into(), "lobby");

        assert_eq!(facade.active_users().len(), 1);
        assert!(facade.find_user(&"conn-1".into()).is_some());
        assert!(facade.find_user(&"conn-2".into()).is_none());
        assert_eq!(facade.room_names(), vec!["lobby".to_string()]);
        assert_eq!(facade.room_members("lobby").len(), 1);
    }

    #[test]
    fn test_read_queries_degrade_to_empty() {
        let (_registry, _index, _sink, facade) = facade();
        assert!(facade.active_users().is_empty());
        assert!(facade.room_names().is_empty());
        assert!(facade.room_members("nowhere").is_empty());
    }

    #[test]
    fn test_imperative_sends() {
        let (_registry, _index, sink, facade) = facade();

        facade.send_to_room("lobby", "announcement", json!({"text": "hi"}));
        facade.send_to_user(&"conn-1".into(), "nudge", json!({}));
        facade.broadcast_all("maintenance", json!({"at": "noon"}));

        let deliveries = sink.deliveries.lock().unwrap();
        assert_eq!(deliveries.len(), 3);
        assert_eq!(deliveries[0].target, Target::room("lobby"));
        assert_eq!(deliveries[1].target, Target::connection("conn-1"));
        assert_eq!(deliveries[2].target, Target::broadcast());
        match &deliveries[0].event {
            ServerEvent::Custom { event, .. } => assert_eq!(event, "announcement"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
