//! The gateway: local event delivery and fan-out replication.
//!
//! The gateway owns the per-connection outbound senders and the local
//! room index. Applying a delivery resolves its target against local
//! connections and hands an origin-stamped envelope to the fan-out
//! publisher; envelopes arriving from other processes are resolved the
//! same way after the origin filter.

use crate::metrics;
use dashmap::DashMap;
use huddle_core::{EventSink, LocalRoomIndex, RoomIndex};
use huddle_events::{ConnectionId, Delivery, Envelope, ServerEvent, Target};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Per-process delivery fabric.
pub struct Gateway {
    /// This process's origin id, stamped on every published envelope.
    origin: String,
    /// Outbound channel per locally connected peer.
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    /// Local room membership.
    rooms: Arc<LocalRoomIndex>,
    /// Handoff to the fan-out publisher task.
    fanout_tx: mpsc::UnboundedSender<Envelope>,
}

impl Gateway {
    /// Create a gateway for one process.
    #[must_use]
    pub fn new(
        origin: String,
        rooms: Arc<LocalRoomIndex>,
        fanout_tx: mpsc::UnboundedSender<Envelope>,
    ) -> Self {
        Self {
            origin,
            connections: DashMap::new(),
            rooms,
            fanout_tx,
        }
    }

    /// This process's origin id.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Register a connection's outbound sender.
    pub fn attach(&self, conn: &ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.connections.insert(conn.clone(), sender);
        debug!(connection = %conn, "Gateway: connection attached");
    }

    /// Drop a connection's route and its local room membership.
    pub fn detach(&self, conn: &ConnectionId) {
        self.connections.remove(conn);
        self.rooms.leave_all(conn);
        debug!(connection = %conn, "Gateway: connection detached");
    }

    /// Number of locally connected peers.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn send_local(&self, conn: &ConnectionId, event: &ServerEvent) {
        // A missing route is a silent no-op: best-effort delivery.
        if let Some(sender) = self.connections.get(conn) {
            let _ = sender.send(event.clone());
        }
    }

    /// Resolve a delivery against locally connected peers.
    pub fn deliver_local(&self, delivery: &Delivery) {
        match &delivery.target {
            Target::Connection { id } => self.send_local(id, &delivery.event),

            Target::Room { room, exclude } => {
                for member in self.rooms.members(room) {
                    if exclude.as_ref() == Some(&member) {
                        continue;
                    }
                    self.send_local(&member, &delivery.event);
                }
            }

            Target::Broadcast { exclude } => {
                for entry in self.connections.iter() {
                    if exclude.as_ref() == Some(entry.key()) {
                        continue;
                    }
                    let _ = entry.value().send(delivery.event.clone());
                }
            }
        }
        trace!(target = ?delivery.target, "Gateway: delivered locally");
    }

    /// Apply an envelope received from the fan-out, dropping our own.
    pub fn deliver_remote(&self, envelope: Envelope) {
        if envelope.origin == self.origin {
            return;
        }
        metrics::record_fanout("inbound");
        self.deliver_local(&envelope.delivery);
    }
}

impl EventSink for Gateway {
    fn deliver(&self, delivery: Delivery) {
        self.deliver_local(&delivery);

        let envelope = Envelope::new(self.origin.clone(), delivery);
        if self.fanout_tx.send(envelope).is_ok() {
            metrics::record_fanout("outbound");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> (Gateway, mpsc::UnboundedReceiver<Envelope>) {
        let (fanout_tx, fanout_rx) = mpsc::unbounded_channel();
        let gateway = Gateway::new(
            "proc-a".to_string(),
            Arc::new(LocalRoomIndex::new()),
            fanout_tx,
        );
        (gateway, fanout_rx)
    }

    fn attach(gateway: &Gateway, id: &str) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        gateway.attach(&id.into(), tx);
        rx
    }

    fn room_joined(room: &str) -> ServerEvent {
        ServerEvent::RoomJoined { room: room.into() }
    }

    #[test]
    fn test_broadcast_excludes_one_connection() {
        let (gateway, _fanout) = gateway();
        let mut a = attach(&gateway, "conn-a");
        let mut b = attach(&gateway, "conn-b");

        gateway.deliver_local(&Delivery::new(
            Target::broadcast_excluding("conn-a"),
            room_joined("lobby"),
        ));

        assert!(a.try_recv().is_err());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn test_room_delivery_only_reaches_members() {
        let (gateway, _fanout) = gateway();
        let mut a = attach(&gateway, "conn-a");
        let mut b = attach(&gateway, "conn-b");
        gateway.rooms.join(&"conn-a".into(), "lobby");

        gateway.deliver_local(&Delivery::new(Target::room("lobby"), room_joined("lobby")));

        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn test_connection_target_missing_route_is_silent() {
        let (gateway, _fanout) = gateway();
        let mut a = attach(&gateway, "conn-a");

        gateway.deliver_local(&Delivery::new(
            Target::connection("conn-missing"),
            room_joined("lobby"),
        ));

        assert!(a.try_recv().is_err());
    }

    #[test]
    fn test_deliver_publishes_envelope() {
        let (gateway, mut fanout) = gateway();
        let _a = attach(&gateway, "conn-a");

        gateway.deliver(Delivery::new(Target::broadcast(), room_joined("lobby")));

        let envelope = fanout.try_recv().unwrap();
        assert_eq!(envelope.origin, "proc-a");
    }

    #[test]
    fn test_remote_envelope_origin_filter() {
        let (gateway, _fanout) = gateway();
        let mut a = attach(&gateway, "conn-a");

        // Our own envelope is dropped.
        gateway.deliver_remote(Envelope::new(
            "proc-a",
            Delivery::new(Target::broadcast(), room_joined("lobby")),
        ));
        assert!(a.try_recv().is_err());

        // A remote one is applied.
        gateway.deliver_remote(Envelope::new(
            "proc-b",
            Delivery::new(Target::broadcast(), room_joined("lobby")),
        ));
        assert!(a.try_recv().is_ok());
    }

    #[test]
    fn test_detach_clears_room_membership() {
        let (gateway, _fanout) = gateway();
        let _a = attach(&gateway, "conn-a");
        gateway.rooms.join(&"conn-a".into(), "lobby");

        gateway.detach(&"conn-a".into());

        assert_eq!(gateway.connection_count(), 0);
        assert!(gateway.rooms.members("lobby").is_empty());
    }
}
