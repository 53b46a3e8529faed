//! The presence registry: the single source of truth for who is online.
//!
//! One [`User`] record exists per live connection. The record is created
//! by the join transition, mutated only by that connection's own events,
//! and destroyed on disconnect.

use dashmap::DashMap;
use huddle_events::{ConnectionId, Status, User, UserProfile};
use tracing::debug;

/// Authoritative mapping of connection id to user record.
///
/// Backed by a sharded concurrent map so snapshot reads and per-connection
/// writes never tear; all operations are short and non-blocking. Shared by
/// `Arc` and passed explicitly to every component that needs it.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    users: DashMap<ConnectionId, User>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user record for a connection.
    ///
    /// Idempotent by connection id: re-registering overwrites the profile
    /// fields but preserves the original `connected_at`. Never fails;
    /// absent profile fields default to connection-id-derived values.
    pub fn register(&self, conn: &ConnectionId, profile: UserProfile) -> User {
        let mut user = User::from_profile(conn.clone(), profile);

        let prior_connected_at = self.users.get(conn).map(|u| u.connected_at);
        if let Some(connected_at) = prior_connected_at {
            user.connected_at = connected_at;
        }

        self.users.insert(conn.clone(), user.clone());
        debug!(connection = %conn, name = %user.name, "Presence: registered");
        user
    }

    /// Remove and return the record for a connection, if one exists.
    ///
    /// The caller uses the return value to decide whether a departure
    /// broadcast is due.
    pub fn unregister(&self, conn: &ConnectionId) -> Option<User> {
        let removed = self.users.remove(conn).map(|(_, user)| user);
        if removed.is_some() {
            debug!(connection = %conn, "Presence: unregistered");
        }
        removed
    }

    /// Update `last_seen` to the current time. No-op if no record exists.
    pub fn touch(&self, conn: &ConnectionId) {
        if let Some(mut user) = self.users.get_mut(conn) {
            user.touch();
        }
    }

    /// Get a snapshot of one user record.
    #[must_use]
    pub fn get(&self, conn: &ConnectionId) -> Option<User> {
        self.users.get(conn).map(|u| u.clone())
    }

    /// Get a snapshot of one user record, or the minimal placeholder
    /// identity if the connection never joined.
    #[must_use]
    pub fn snapshot_or_placeholder(&self, conn: &ConnectionId) -> User {
        self.get(conn).unwrap_or_else(|| User::placeholder(conn))
    }

    /// Snapshot of all active users. Insertion order is irrelevant.
    #[must_use]
    pub fn list(&self) -> Vec<User> {
        self.users.iter().map(|u| u.clone()).collect()
    }

    /// Update a user's status and `last_seen`, returning the updated
    /// snapshot. Returns `None` (no-op) if the connection has no record.
    pub fn set_status(&self, conn: &ConnectionId, status: Status) -> Option<User> {
        let mut user = self.users.get_mut(conn)?;
        user.status = status;
        user.touch();
        Some(user.clone())
    }

    /// Number of active users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check if no users are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check if a connection has a registered record.
    #[must_use]
    pub fn contains(&self, conn: &ConnectionId) -> bool {
        self.users.contains_key(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_applies_defaults() {
        let registry = PresenceRegistry::new();
        let user = registry.register(&"conn-1".into(), UserProfile::default());

        assert_eq!(user.name, "user-conn-1");
        assert_eq!(user.email.as_deref(), Some("conn-1@huddle.local"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_is_idempotent_by_connection() {
        let registry = PresenceRegistry::new();
        let first = registry.register(&"conn-1".into(), UserProfile::default());
        let second = registry.register(
            &"conn-1".into(),
            UserProfile {
                name: Some("Alice".into()),
                ..Default::default()
            },
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(second.name, "Alice");
        // Re-registering the same connection keeps the original connect time.
        assert_eq!(second.connected_at, first.connected_at);
    }

    #[test]
    fn test_unregister_returns_prior_record() {
        let registry = PresenceRegistry::new();
        registry.register(&"conn-1".into(), UserProfile::default());

        let removed = registry.unregister(&"conn-1".into());
        assert!(removed.is_some());
        assert!(registry.is_empty());

        // Second removal signals absence.
        assert!(registry.unregister(&"conn-1".into()).is_none());
    }

    #[test]
    fn test_touch_missing_record_is_noop() {
        let registry = PresenceRegistry::new();
        registry.touch(&"conn-1".into());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_status_updates_last_seen() {
        let registry = PresenceRegistry::new();
        let user = registry.register(&"conn-1".into(), UserProfile::default());

        let updated = registry.set_status(&"conn-1".into(), Status::Busy).unwrap();
        assert_eq!(updated.status, Status::Busy);
        assert!(updated.last_seen >= user.last_seen);

        assert!(registry.set_status(&"conn-2".into(), Status::Busy).is_none());
    }

    #[test]
    fn test_snapshot_or_placeholder() {
        let registry = PresenceRegistry::new();
        let placeholder = registry.snapshot_or_placeholder(&"conn-9".into());
        assert_eq!(placeholder.name, "conn-9");

        registry.register(&"conn-1".into(), UserProfile::default());
        let real = registry.snapshot_or_placeholder(&"conn-1".into());
        assert_eq!(real.name, "user-conn-1");
    }

    #[test]
    fn test_list_snapshot() {
        let registry = PresenceRegistry::new();
        registry.register(&"conn-1".into(), UserProfile::default());
        registry.register(&"conn-2".into(), UserProfile::default());

        assert_eq!(registry.list().len(), 2);
    }
}
