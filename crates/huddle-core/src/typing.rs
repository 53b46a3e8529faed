//! Ephemeral per-(connection, room) typing state.
//!
//! Independent of the presence registry lifecycle: entries exist between
//! `typing:start` and `typing:stop`, and are always cleared on disconnect
//! whether or not the connection ever joined.

use dashmap::DashMap;
use huddle_events::ConnectionId;
use std::time::{Duration, Instant};
use tracing::debug;

/// Key for one typing marker: the connection and the room it is typing
/// in, or `None` for unaddressed composition.
pub type TypingKey = (ConnectionId, Option<String>);

/// State of one in-progress composition.
#[derive(Debug, Clone, Copy)]
pub struct TypingState {
    pub started_at: Instant,
}

/// Tracker for in-progress composition markers.
///
/// The configured timeout is enforced lazily: reads treat entries older
/// than the timeout as absent and evict them on observation. No background
/// sweep runs.
#[derive(Debug)]
pub struct TypingTracker {
    entries: DashMap<TypingKey, TypingState>,
    timeout: Duration,
}

impl TypingTracker {
    /// Create a tracker with the given staleness timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            timeout,
        }
    }

    /// Mark a connection as typing, creating or refreshing the entry.
    pub fn start(&self, conn: &ConnectionId, room: Option<&str>) {
        let key = (conn.clone(), room.map(String::from));
        self.entries.insert(
            key,
            TypingState {
                started_at: Instant::now(),
            },
        );
    }

    /// Remove a typing marker. Returns `true` if one existed.
    pub fn stop(&self, conn: &ConnectionId, room: Option<&str>) -> bool {
        let key = (conn.clone(), room.map(String::from));
        self.entries.remove(&key).is_some()
    }

    /// Remove every marker for a connection, in any room.
    ///
    /// Idempotent: safe to call on disconnect whether or not any entries
    /// (or a user record) ever existed. Returns the number removed.
    pub fn clear_connection(&self, conn: &ConnectionId) -> usize {
        let stale: Vec<TypingKey> = self
            .entries
            .iter()
            .filter(|entry| entry.key().0 == *conn)
            .map(|entry| entry.key().clone())
            .collect();

        for key in &stale {
            self.entries.remove(key);
        }

        if !stale.is_empty() {
            debug!(connection = %conn, cleared = stale.len(), "Typing: cleared markers");
        }

        stale.len()
    }

    /// Check whether a connection is currently typing in a room.
    ///
    /// An entry past the configured timeout counts as absent and is
    /// evicted.
    #[must_use]
    pub fn is_typing(&self, conn: &ConnectionId, room: Option<&str>) -> bool {
        let key = (conn.clone(), room.map(String::from));
        let expired = match self.entries.get(&key) {
            Some(state) => state.started_at.elapsed() > self.timeout,
            None => return false,
        };

        if expired {
            self.entries.remove(&key);
            return false;
        }
        true
    }

    /// Snapshot of all live typing markers, evicting expired ones.
    #[must_use]
    pub fn active(&self) -> Vec<TypingKey> {
        let mut live = Vec::new();
        let mut expired = Vec::new();
        for entry in self.entries.iter() {
            if entry.value().started_at.elapsed() > self.timeout {
                expired.push(entry.key().clone());
            } else {
                live.push(entry.key().clone());
            }
        }

        for key in &expired {
            self.entries.remove(key);
        }

        live
    }

    /// Number of markers currently stored, including not-yet-evicted
    /// expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no markers are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
