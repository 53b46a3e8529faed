//! Extension hooks for embedding applications.
//!
//! The hook set is a single strategy interface injected at construction;
//! the absence of custom behavior is the identity strategy, never a null
//! check inside the core.

use async_trait::async_trait;
use huddle_events::{ConnectionId, User};

/// What the core knows about a connection before it is authenticated.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub connection_id: ConnectionId,
    pub remote_addr: Option<String>,
}

/// Outcome of the pre-dispatch authentication check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny { reason: String },
}

/// Lifecycle strategy injected into the session controller.
///
/// `authenticate` runs before any event is dispatched; a deny refuses the
/// connection and it never reaches the active state. The transition hooks
/// run after the core's own bookkeeping, so custom logic cannot affect
/// the core's invariants.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Admission check for a new connection.
    async fn authenticate(&self, _ctx: &ConnectionContext) -> AuthDecision {
        AuthDecision::Allow
    }

    /// Runs after a connection becomes active (user registered).
    async fn on_active(&self, _user: &User) {}

    /// Runs after a connection terminated and its state was cleaned up.
    /// `user` is the removed record, absent if the connection never
    /// joined.
    async fn on_terminated(&self, _conn: &ConnectionId, _user: Option<&User>) {}
}

/// The identity strategy: allow everything, do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

#[async_trait]
impl SessionHooks for NoopHooks {}
