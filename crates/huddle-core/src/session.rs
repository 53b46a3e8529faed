//! The session lifecycle state machine.
//!
//! A connection moves `Unauthenticated → Active → Terminated`. The first
//! `user:join` event drives the activation transition; transport-level
//! disconnect drives the terminal one. Termination is irreversible per
//! connection id; a reconnecting client gets a fresh id and starts over.

use crate::hooks::{AuthDecision, ConnectionContext, SessionHooks};
use crate::presence::PresenceRegistry;
use crate::router::MessageRouter;
use crate::typing::TypingTracker;
use huddle_events::{ClientEvent, ConnectionId, Delivery, ServerEvent, Target, UserProfile};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected at the transport level, no user record yet.
    Unauthenticated,
    /// A user record exists for the connection.
    Active,
    /// Torn down. Terminal; the id is never reused.
    Terminated,
}

/// Drives connections through the session lifecycle, keeping the presence
/// registry and typing tracker consistent and emitting the lifecycle
/// broadcasts each transition requires.
pub struct SessionController {
    registry: Arc<PresenceRegistry>,
    typing: Arc<TypingTracker>,
    router: MessageRouter,
    hooks: Arc<dyn SessionHooks>,
}

impl SessionController {
    /// Assemble a controller from its injected collaborators.
    pub fn new(
        registry: Arc<PresenceRegistry>,
        typing: Arc<TypingTracker>,
        router: MessageRouter,
        hooks: Arc<dyn SessionHooks>,
    ) -> Self {
        Self {
            registry,
            typing,
            router,
            hooks,
        }
    }

    /// Pre-dispatch admission check. On deny the caller must refuse the
    /// connection before dispatching any event.
    pub async fn authorize(&self, ctx: &ConnectionContext) -> AuthDecision {
        self.hooks.authenticate(ctx).await
    }

    /// The `Unauthenticated → Active` transition.
    ///
    /// Registers the user, then emits exactly one `user:joined` broadcast
    /// to everyone else and one `users:list` snapshot to the joiner. The
    /// snapshot is taken after registration, so it always contains the
    /// joiner's own record.
    pub async fn handle_join(&self, conn: &ConnectionId, profile: UserProfile) -> Vec<Delivery> {
        let user = self.registry.register(conn, profile);
        let users = self.registry.list();

        let deliveries = vec![
            Delivery::new(
                Target::broadcast_excluding(conn.clone()),
                ServerEvent::UserJoined { user: user.clone() },
            ),
            Delivery::new(
                Target::connection(conn.clone()),
                ServerEvent::UsersList { users },
            ),
        ];

        self.hooks.on_active(&user).await;
        deliveries
    }

    /// Handle an inbound chat-plane event from an active (or
    /// never-joined) connection.
    ///
    /// Events from connections that never joined use the minimal
    /// placeholder identity rather than failing.
    pub fn handle_event(&self, conn: &ConnectionId, event: ClientEvent) -> Vec<Delivery> {
        match event {
            ClientEvent::Message {
                room,
                text,
                meta,
                reply_to,
            } => {
                self.registry.touch(conn);
                let sender = self.registry.snapshot_or_placeholder(conn);
                self.router.route_message(&sender, room, text, meta, reply_to)
            }

            ClientEvent::PrivateMessage {
                to_user_id,
                text,
                meta,
            } => {
                self.registry.touch(conn);
                let sender = self.registry.snapshot_or_placeholder(conn);
                self.router.route_private(&sender, to_user_id, text, meta)
            }

            ClientEvent::TypingStart { room } => {
                if self.router.features().typing_indicators {
                    self.typing.start(conn, room.as_deref());
                }
                let sender = self.registry.snapshot_or_placeholder(conn);
                self.router.route_typing(&sender, room, true)
            }

            ClientEvent::TypingStop { room } => {
                if self.router.features().typing_indicators {
                    self.typing.stop(conn, room.as_deref());
                }
                let sender = self.registry.snapshot_or_placeholder(conn);
                self.router.route_typing(&sender, room, false)
            }

            ClientEvent::MessageRead { message_id, room } => {
                self.router.route_read(conn, message_id, room)
            }

            ClientEvent::UserStatus { status } => {
                match self.registry.set_status(conn, status) {
                    Some(user) => self.router.route_status(&user),
                    None => Vec::new(),
                }
            }

            // Dispatched elsewhere: the join transition and room
            // membership operations have their own entry points.
            ClientEvent::UserJoin { .. }
            | ClientEvent::JoinRoom { .. }
            | ClientEvent::LeaveRoom { .. }
            | ClientEvent::RoomCreate { .. } => {
                debug!(connection = %conn, "Event has a dedicated entry point, ignoring");
                Vec::new()
            }
        }
    }

    /// The `Active → Terminated` transition, fired on transport
    /// disconnect for any reason.
    ///
    /// Typing markers are cleared whether or not a user record existed;
    /// the `user:left` broadcast is emitted only when one did.
    pub async fn handle_disconnect(&self, conn: &ConnectionId, reason: &str) -> Vec<Delivery> {
        let removed = self.registry.unregister(conn);
        self.typing.clear_connection(conn);

        let deliveries = match &removed {
            Some(user) => vec![Delivery::new(
                Target::broadcast_excluding(conn.clone()),
                ServerEvent::UserLeft {
                    id: user.id.clone(),
                    name: user.name.clone(),
                    reason: reason.to_string(),
                },
            )],
            None => Vec::new(),
        };

        self.hooks.on_terminated(conn, removed.as_ref()).await;
        deliveries
    }
}
