//! Connection handlers for the Huddle server.
//!
//! This module wires the session core to axum WebSockets and the fan-out,
//! and drives the per-connection lifecycle: authorize, attach, process
//! events in arrival order, tear down on disconnect.

use crate::api;
use crate::config::{Config, FanOutBackend};
use crate::gateway::Gateway;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use huddle_core::{
    AuthDecision, ConnectionContext, EventSink, Facade, LocalRoomIndex, MessageRouter,
    PresenceRegistry, RoomIndex, RoomOps, RouterFeatures, SessionController, SessionHooks,
    SessionState, TypingTracker,
};
use huddle_events::{parse_frame, to_frame, ClientEvent, ConnectionId, Delivery, Envelope, ServerEvent};
use huddle_fanout::{FanOut, MemoryFanOut};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[cfg(feature = "redis")]
use huddle_fanout::RedisFanOut;

/// Shared server state.
pub struct AppState {
    /// Local delivery fabric and fan-out publisher handle.
    pub gateway: Arc<Gateway>,
    /// The session lifecycle state machine.
    pub sessions: SessionController,
    /// Room membership operations.
    pub rooms: RoomOps,
    /// Query/imperative surface for the REST layer.
    pub facade: Facade,
    /// Server configuration.
    pub config: Config,
}

/// Run the HTTP/WebSocket server.
///
/// Connecting to the fan-out happens once here; a failure is fatal so
/// the process never accepts connections in a non-replicated state.
///
/// # Errors
///
/// Returns an error if the fan-out is unreachable or the server fails to
/// start.
pub async fn run_server(config: Config, hooks: Arc<dyn SessionHooks>) -> Result<()> {
    let fanout: Arc<dyn FanOut> = match config.fanout.backend {
        #[cfg(feature = "redis")]
        FanOutBackend::Redis => Arc::new(
            RedisFanOut::connect(&config.fanout.url, &config.fanout.namespace).await?,
        ),
        #[cfg(not(feature = "redis"))]
        FanOutBackend::Redis => {
            anyhow::bail!("Redis fan-out requested but the `redis` feature is disabled")
        }
        FanOutBackend::Memory => {
            warn!("Memory fan-out selected; events will not reach other processes");
            Arc::new(MemoryFanOut::new())
        }
    };

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let addr = config.bind_addr();
    let state = build_state(config, hooks, fanout).await?;
    let app = build_app(state);

    let listener = TcpListener::bind(addr).await?;

    info!("Huddle server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Assemble the shared state over an already-connected fan-out.
///
/// The fan-out subscription is opened before any connection is accepted;
/// failure here aborts startup.
///
/// # Errors
///
/// Returns an error if the fan-out subscription cannot be established.
pub async fn build_state(
    config: Config,
    hooks: Arc<dyn SessionHooks>,
    fanout: Arc<dyn FanOut>,
) -> Result<Arc<AppState>> {
    let origin = Uuid::new_v4().to_string();
    let room_index = Arc::new(LocalRoomIndex::new());

    let (fanout_tx, mut fanout_rx) = mpsc::unbounded_channel::<Envelope>();
    let gateway = Arc::new(Gateway::new(origin, room_index.clone(), fanout_tx));

    debug!(origin = %gateway.origin(), backend = fanout.name(), "Fan-out attached");

    // Inbound replication: resolve remote envelopes against local peers.
    let mut inbound = fanout.subscribe().await?;
    {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            while let Some(envelope) = inbound.recv().await {
                gateway.deliver_remote(envelope);
            }
            debug!("Fan-out inbound stream ended");
        });
    }

    // Outbound replication: a dedicated publisher so a slow fan-out never
    // stalls inbound event processing. Failed publishes are dropped.
    {
        let fanout = fanout.clone();
        tokio::spawn(async move {
            while let Some(envelope) = fanout_rx.recv().await {
                if let Err(e) = fanout.publish(envelope).await {
                    warn!(error = %e, "Fan-out publish failed; envelope dropped");
                    metrics::record_error("fanout");
                }
            }
        });
    }

    let registry = Arc::new(PresenceRegistry::new());
    let typing = Arc::new(TypingTracker::new(config.features.typing_timeout()));
    let router = MessageRouter::new(RouterFeatures {
        typing_indicators: config.features.typing_indicators,
        read_receipts: config.features.read_receipts,
    });

    let sessions = SessionController::new(registry.clone(), typing, router, hooks);
    let rooms = RoomOps::new(
        room_index.clone() as Arc<dyn RoomIndex>,
        registry.clone(),
    );
    let facade = Facade::new(
        registry,
        room_index as Arc<dyn RoomIndex>,
        gateway.clone() as Arc<dyn EventSink>,
    );

    Ok(Arc::new(AppState {
        gateway,
        sessions,
        rooms,
        facade,
        config,
    }))
}

/// Build the axum application over the shared state.
pub fn build_app(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler));

    if state.config.api.enabled {
        app = app.nest(&state.config.api.prefix, api::api_router(&state));
    }

    app.with_state(state)
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

/// Handle one WebSocket connection from handshake to teardown.
async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: Arc<AppState>) {
    let connection_id = ConnectionId::generate();

    // Pre-dispatch admission check. A denied connection never reaches
    // the active state and leaves no record behind.
    let ctx = ConnectionContext {
        connection_id: connection_id.clone(),
        remote_addr: Some(addr.to_string()),
    };
    if let AuthDecision::Deny { reason } = state.sessions.authorize(&ctx).await {
        info!(connection = %connection_id, reason = %reason, "Connection refused");
        return;
    }

    let _metrics_guard = ConnectionMetricsGuard::new();
    debug!(connection = %connection_id, remote = %addr, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.gateway.attach(&connection_id, tx);

    let mut session_state = SessionState::Unauthenticated;
    let max_frame = state.config.limits.max_message_size;
    let mut reason = "connection closed";

    loop {
        tokio::select! {
            biased;

            // Outbound events addressed to this connection.
            Some(event) = rx.recv() => {
                match to_frame(&event) {
                    Ok(frame) => {
                        metrics::record_event(frame.len(), "outbound");
                        if sender.send(Message::Text(frame)).await.is_err() {
                            reason = "transport error";
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(connection = %connection_id, error = %e, "Failed to encode outbound event");
                        metrics::record_error("encode");
                    }
                }
            }

            // Inbound frames, processed one at a time in arrival order.
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > max_frame {
                            debug!(connection = %connection_id, size = text.len(), "Skipping oversized frame");
                            continue;
                        }
                        metrics::record_event(text.len(), "inbound");

                        match parse_frame(&text) {
                            Ok(event) => {
                                let deliveries =
                                    dispatch(&state, &connection_id, &mut session_state, event).await;
                                for delivery in deliveries {
                                    state.gateway.deliver(delivery);
                                }
                            }
                            Err(e) => {
                                // Unknown events are skipped, not errored.
                                debug!(connection = %connection_id, error = %e, "Skipping undecodable frame");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(connection = %connection_id, "Skipping binary frame");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            reason = "transport error";
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pongs
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %connection_id, "Received close frame");
                        reason = "client disconnect";
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %connection_id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        reason = "transport error";
                        break;
                    }
                    None => {
                        debug!(connection = %connection_id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Teardown: drop local routes and membership first, then run the
    // terminal transition and replicate its broadcasts.
    state.gateway.detach(&connection_id);
    let deliveries = state.sessions.handle_disconnect(&connection_id, reason).await;
    for delivery in deliveries {
        state.gateway.deliver(delivery);
    }

    session_state = SessionState::Terminated;
    metrics::set_active_users(state.facade.active_users().len());
    metrics::set_active_rooms(state.facade.room_names().len());
    debug!(connection = %connection_id, state = ?session_state, reason = %reason, "WebSocket disconnected");
}

/// Route one inbound event to its entry point in the core.
async fn dispatch(
    state: &Arc<AppState>,
    conn: &ConnectionId,
    session_state: &mut SessionState,
    event: ClientEvent,
) -> Vec<Delivery> {
    match event {
        ClientEvent::UserJoin { profile } => {
            *session_state = SessionState::Active;
            let deliveries = state.sessions.handle_join(conn, profile).await;
            metrics::set_active_users(state.facade.active_users().len());
            deliveries
        }

        ClientEvent::JoinRoom { room } => {
            let deliveries = state.rooms.join(conn, &room);
            metrics::set_active_rooms(state.facade.room_names().len());
            deliveries
        }

        ClientEvent::LeaveRoom { room } => {
            let deliveries = state.rooms.leave(conn, &room);
            metrics::set_active_rooms(state.facade.room_names().len());
            deliveries
        }

        ClientEvent::RoomCreate {
            room_name,
            is_private,
        } => {
            let deliveries = state.rooms.create(conn, &room_name, is_private);
            metrics::set_active_rooms(state.facade.room_names().len());
            deliveries
        }

        other => state.sessions.handle_event(conn, other),
    }
}
