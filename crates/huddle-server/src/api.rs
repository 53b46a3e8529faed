//! REST facade over the utility/query operations.
//!
//! A thin surface for embedding applications and operators; every route
//! calls straight into the core facade and is safe to use concurrently
//! with event processing. The auth and CORS toggles here are entirely
//! outside the session core.

use crate::handlers::AppState;
use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use huddle_events::{ConnectionId, User};
use serde::Deserialize;
use std::sync::Arc;

/// Body of an imperative send: an application-defined event name and its
/// payload, forwarded as-is.
#[derive(Debug, Deserialize)]
struct SendBody {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Build the facade routes under the configured prefix.
pub fn api_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let mut router = Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/send", post(send_to_user))
        .route("/rooms", get(list_rooms))
        .route("/rooms/:room/users", get(list_room_members))
        .route("/rooms/:room/send", post(send_to_room))
        .route("/broadcast", post(broadcast));

    if state.config.api.auth_required {
        router = router.layer(middleware::from_fn(require_auth));
    }
    if state.config.api.cors_allow_any {
        router = router.layer(middleware::map_response(allow_any_origin));
    }

    router
}

async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    Json(state.facade.active_users())
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.facade.find_user(&ConnectionId::new(id)) {
        Some(user) => Json(user).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.facade.room_names())
}

async fn list_room_members(
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
) -> Json<Vec<ConnectionId>> {
    Json(state.facade.room_members(&room))
}

async fn send_to_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SendBody>,
) -> StatusCode {
    state
        .facade
        .send_to_user(&ConnectionId::new(id), &body.event, body.data);
    // Fire-and-forget: accepted says nothing about delivery.
    StatusCode::ACCEPTED
}

async fn send_to_room(
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
    Json(body): Json<SendBody>,
) -> StatusCode {
    state.facade.send_to_room(&room, &body.event, body.data);
    StatusCode::ACCEPTED
}

async fn broadcast(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendBody>,
) -> StatusCode {
    state.facade.broadcast_all(&body.event, body.data);
    StatusCode::ACCEPTED
}

async fn require_auth(request: Request, next: Next) -> Response {
    if request.headers().contains_key(header::AUTHORIZATION) {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn allow_any_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}
