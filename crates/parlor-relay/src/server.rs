//! axum wiring: the `/ws` upgrade route and health check (spec §1, §4.1).
//!
//! Grounded on `tallow-relay::websocket::ws_router`/`ws_handler` for the
//! router shape; CORS stays permissive for the same reason the teacher's
//! relay leaves it open — this is a data-forwarding service, and access
//! control is the identity boundary's job, not origin checking.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::IdentitySource;
use crate::connection;
use crate::hub_manager::HubManager;

/// Shared state handed to every axum handler.
pub struct AppState {
    pub hubs: Arc<HubManager>,
    pub identity_source: Box<dyn IdentitySource>,
    pub outbound_capacity: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn ws_handler(
    uri: Uri,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Some(identity) = state.identity_source.authenticate(&uri) else {
        return (StatusCode::UNAUTHORIZED, "missing or invalid identity").into_response();
    };

    let outbound_capacity = state.outbound_capacity;
    let hubs = Arc::clone(&state.hubs);
    ws.on_upgrade(move |socket| async move {
        connection::handle_connection(socket, identity, hubs, outbound_capacity).await;
    })
    .into_response()
}
