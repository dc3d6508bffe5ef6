//! WebSocket upgrade route.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::handlers::handle_websocket_connection;
use crate::AppState;

/// Label used when the client does not name itself.
const DEFAULT_CLIENT: &str = "anonymous";

#[derive(Debug, Deserialize)]
struct WsParams {
    /// Free-form client label, for logs and connection bookkeeping
    client: Option<String>,
}

/// Create WebSocket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// GET /ws - Subscribe to change notifications.
async fn ws_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let client = params
        .client
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CLIENT.to_string());
    let conn_manager = state.conn_manager.clone();

    ws.on_upgrade(move |socket| handle_websocket_connection(socket, conn_manager, client))
}
