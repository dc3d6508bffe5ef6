//! Quote endpoint routes.

use axum::{extract::State, routing::get, Json, Router};
use quotesync_engine::Timestamp;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_fetch, handle_upsert, QuotesPayload};
use crate::AppState;

/// Create quote routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/quotes", get(fetch_handler).post(upsert_handler))
}

/// GET /quotes - The full remote set.
async fn fetch_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<QuotesPayload>> {
    let response = handle_fetch(&state.pool).await?;
    Ok(Json(response))
}

/// POST /quotes - Upsert a batch, answer with the full remote set.
async fn upsert_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<QuotesPayload>,
) -> Result<Json<QuotesPayload>> {
    let response = handle_upsert(&state.pool, &state.conn_manager, request, now_millis()).await?;
    Ok(Json(response))
}

/// Server wall clock in milliseconds since the epoch.
pub(crate) fn now_millis() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
