//! HTTP route definitions.

mod health;
mod quotes;
mod ws;

use crate::AppState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub(crate) use quotes::now_millis;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(quotes::routes())
        .merge(ws::routes())
}

/// The complete service: routes, request tracing and permissive CORS.
pub fn create_app(state: AppState) -> Router {
    create_routes()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
