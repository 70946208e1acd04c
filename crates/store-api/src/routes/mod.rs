//! Route handlers for the store API.

pub mod health;
pub mod store_info;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/store-info",
            get(store_info::get_store_info).post(store_info::upsert_store_info),
        )
        .route("/health", get(health::health))
}

/// Build the application with middleware and state.
pub fn app(state: AppState) -> Router {
    router()
        // The widget is embedded in storefront pages on other origins
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
