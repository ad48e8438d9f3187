//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::store::Store;

pub use routes::create_router;

/// Shared state handed to every route and middleware
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Axum layers run in reverse order (last added = first executed):
    // context -> logging -> actor -> handler
    let protected_routes = create_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::actor_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::context_middleware));

    Router::new()
        // Health check (no actor)
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
