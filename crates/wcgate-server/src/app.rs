//! Router construction.
//!
//! Builds the axum router with the proxy handler and middleware.

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors;
use crate::state::AppState;

/// Create the application router.
///
/// Every path and method goes to the proxy handler, which routes on method.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let allowed_origin = state.allowed_origin.clone();

    Router::new()
        .fallback(handlers::proxy::dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors::allow_origin_layer(allowed_origin))
                .layer(cors::allow_methods_layer())
                .layer(cors::allow_headers_layer()),
        )
        .with_state(state)
}
