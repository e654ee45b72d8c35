//! API Routes
//!
//! Configures the Axum router with all cache service endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, connection_handler, fetch_handler, health_handler, history_handler,
    hover_handler, invalidate_handler, prefetch_handler, set_handler, stats_handler,
    update_connection_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /fetch?url=` - Read-through cached fetch
/// - `PUT /set` - Store a value in both layers
/// - `DELETE /invalidate?key=` - Drop one durable key and the fast layer
/// - `DELETE /clear` - Empty both layers
/// - `POST /prefetch`, `/prefetch/hover`, `/prefetch/history` - Queue cache warming
/// - `GET|PUT /connection` - Read or report the network effective type
/// - `GET /stats` - Cache and prefetch counters
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (the UI shell runs on its own origin)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/fetch", get(fetch_handler))
        .route("/set", put(set_handler))
        .route("/invalidate", delete(invalidate_handler))
        .route("/clear", delete(clear_handler))
        .route("/prefetch", post(prefetch_handler))
        .route("/prefetch/hover", post(hover_handler))
        .route("/prefetch/history", post(history_handler))
        .route(
            "/connection",
            get(connection_handler).put(update_connection_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
