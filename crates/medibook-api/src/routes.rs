//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use medibook_core::config::ServerConfig;
use medibook_core::MedibookError;

use crate::handlers;
use crate::state::AppState;
use crate::websocket;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Browser and mobile clients connect from arbitrary origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/capabilities", get(handlers::capabilities))
        .route("/chat", post(handlers::chat))
        .route("/chat/reset", post(handlers::chat_reset))
        .route("/chat/{id}", delete(handlers::delete_chat))
        .route("/ws/voice", get(websocket::ws_voice))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind to the configured host and port and serve until the process ends.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), MedibookError> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MedibookError::Api(format!("Failed to bind {addr}: {e}")))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| MedibookError::Api(format!("Server error: {e}")))?;

    Ok(())
}
