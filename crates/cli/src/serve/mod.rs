//! `assetdesk serve`: HTTP JSON surface over the natural-language CRUD engine.
//!
//! - CORS headers on all responses (permissive)
//! - Per-IP rate limiting (`[server] rate_limit` requests per minute)
//! - Bearer session tokens resolved to callers from `[[sessions]]`
//!
//! Endpoints:
//! - GET  /health                   - Server status (no auth)
//! - POST /api/ai/natural-crud      - Run an instruction (admin)
//! - POST /api/ai/chat              - Ask a question about the inventory
//! - GET  /api/ai/chat/history      - Conversation history, newest first
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use assetdesk_engine::{ChatResponder, NaturalCrud};
use assetdesk_storage::InventoryStore;
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

use self::handlers::{
    handle_chat, handle_chat_history, handle_health, handle_natural_crud, handle_not_found,
};
use self::middleware::{rate_limit_middleware, session_middleware};
use self::state::{AppState, RateLimiter};

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Rate limit window duration in seconds.
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the router over an already-assembled state.
fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/ai/natural-crud", post(handle_natural_crud))
        .route("/api/ai/chat", post(handle_chat))
        .route("/api/ai/chat/history", get(handle_chat_history))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl+C.
pub(crate) async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn InventoryStore> = Arc::new(config.store()?);
    let gateway = config.gateway();
    let sessions = config.session_table();

    tracing::info!(
        sessions = sessions.len(),
        rate_limit = config.server.rate_limit,
        "starting server"
    );

    let state = Arc::new(AppState {
        crud: NaturalCrud::new(store.clone(), gateway.clone()),
        chat: ChatResponder::new(store, gateway),
        sessions,
        rate_limiter: RateLimiter::new(config.server.rate_limit),
    });

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "assetdesk listening");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for Ctrl+C. If the handler cannot be installed, never resolve.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
