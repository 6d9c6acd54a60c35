//! HTTP middleware: rate limiting and session resolution.

use std::sync::Arc;

use assetdesk_engine::Caller;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;

/// Caller resolved from the request's session token, if any.
///
/// Handlers decide what an anonymous request means; the middleware never
/// rejects on its own.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionCaller(pub(crate) Option<Caller>);

pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match state.rate_limiter.check(addr.ip()).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::debug!(ip = %addr.ip(), "rate limit exceeded");
            let body = serde_json::json!({
                "error": "rate limit exceeded",
                "retry_after": retry_after,
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
    }
}

/// Resolve `Authorization: Bearer <token>` against the session table.
pub(crate) async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let caller = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .and_then(|token| state.resolve_session(token));

    request.extensions_mut().insert(SessionCaller(caller));
    next.run(request).await
}
