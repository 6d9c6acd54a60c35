//! HTTP route handlers: health, natural-language CRUD, chat, chat history.

use std::sync::Arc;

use assetdesk_engine::Outcome;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use super::json_error;
use super::middleware::SessionCaller;
use super::state::AppState;

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// Render an [`Outcome`] as `{message, data}`, `{data: {missing_fields, message}}`
/// or `{error}`.
pub(crate) fn outcome_response(outcome: Outcome) -> Response {
    let code = status(outcome.status_code());
    match outcome {
        Outcome::Executed { message, data, .. } => (
            code,
            Json(serde_json::json!({ "message": message, "data": data })),
        )
            .into_response(),
        Outcome::NeedsClarification {
            missing_fields,
            message,
        } => (
            code,
            Json(serde_json::json!({
                "data": { "missing_fields": missing_fields, "message": message }
            })),
        )
            .into_response(),
        Outcome::Failed { error, .. } => json_error(code, &error).into_response(),
    }
}

/// Pull a string field out of the request body. An unreadable body counts
/// as an empty one so the caller checks still decide the status.
fn body_text(payload: Result<Json<serde_json::Value>, JsonRejection>, key: &str) -> String {
    match payload {
        Ok(Json(parsed)) => parsed
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable request body");
            String::new()
        }
    }
}

/// POST /api/ai/natural-crud
pub(crate) async fn handle_natural_crud(
    State(state): State<Arc<AppState>>,
    Extension(SessionCaller(caller)): Extension<SessionCaller>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let instruction = body_text(payload, "instruction");
    let outcome = state.crud.natural_crud(&instruction, caller.as_ref()).await;
    outcome_response(outcome)
}

/// POST /api/ai/chat
pub(crate) async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Extension(SessionCaller(caller)): Extension<SessionCaller>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let message = body_text(payload, "message");
    match state.chat.answer(&message, caller.as_ref()).await {
        Ok(answer) => (StatusCode::OK, Json(serde_json::json!({ "data": answer }))).into_response(),
        Err(e) => json_error(status(e.status_code()), &e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryParams {
    user_id: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

/// GET /api/ai/chat/history?user_id=&page=&limit=
pub(crate) async fn handle_chat_history(
    State(state): State<Arc<AppState>>,
    Extension(SessionCaller(caller)): Extension<SessionCaller>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(0);
    match state
        .chat
        .history(caller.as_ref(), params.user_id.as_deref(), page, limit)
        .await
    {
        Ok(conversations) => {
            let count = conversations.len();
            let body = serde_json::json!({
                "data": {
                    "conversations": conversations,
                    "page": page,
                    "count": count,
                }
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => json_error(status(e.status_code()), &e.to_string()).into_response(),
    }
}
