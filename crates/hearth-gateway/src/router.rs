use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::state::SharedState;

/// Build the application router with all routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/sessions/{id}", delete(reset_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(serde::Deserialize)]
struct InvokeRequest {
    session_id: Option<String>,
    question: String,
}

/// POST /invoke runs one turn. A missing session id starts a fresh
/// session under a generated one.
async fn invoke(
    axum::extract::State(state): axum::extract::State<SharedState>,
    axum::Json(body): axum::Json<InvokeRequest>,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    let question = body.question.trim();
    if question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "status": "error",
                "message": "question must not be empty",
            })),
        );
    }

    let session_id = body
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let answer = state.runtime.run_turn(&session_id, question).await;

    (
        StatusCode::OK,
        axum::Json(json!({
            "session_id": session_id,
            "answer": answer,
        })),
    )
}

async fn status(
    axum::extract::State(state): axum::extract::State<SharedState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.llm.model,
        "sessions": state.runtime.session_count(),
        "tools": state.runtime.tool_names(),
    }))
}

/// DELETE /api/sessions/{id} drops a session's in-process state. The
/// durable history stays; the next turn re-seeds from it.
async fn reset_session(
    axum::extract::State(state): axum::extract::State<SharedState>,
    Path(id): Path<String>,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    if state.runtime.reset_session(&id) {
        info!(session_id = %id, "session reset");
        return (StatusCode::OK, axum::Json(json!({"status": "ok"})));
    }

    (
        StatusCode::NOT_FOUND,
        axum::Json(json!({
            "status": "error",
            "message": format!("no active session '{id}'"),
        })),
    )
}
