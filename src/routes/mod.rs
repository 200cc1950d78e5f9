//! API routes

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::conversation::display::RenderedMessage;
use crate::core::TurnOutcome;
use crate::AppState;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub kind: &'static str,
    /// The submitted text as the view shows it; `None` when hidden
    pub user: Option<RenderedMessage>,
    pub message: Option<RenderedMessage>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<RenderedMessage>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub in_progress: bool,
    pub model: String,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let outcome = state.chat_engine.send(&request.message).await;

    let kind = match &outcome {
        TurnOutcome::Ignored => return StatusCode::NO_CONTENT.into_response(),
        TurnOutcome::Reply(_) => "reply",
        TurnOutcome::Error(_) => "error",
    };

    Json(ChatResponse {
        kind,
        user: state.chat_engine.render_user(&request.message),
        message: state.chat_engine.render_outcome(&outcome),
    })
    .into_response()
}

async fn history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        messages: state.chat_engine.history().await,
    })
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        in_progress: state.chat_engine.in_progress(),
        model: state.config.gemini.model.clone(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/history", get(history))
        .route("/v1/status", get(status))
}
