use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::Json;

use crate::models::{ChatResponse, QueryRequest};
use crate::services::gateway;
use crate::state::AppState;

static CHAT_HTML: &str = include_str!("../web/chat.html");

// GET /
pub async fn chat_page() -> Html<&'static str> {
    Html(CHAT_HTML)
}

// POST /chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Json<ChatResponse> {
    tracing::info!(query = %payload.query, "incoming chat");
    Json(gateway::route(state.upstream.as_ref(), &payload.query).await)
}
