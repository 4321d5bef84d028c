pub mod capabilities;
pub mod chat;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::ServiceKind;
use crate::state::AppState;

/// Routes for the service kind configured in `state`. Every kind answers
/// `GET /check`.
pub fn router(state: Arc<AppState>) -> Router {
    let kind = state.config.service;
    let mut app = Router::new().route("/check", get(health::check));

    if kind.serves(ServiceKind::Gateway) {
        app = app
            .route("/", get(chat::chat_page))
            .route("/chat", post(chat::chat));
    }
    if kind.serves(ServiceKind::Intent) {
        app = app.route("/classify-intent", post(capabilities::classify_intent));
    }
    if kind.serves(ServiceKind::Rag) {
        app = app.route("/rag", post(capabilities::rag));
    }
    if kind.serves(ServiceKind::DoctorName) {
        app = app.route(
            "/doctor-availability-by-name",
            post(capabilities::doctor_by_name),
        );
    }
    if kind.serves(ServiceKind::DoctorDisease) {
        app = app.route(
            "/doctor-availability-by-disease",
            post(capabilities::doctor_by_disease),
        );
    }
    if kind.serves(ServiceKind::DoctorSpecialty) {
        app = app.route(
            "/doctor-availability-by-specialty",
            post(capabilities::doctor_by_specialty),
        );
    }
    if kind.serves(ServiceKind::GeneralQuery) {
        app = app.route("/general-query", post(capabilities::general_query));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
