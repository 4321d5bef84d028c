use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::models::{
    AnswerResponse, DoctorDiseaseResponse, DoctorNameResponse, IntentResponse, QueryRequest,
    SpecialtyResponse,
};
use crate::services::ai::intent;
use crate::services::{doctors, general, rag};
use crate::state::AppState;

// POST /classify-intent
pub async fn classify_intent(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Json<IntentResponse> {
    let detected = intent::classify(state.llm.as_ref(), &payload.query).await;
    Json(IntentResponse {
        intent: detected.label().to_string(),
    })
}

// POST /rag
pub async fn rag(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let answer = rag::answer(state.llm.as_ref(), &state.knowledge, &payload.query)
        .await
        .map_err(AppError::from_llm)?;
    Ok(Json(answer))
}

// POST /general-query
pub async fn general_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let answer = general::answer(state.llm.as_ref(), &payload.query)
        .await
        .map_err(AppError::from_llm)?;
    Ok(Json(answer))
}

// POST /doctor-availability-by-name
pub async fn doctor_by_name(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<DoctorNameResponse>, AppError> {
    let res = doctors::availability_by_name(state.llm.as_ref(), &state.db, &payload.query).await?;
    Ok(Json(res))
}

// POST /doctor-availability-by-specialty
pub async fn doctor_by_specialty(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<SpecialtyResponse>, AppError> {
    let res =
        doctors::availability_by_specialty(state.llm.as_ref(), &state.db, &payload.query).await?;
    Ok(Json(res))
}

// POST /doctor-availability-by-disease
pub async fn doctor_by_disease(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<DoctorDiseaseResponse>, AppError> {
    let res =
        doctors::availability_by_disease(state.llm.as_ref(), &state.db, &payload.query).await?;
    Ok(Json(res))
}
