use axum::Json;
use serde_json::{json, Value};

// GET /check
pub async fn check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
