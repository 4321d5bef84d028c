use serde::{Deserialize, Serialize};

use super::Intent;

/// Intent tag reported when the classifier itself could not be reached.
pub const ERROR_INTENT: &str = "error";

/// Body shared by `/chat` and every capability endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub intent: String,
    pub response: String,
}

impl ChatResponse {
    pub fn new(intent: Intent, response: impl Into<String>) -> Self {
        Self {
            intent: intent.label().to_string(),
            response: response.into(),
        }
    }

    pub fn with_label(intent: &str, response: impl Into<String>) -> Self {
        Self {
            intent: intent.to_string(),
            response: response.into(),
        }
    }
}
