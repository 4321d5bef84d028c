use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::ai::LlmProvider;
use crate::services::gateway::Upstream;
use crate::services::rag::KnowledgeBase;

/// Process-wide dependencies, constructed once in `main` and shared by every
/// handler.
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub llm: Box<dyn LlmProvider>,
    pub upstream: Box<dyn Upstream>,
    pub knowledge: KnowledgeBase,
}
