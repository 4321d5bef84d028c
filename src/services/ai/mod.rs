pub mod groq;
pub mod intent;
pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String>;
}

/// Single-turn completion: instructions as the system prompt, `query` as the
/// only user message. Surrounding whitespace is trimmed from the reply.
pub async fn ask(llm: &dyn LlmProvider, instructions: &str, query: &str) -> anyhow::Result<String> {
    let reply = llm.chat(instructions, &[Message::user(query)]).await?;
    Ok(reply.trim().to_string())
}
