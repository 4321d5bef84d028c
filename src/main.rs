use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use hospital_assistant::config::{AppConfig, ServiceKind};
use hospital_assistant::db;
use hospital_assistant::handlers;
use hospital_assistant::services::ai::groq::GroqProvider;
use hospital_assistant::services::ai::ollama::OllamaProvider;
use hospital_assistant::services::ai::LlmProvider;
use hospital_assistant::services::gateway::HttpUpstream;
use hospital_assistant::services::rag::KnowledgeBase;
use hospital_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;
    let service = config.service;

    // The gateway alone never reads doctor data.
    let db_path = if service.uses_database() {
        config.database_url.as_str()
    } else {
        ":memory:"
    };
    let conn = db::init_db(db_path)?;

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "groq" => {
            anyhow::ensure!(
                !config.groq_api_key.is_empty(),
                "GROQ_API_KEY must be set when LLM_PROVIDER=groq"
            );
            tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
            Box::new(GroqProvider::new(
                config.groq_api_key.clone(),
                config.groq_model.clone(),
                config.llm_timeout,
            )?)
        }
        _ => {
            tracing::info!(
                "using Ollama LLM provider (url: {}, model: {})",
                config.ollama_url,
                config.ollama_model
            );
            Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
                config.llm_timeout,
            )?)
        }
    };

    let knowledge = if service.serves(ServiceKind::Rag) {
        KnowledgeBase::load(Path::new(&config.docs_dir))?
    } else {
        KnowledgeBase::empty()?
    };

    let upstream = HttpUpstream::new(config.urls.clone(), config.upstream_timeout)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        llm,
        upstream: Box::new(upstream),
        knowledge,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(service = service.as_str(), "starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
