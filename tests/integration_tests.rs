use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use hospital_assistant::config::{AppConfig, ServiceKind, ServiceUrls};
use hospital_assistant::db::{self, queries};
use hospital_assistant::handlers;
use hospital_assistant::models::{Intent, ScheduleEntry};
use hospital_assistant::services::ai::{LlmProvider, Message};
use hospital_assistant::services::gateway::{
    self, Endpoint, HttpUpstream, Upstream, UpstreamError, FAILURE_MESSAGE,
};
use hospital_assistant::services::rag::KnowledgeBase;
use hospital_assistant::state::AppState;

// ── Mock Providers ──

/// Answers each prompt family deterministically, keyed on the system prompt.
struct MockLlm;

#[async_trait]
impl LlmProvider for MockLlm {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let query = messages.last().map(|m| m.content.as_str()).unwrap_or("");

        let reply = if system_prompt.contains("intent classifier") {
            if query.contains("THT") {
                "Doctor's availability search by its specialization."
            } else if query.contains("Dr.") {
                "Doctor's availability search by its name."
            } else if query.contains("sakit") {
                "Doctor's availability search by its disease."
            } else if query.contains("cegah") {
                "Asking about health tips and general disease."
            } else if query.contains("halo") {
                "General query."
            } else {
                "I don't know"
            }
        } else if system_prompt.contains("extract the specialty") {
            "Spesialis THT"
        } else if system_prompt.contains("extract the doctor name") {
            if query.contains("Sari") {
                "Dr. Sari"
            } else {
                "Dr. Budi"
            }
        } else if system_prompt.contains("extract the disease") {
            "Sakit Telinga"
        } else if system_prompt.contains("expert medical AI") {
            "Cuci tangan secara teratur."
        } else {
            "Halo! Saya AI Customer Service Rumah Sakit."
        };

        Ok(reply.to_string())
    }
}

struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn chat(&self, _system_prompt: &str, _messages: &[Message]) -> anyhow::Result<String> {
        anyhow::bail!("model unavailable")
    }
}

/// Upstream that classifies everything with one label and answers every
/// capability with one body.
struct MockUpstream {
    label: Option<&'static str>,
    capability: Result<serde_json::Value, u16>,
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn post_query(
        &self,
        endpoint: Endpoint,
        _query: &str,
    ) -> Result<serde_json::Value, UpstreamError> {
        if endpoint == Endpoint::ClassifyIntent {
            return match self.label {
                Some(label) => Ok(json!({ "intent": label })),
                None => Err(UpstreamError::Status {
                    status: 503,
                    body: "down".to_string(),
                }),
            };
        }
        match &self.capability {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(UpstreamError::Status {
                status: *status,
                body: "{\"detail\":\"error\"}".to_string(),
            }),
        }
    }
}

// ── Helpers ──

fn test_config(service: ServiceKind) -> AppConfig {
    AppConfig {
        service,
        port: 0,
        database_url: ":memory:".to_string(),
        docs_dir: "docs".to_string(),
        llm_provider: "ollama".to_string(),
        ollama_url: "http://localhost:11434".to_string(),
        ollama_model: "llama3".to_string(),
        groq_api_key: "".to_string(),
        groq_model: "".to_string(),
        llm_timeout: Duration::from_secs(5),
        upstream_timeout: Duration::from_secs(5),
        urls: ServiceUrls::single("http://localhost:0"),
    }
}

fn seeded_db() -> Arc<Mutex<rusqlite::Connection>> {
    let conn = db::init_db(":memory:").unwrap();
    let sari = queries::insert_doctor(&conn, "Dr. Sari", "Spesialis THT").unwrap();
    queries::insert_schedule(
        &conn,
        sari,
        &ScheduleEntry {
            day: "Senin".to_string(),
            time_start: "08:00".to_string(),
            time_end: "10:00".to_string(),
        },
    )
    .unwrap();
    queries::insert_doctor(&conn, "Dr. Andi", "Kardiolog").unwrap();
    Arc::new(Mutex::new(conn))
}

fn state_with(
    service: ServiceKind,
    llm: Box<dyn LlmProvider>,
    upstream: Box<dyn Upstream>,
) -> Arc<AppState> {
    Arc::new(AppState {
        db: seeded_db(),
        config: test_config(service),
        llm,
        upstream,
        knowledge: KnowledgeBase::from_documents(vec![(
            "flu.txt".to_string(),
            "Flu dapat dicegah dengan mencuci tangan.".to_string(),
        )])
        .unwrap(),
    })
}

fn capability_state(llm: Box<dyn LlmProvider>) -> Arc<AppState> {
    state_with(
        ServiceKind::All,
        llm,
        Box::new(MockUpstream {
            label: None,
            capability: Err(500),
        }),
    )
}

fn gateway_app(label: Option<&'static str>, capability: Result<serde_json::Value, u16>) -> Router {
    handlers::router(state_with(
        ServiceKind::Gateway,
        Box::new(MockLlm),
        Box::new(MockUpstream { label, capability }),
    ))
}

fn post_query(uri: &str, query: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "query": query }).to_string()))
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Serves `app` on an ephemeral local port and returns its base URL.
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ── Health Check ──

#[tokio::test]
async fn test_check() {
    for kind in [ServiceKind::Gateway, ServiceKind::Intent, ServiceKind::All] {
        let app = handlers::router(state_with(
            kind,
            Box::new(MockLlm),
            Box::new(MockUpstream {
                label: None,
                capability: Err(500),
            }),
        ));
        let res = app
            .oneshot(Request::builder().uri("/check").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await, json!({"status": "ok"}));
    }
}

#[tokio::test]
async fn test_service_kind_limits_routes() {
    let app = gateway_app(Some("general query"), Ok(json!({})));
    let res = app.oneshot(post_query("/rag", "halo")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_page_serves_html() {
    let app = gateway_app(Some("general query"), Ok(json!({})));
    let res = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("AI Customer Service Rumah Sakit"));
}

// ── Gateway ──

#[tokio::test]
async fn test_chat_normalizes_specialty_response() {
    let app = gateway_app(
        Some(Intent::DoctorBySpecialty.label()),
        Ok(json!({
            "specialty": "Spesialis THT",
            "availability": "\n\nDokter: Dr. Sari\nHari: Senin, Pukul: 08:00 - 10:00",
        })),
    );
    let res = app
        .oneshot(post_query("/chat", "Siapa dokter spesialis THT yang tersedia?"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["intent"], Intent::DoctorBySpecialty.label());
    let text = json["response"].as_str().unwrap();
    assert!(text.starts_with("Jadwal dokter dengan spesialisasi Spesialis THT:"));
    assert!(text.contains("Hari: Senin, Pukul: 08:00 - 10:00"));
}

#[tokio::test]
async fn test_chat_classifier_down_is_error() {
    let app = gateway_app(None, Ok(json!({})));
    let res = app.oneshot(post_query("/chat", "halo")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["intent"], "error");
    assert_eq!(json["response"], FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_chat_capability_failure_keeps_intent() {
    let app = gateway_app(Some(Intent::DoctorByDisease.label()), Err(400));
    let res = app.oneshot(post_query("/chat", "sakit perut")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["intent"], Intent::DoctorByDisease.label());
    assert_eq!(json["response"], FAILURE_MESSAGE);
}

// ── Capability Endpoints ──

#[tokio::test]
async fn test_classify_intent_endpoint() {
    let app = handlers::router(capability_state(Box::new(MockLlm)));
    let res = app
        .oneshot(post_query("/classify-intent", "Siapa dokter spesialis THT?"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["intent"], "doctor's availability search by its specialization");
}

#[tokio::test]
async fn test_classify_intent_falls_back_on_llm_failure() {
    let app = handlers::router(capability_state(Box::new(FailingLlm)));
    let res = app
        .oneshot(post_query("/classify-intent", "halo"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["intent"], "unanswerable question");
}

#[tokio::test]
async fn test_doctor_by_specialty_endpoint() {
    let app = handlers::router(capability_state(Box::new(MockLlm)));
    let res = app
        .oneshot(post_query("/doctor-availability-by-specialty", "dokter THT"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["specialty"], "Spesialis THT");
    assert_eq!(
        json["availability"],
        "\n\nDokter: Dr. Sari\nHari: Senin, Pukul: 08:00 - 10:00"
    );
}

#[tokio::test]
async fn test_doctor_by_name_not_found() {
    let app = handlers::router(capability_state(Box::new(MockLlm)));
    let res = app
        .oneshot(post_query("/doctor-availability-by-name", "jadwal Dr. Budi"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["detail"], "Dokter tidak ditemukan.");
}

#[tokio::test]
async fn test_doctor_by_disease_endpoint() {
    let app = handlers::router(capability_state(Box::new(MockLlm)));
    let res = app
        .oneshot(post_query("/doctor-availability-by-disease", "telinga saya sakit"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["doctor_name"], "Dr. Sari");
    assert_eq!(
        json["availability"],
        "Jadwal dokter dengan spesialisasi Spesialis THT:\nDokter: Dr. Sari\nHari: Senin, Pukul: 08:00 - 10:00"
    );
}

#[tokio::test]
async fn test_general_query_llm_failure_is_bad_gateway() {
    let app = handlers::router(capability_state(Box::new(FailingLlm)));
    let res = app
        .oneshot(post_query("/general-query", "halo"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(json_body(res).await["detail"].is_string());
}

#[tokio::test]
async fn test_rag_endpoint() {
    let app = handlers::router(capability_state(Box::new(MockLlm)));
    let res = app
        .oneshot(post_query("/rag", "bagaimana cara cegah flu?"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["response"], "Cuci tangan secara teratur.");
}

// ── End to End over HTTP ──

#[tokio::test]
async fn test_end_to_end_specialty_scenario() {
    let base = spawn_server(handlers::router(capability_state(Box::new(MockLlm)))).await;
    let upstream = HttpUpstream::new(ServiceUrls::single(&base), Duration::from_secs(5)).unwrap();

    let res = gateway::route(&upstream, "Siapa dokter spesialis THT yang tersedia?").await;
    assert_eq!(res.intent, "doctor's availability search by its specialization");
    assert!(res
        .response
        .starts_with("Jadwal dokter dengan spesialisasi Spesialis THT:"));
    assert!(res.response.contains("Dokter: Dr. Sari"));
}

#[tokio::test]
async fn test_end_to_end_capability_404_degrades() {
    let base = spawn_server(handlers::router(capability_state(Box::new(MockLlm)))).await;
    let upstream = HttpUpstream::new(ServiceUrls::single(&base), Duration::from_secs(5)).unwrap();

    let res = gateway::route(&upstream, "Kapan Dr. Budi praktik?").await;
    assert_eq!(res.intent, "doctor's availability search by its name");
    assert_eq!(res.response, FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_end_to_end_general_query() {
    let base = spawn_server(handlers::router(capability_state(Box::new(MockLlm)))).await;
    let upstream = HttpUpstream::new(ServiceUrls::single(&base), Duration::from_secs(5)).unwrap();

    let res = gateway::route(&upstream, "halo").await;
    assert_eq!(res.intent, "general query");
    assert_eq!(res.response, "Halo! Saya AI Customer Service Rumah Sakit.");
}

#[tokio::test]
async fn test_end_to_end_unreachable_classifier() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let upstream = HttpUpstream::new(
        ServiceUrls::single(&format!("http://{addr}")),
        Duration::from_secs(5),
    )
    .unwrap();

    let res = gateway::route(&upstream, "halo").await;
    assert_eq!(res.intent, "error");
    assert_eq!(res.response, FAILURE_MESSAGE);
}
