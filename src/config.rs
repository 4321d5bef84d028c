use std::env;
use std::time::Duration;

/// Which of the assistant's services this process serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceKind {
    Gateway,
    Intent,
    Rag,
    DoctorName,
    DoctorDisease,
    DoctorSpecialty,
    GeneralQuery,
    All,
}

impl ServiceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gateway" | "backend" => Some(ServiceKind::Gateway),
            "intent" => Some(ServiceKind::Intent),
            "rag" => Some(ServiceKind::Rag),
            "doctor-name" => Some(ServiceKind::DoctorName),
            "doctor-disease" => Some(ServiceKind::DoctorDisease),
            "doctor-specialty" => Some(ServiceKind::DoctorSpecialty),
            "general-query" => Some(ServiceKind::GeneralQuery),
            "all" => Some(ServiceKind::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Gateway => "gateway",
            ServiceKind::Intent => "intent",
            ServiceKind::Rag => "rag",
            ServiceKind::DoctorName => "doctor-name",
            ServiceKind::DoctorDisease => "doctor-disease",
            ServiceKind::DoctorSpecialty => "doctor-specialty",
            ServiceKind::GeneralQuery => "general-query",
            ServiceKind::All => "all",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ServiceKind::Gateway | ServiceKind::All => 8000,
            ServiceKind::Intent => 8001,
            ServiceKind::Rag => 8002,
            ServiceKind::DoctorName => 8003,
            ServiceKind::DoctorDisease => 8004,
            ServiceKind::DoctorSpecialty => 8005,
            ServiceKind::GeneralQuery => 8006,
        }
    }

    pub fn serves(&self, other: ServiceKind) -> bool {
        *self == ServiceKind::All || *self == other
    }

    pub fn uses_database(&self) -> bool {
        [
            ServiceKind::DoctorName,
            ServiceKind::DoctorDisease,
            ServiceKind::DoctorSpecialty,
        ]
        .into_iter()
        .any(|k| self.serves(k))
    }
}

/// Base URLs of the capability services the gateway calls.
#[derive(Clone, Debug)]
pub struct ServiceUrls {
    pub intent: String,
    pub rag: String,
    pub doctor_name: String,
    pub doctor_disease: String,
    pub doctor_specialty: String,
    pub general_query: String,
}

impl ServiceUrls {
    /// Every capability reachable at the same base URL, as in `SERVICE=all`.
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            intent: base.clone(),
            rag: base.clone(),
            doctor_name: base.clone(),
            doctor_disease: base.clone(),
            doctor_specialty: base.clone(),
            general_query: base,
        }
    }

    fn from_env(service: ServiceKind, port: u16) -> Self {
        let url = |var: &str, kind: ServiceKind| {
            env::var(var).unwrap_or_else(|_| {
                let port = if service == ServiceKind::All {
                    port
                } else {
                    kind.default_port()
                };
                format!("http://localhost:{port}")
            })
        };

        Self {
            intent: url("INTENT_URL", ServiceKind::Intent),
            rag: url("RAG_URL", ServiceKind::Rag),
            doctor_name: url("DOCTOR_NAME_URL", ServiceKind::DoctorName),
            doctor_disease: url("DOCTOR_DISEASE_URL", ServiceKind::DoctorDisease),
            doctor_specialty: url("DOCTOR_SPECIALTY_URL", ServiceKind::DoctorSpecialty),
            general_query: url("GENERAL_QUERY_URL", ServiceKind::GeneralQuery),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub service: ServiceKind,
    pub port: u16,
    pub database_url: String,
    pub docs_dir: String,
    pub llm_provider: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub llm_timeout: Duration,
    pub upstream_timeout: Duration,
    pub urls: ServiceUrls,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let service = match env::var("SERVICE") {
            Ok(raw) => ServiceKind::parse(&raw)
                .ok_or_else(|| anyhow::anyhow!("unknown SERVICE value: {raw}"))?,
            Err(_) => ServiceKind::All,
        };
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| service.default_port());

        Ok(Self {
            service,
            port,
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "doctors.db".to_string()),
            docs_dir: env::var("DOCS_DIR").unwrap_or_else(|_| "docs".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
            llm_timeout: secs_from_env("LLM_TIMEOUT_SECS", 180),
            upstream_timeout: secs_from_env("UPSTREAM_TIMEOUT_SECS", 180),
            urls: ServiceUrls::from_env(service, port),
        })
    }
}

fn secs_from_env(var: &str, default: u64) -> Duration {
    Duration::from_secs(
        env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}
