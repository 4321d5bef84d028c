//! Intent-driven routing of chat queries to capability services.
//!
//! One chat turn is at most two upstream hops: classify, then one capability
//! call. Every outcome, including upstream failure, becomes a [`ChatResponse`].

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use crate::config::ServiceUrls;
use crate::models::{
    CapabilityResponse, ChatResponse, Intent, IntentResponse, QueryRequest, ERROR_INTENT,
};

/// Apology returned whenever an upstream hop fails.
pub const FAILURE_MESSAGE: &str = "Sedang terjadi kesalahan.";

/// Reply for labels that are neither dispatchable nor canned.
pub const UNEXPECTED_INTENT_MESSAGE: &str = "Unexpected intent detected.";

/// Replies for labels that are recognized but have no capability behind them.
const CANNED_REPLIES: &[(&str, &str)] = &[(
    "unanswerable question",
    "Maaf, saya tidak bisa menjawab pertanyaan ini.",
)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ClassifyIntent,
    Rag,
    DoctorByName,
    DoctorByDisease,
    DoctorBySpecialty,
    GeneralQuery,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::ClassifyIntent => "/classify-intent",
            Endpoint::Rag => "/rag",
            Endpoint::DoctorByName => "/doctor-availability-by-name",
            Endpoint::DoctorByDisease => "/doctor-availability-by-disease",
            Endpoint::DoctorBySpecialty => "/doctor-availability-by-specialty",
            Endpoint::GeneralQuery => "/general-query",
        }
    }

    /// Capability that serves `intent`, if any.
    pub fn for_intent(intent: Intent) -> Option<Self> {
        match intent {
            Intent::HealthTipQuery => Some(Endpoint::Rag),
            Intent::DoctorByName => Some(Endpoint::DoctorByName),
            Intent::DoctorByDisease => Some(Endpoint::DoctorByDisease),
            Intent::DoctorBySpecialty => Some(Endpoint::DoctorBySpecialty),
            Intent::GeneralQuery => Some(Endpoint::GeneralQuery),
            Intent::Unanswerable => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

/// One POST of `{query}` to a capability service.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn post_query(
        &self,
        endpoint: Endpoint,
        query: &str,
    ) -> Result<serde_json::Value, UpstreamError>;
}

pub struct HttpUpstream {
    urls: ServiceUrls,
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(urls: ServiceUrls, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build upstream HTTP client")?;
        Ok(Self { urls, client })
    }

    fn base_url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::ClassifyIntent => &self.urls.intent,
            Endpoint::Rag => &self.urls.rag,
            Endpoint::DoctorByName => &self.urls.doctor_name,
            Endpoint::DoctorByDisease => &self.urls.doctor_disease,
            Endpoint::DoctorBySpecialty => &self.urls.doctor_specialty,
            Endpoint::GeneralQuery => &self.urls.general_query,
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn post_query(
        &self,
        endpoint: Endpoint,
        query: &str,
    ) -> Result<serde_json::Value, UpstreamError> {
        let url = format!(
            "{}{}",
            self.base_url(endpoint).trim_end_matches('/'),
            endpoint.path()
        );

        let resp = self
            .client
            .post(&url)
            .json(&QueryRequest {
                query: query.to_string(),
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))
    }
}

/// Handles one chat turn end to end.
pub async fn route(upstream: &dyn Upstream, query: &str) -> ChatResponse {
    let query = query.trim();
    if query.is_empty() {
        return canned(Intent::Unanswerable.label());
    }

    let label = match classify(upstream, query).await {
        Ok(label) => label,
        Err(e) => {
            tracing::error!(error = %e, "intent classification failed");
            return ChatResponse::with_label(ERROR_INTENT, FAILURE_MESSAGE);
        }
    };
    tracing::info!(intent = %label, "detected intent");

    let Some(intent) = Intent::from_label(&label) else {
        return canned(&label);
    };
    let Some(endpoint) = Endpoint::for_intent(intent) else {
        return canned(&label);
    };

    match upstream.post_query(endpoint, query).await {
        Ok(body) => match CapabilityResponse::decode(intent, body) {
            Some(decoded) => ChatResponse::new(intent, render(&decoded)),
            None => canned(&label),
        },
        Err(e) => {
            tracing::error!(error = %e, endpoint = endpoint.path(), "capability call failed");
            ChatResponse::new(intent, FAILURE_MESSAGE)
        }
    }
}

async fn classify(upstream: &dyn Upstream, query: &str) -> Result<String, UpstreamError> {
    let body = upstream.post_query(Endpoint::ClassifyIntent, query).await?;
    let parsed: IntentResponse =
        serde_json::from_value(body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
    Ok(parsed.intent)
}

fn canned(label: &str) -> ChatResponse {
    let reply = CANNED_REPLIES
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, reply)| *reply)
        .unwrap_or_else(|| {
            tracing::warn!(intent = %label, "unexpected intent");
            UNEXPECTED_INTENT_MESSAGE
        });
    ChatResponse::with_label(label, reply)
}

/// Renders a capability reply into the user-facing text.
pub fn render(response: &CapabilityResponse) -> String {
    match response {
        CapabilityResponse::DoctorByName(p) => {
            if p.availability().trim().is_empty() {
                format!("{} tidak memiliki jadwal tersedia.", p.doctor())
            } else {
                format!("Jadwal {}:\n\n{}", p.doctor(), p.availability())
            }
        }
        CapabilityResponse::DoctorByDisease(p) => {
            if p.availability().trim().is_empty() {
                format!("{} tidak memiliki jadwal tersedia..", p.doctor_name())
            } else {
                format!("Jadwal {}:\n\n{}", p.doctor_name(), p.availability())
            }
        }
        CapabilityResponse::DoctorBySpecialty(p) => {
            if p.availability().trim().is_empty() {
                format!("Tidak ada dokter dengan sepsialisasi: {}.", p.specialty())
            } else {
                format!(
                    "Jadwal dokter dengan spesialisasi {}:\n\n{}",
                    p.specialty(),
                    p.availability()
                )
            }
        }
        CapabilityResponse::Answer(p) => p.response().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capability::{DEFAULT_ANSWER, DEFAULT_DOCTOR_NAME};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Reply = Result<serde_json::Value, u16>;

    /// Scripted upstream: one canned reply per endpoint, every call recorded.
    struct ScriptedUpstream {
        replies: HashMap<&'static str, Reply>,
        calls: Mutex<Vec<Endpoint>>,
    }

    impl ScriptedUpstream {
        fn new(replies: Vec<(Endpoint, Reply)>) -> Self {
            Self {
                replies: replies.into_iter().map(|(e, r)| (e.path(), r)).collect(),
                calls: Mutex::new(vec![]),
            }
        }

        fn classifying(label: &str) -> Self {
            Self::new(vec![(Endpoint::ClassifyIntent, Ok(json!({ "intent": label })))])
        }

        fn with(mut self, endpoint: Endpoint, reply: Reply) -> Self {
            self.replies.insert(endpoint.path(), reply);
            self
        }

        fn calls(&self) -> Vec<Endpoint> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn post_query(
            &self,
            endpoint: Endpoint,
            _query: &str,
        ) -> Result<serde_json::Value, UpstreamError> {
            self.calls.lock().unwrap().push(endpoint);
            match self.replies.get(endpoint.path()) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(UpstreamError::Status {
                    status: *status,
                    body: "boom".to_string(),
                }),
                None => Err(UpstreamError::Malformed("no scripted reply".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_classifier_failure_is_error_intent() {
        let upstream = ScriptedUpstream::new(vec![(Endpoint::ClassifyIntent, Err(500))]);
        let res = route(&upstream, "halo").await;
        assert_eq!(res.intent, "error");
        assert_eq!(res.response, FAILURE_MESSAGE);
        assert_eq!(upstream.calls(), vec![Endpoint::ClassifyIntent]);
    }

    #[tokio::test]
    async fn test_classifier_body_without_intent_is_error_intent() {
        let upstream =
            ScriptedUpstream::new(vec![(Endpoint::ClassifyIntent, Ok(json!({"label": "x"})))]);
        let res = route(&upstream, "halo").await;
        assert_eq!(res.intent, "error");
    }

    #[tokio::test]
    async fn test_capability_failure_keeps_classified_intent() {
        let upstream = ScriptedUpstream::classifying(Intent::DoctorByName.label())
            .with(Endpoint::DoctorByName, Err(404));
        let res = route(&upstream, "jadwal dr. budi").await;
        assert_eq!(res.intent, Intent::DoctorByName.label());
        assert_eq!(res.response, FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_dispatches_to_exactly_one_capability() {
        let upstream = ScriptedUpstream::classifying(Intent::HealthTipQuery.label())
            .with(Endpoint::Rag, Ok(json!({"response": "Cuci tangan."})));
        let res = route(&upstream, "cara mencegah flu").await;
        assert_eq!(res.response, "Cuci tangan.");
        assert_eq!(upstream.calls(), vec![Endpoint::ClassifyIntent, Endpoint::Rag]);
    }

    #[tokio::test]
    async fn test_unanswerable_uses_canned_reply_without_dispatch() {
        let upstream = ScriptedUpstream::classifying("unanswerable question");
        let res = route(&upstream, "siapa presiden mars?").await;
        assert_eq!(res.intent, "unanswerable question");
        assert_eq!(res.response, "Maaf, saya tidak bisa menjawab pertanyaan ini.");
        assert_eq!(upstream.calls(), vec![Endpoint::ClassifyIntent]);
    }

    #[tokio::test]
    async fn test_unknown_label_is_unexpected_intent() {
        let upstream = ScriptedUpstream::classifying("book a taxi");
        let res = route(&upstream, "pesan taksi").await;
        assert_eq!(res.intent, "book a taxi");
        assert_eq!(res.response, UNEXPECTED_INTENT_MESSAGE);
        assert_eq!(upstream.calls(), vec![Endpoint::ClassifyIntent]);
    }

    #[tokio::test]
    async fn test_blank_query_skips_upstream() {
        let upstream = ScriptedUpstream::new(vec![]);
        let res = route(&upstream, "   ").await;
        assert_eq!(res.intent, "unanswerable question");
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_text_is_embedded_verbatim() {
        let availability = "Hari: Senin, Pukul: 08:00 - 10:00";
        let upstream = ScriptedUpstream::classifying(Intent::DoctorByName.label()).with(
            Endpoint::DoctorByName,
            Ok(json!({"doctor": "Dr. Budi", "availability": availability})),
        );
        let res = route(&upstream, "jadwal dr. budi").await;
        assert_eq!(res.response, format!("Jadwal Dr. Budi:\n\n{availability}"));
    }

    #[tokio::test]
    async fn test_general_query_missing_response_uses_default() {
        let upstream = ScriptedUpstream::classifying(Intent::GeneralQuery.label())
            .with(Endpoint::GeneralQuery, Ok(json!({})));
        let res = route(&upstream, "halo").await;
        assert_eq!(res.intent, "general query");
        assert_eq!(res.response, DEFAULT_ANSWER);
    }

    #[test]
    fn test_render_blank_availability() {
        let by_name = CapabilityResponse::decode(
            Intent::DoctorByName,
            json!({"doctor": "Dr. Budi", "availability": "  \n"}),
        )
        .unwrap();
        assert_eq!(render(&by_name), "Dr. Budi tidak memiliki jadwal tersedia.");

        let by_disease = CapabilityResponse::decode(Intent::DoctorByDisease, json!({})).unwrap();
        assert_eq!(
            render(&by_disease),
            format!("{DEFAULT_DOCTOR_NAME} tidak memiliki jadwal tersedia..")
        );

        let by_specialty = CapabilityResponse::decode(
            Intent::DoctorBySpecialty,
            json!({"specialty": "Spesialis THT", "availability": ""}),
        )
        .unwrap();
        assert_eq!(
            render(&by_specialty),
            "Tidak ada dokter dengan sepsialisasi: Spesialis THT."
        );
    }

    #[test]
    fn test_render_specialty_schedule() {
        let decoded = CapabilityResponse::decode(
            Intent::DoctorBySpecialty,
            json!({"specialty": "Spesialis THT", "availability": "\n\nDokter: Dr. Sari"}),
        )
        .unwrap();
        assert_eq!(
            render(&decoded),
            "Jadwal dokter dengan spesialisasi Spesialis THT:\n\n\n\nDokter: Dr. Sari"
        );
    }

    #[test]
    fn test_every_dispatchable_intent_has_an_endpoint() {
        for intent in Intent::ALL {
            let canned = CANNED_REPLIES.iter().any(|(l, _)| *l == intent.label());
            assert!(Endpoint::for_intent(intent).is_some() != canned, "{intent:?}");
        }
    }
}
