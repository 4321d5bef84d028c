use serde::{Deserialize, Deserializer, Serialize};

use super::Intent;

// Substituted by the gateway when a capability omits a field.
pub const DEFAULT_DOCTOR_NAME: &str = "Nama Dokter tidak diketahui.";
pub const DEFAULT_SPECIALTY: &str = "Spesialisasi tidak ditemukan.";
pub const DEFAULT_AVAILABILITY: &str = "";
pub const DEFAULT_ANSWER: &str = "Maaf, saya tidak bisa menjawab pertanyaan Anda.";

// ── Capability service responses ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorNameResponse {
    pub doctor: String,
    pub availability: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDiseaseResponse {
    pub doctor_name: String,
    pub availability: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialtyResponse {
    pub specialty: String,
    pub availability: String,
}

/// Free-text answer returned by the RAG and general-query services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub response: String,
}

// ── Gateway-side views ──
//
// Every field is optional and decoded on its own: a missing or non-string
// field reads as absent without affecting its siblings. Accessors fall back
// to the defaults above.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamePayload {
    #[serde(default, deserialize_with = "text_field")]
    pub doctor: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub availability: Option<String>,
}

impl NamePayload {
    pub fn doctor(&self) -> &str {
        self.doctor.as_deref().unwrap_or(DEFAULT_DOCTOR_NAME)
    }

    pub fn availability(&self) -> &str {
        self.availability.as_deref().unwrap_or(DEFAULT_AVAILABILITY)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiseasePayload {
    #[serde(default, deserialize_with = "text_field")]
    pub doctor_name: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub availability: Option<String>,
}

impl DiseasePayload {
    pub fn doctor_name(&self) -> &str {
        self.doctor_name.as_deref().unwrap_or(DEFAULT_DOCTOR_NAME)
    }

    pub fn availability(&self) -> &str {
        self.availability.as_deref().unwrap_or(DEFAULT_AVAILABILITY)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecialtyPayload {
    #[serde(default, deserialize_with = "text_field")]
    pub specialty: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub availability: Option<String>,
}

impl SpecialtyPayload {
    pub fn specialty(&self) -> &str {
        self.specialty.as_deref().unwrap_or(DEFAULT_SPECIALTY)
    }

    pub fn availability(&self) -> &str {
        self.availability.as_deref().unwrap_or(DEFAULT_AVAILABILITY)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerPayload {
    #[serde(default, deserialize_with = "text_field")]
    pub response: Option<String>,
}

impl AnswerPayload {
    pub fn response(&self) -> &str {
        self.response.as_deref().unwrap_or(DEFAULT_ANSWER)
    }
}

/// One capability's reply, as seen by the gateway.
#[derive(Debug, Clone)]
pub enum CapabilityResponse {
    DoctorByName(NamePayload),
    DoctorByDisease(DiseasePayload),
    DoctorBySpecialty(SpecialtyPayload),
    Answer(AnswerPayload),
}

impl CapabilityResponse {
    /// Decodes a capability body for the intent that produced it.
    ///
    /// Bodies whose fields are absent or of the wrong type decode to the
    /// default-filled payload. Returns `None` for intents with no capability.
    pub fn decode(intent: Intent, body: serde_json::Value) -> Option<Self> {
        let decoded = match intent {
            Intent::DoctorByName => CapabilityResponse::DoctorByName(lenient(body)),
            Intent::DoctorByDisease => CapabilityResponse::DoctorByDisease(lenient(body)),
            Intent::DoctorBySpecialty => CapabilityResponse::DoctorBySpecialty(lenient(body)),
            Intent::GeneralQuery | Intent::HealthTipQuery => {
                CapabilityResponse::Answer(lenient(body))
            }
            Intent::Unanswerable => return None,
        };
        Some(decoded)
    }
}

/// Only a body that is not a JSON object (a bare string or number) falls
/// back wholesale.
fn lenient<T: for<'de> Deserialize<'de> + Default>(body: serde_json::Value) -> T {
    serde_json::from_value(body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "capability response has the wrong shape, using defaults");
        T::default()
    })
}

fn text_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(str::to_owned)))
}
