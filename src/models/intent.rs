use serde::{Deserialize, Serialize};

/// Closed set of intents the classifier may produce.
///
/// The serialized form is the English label the classifier prompt asks the
/// model for; the gateway and the intent service exchange these labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Intent {
    #[serde(rename = "general query")]
    GeneralQuery,
    #[serde(rename = "doctor's availability search by its name")]
    DoctorByName,
    #[serde(rename = "doctor's availability search by its specialization")]
    DoctorBySpecialty,
    #[serde(rename = "doctor's availability search by its disease")]
    DoctorByDisease,
    #[serde(rename = "asking about health tips and general disease")]
    HealthTipQuery,
    #[serde(rename = "unanswerable question")]
    Unanswerable,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::GeneralQuery,
        Intent::DoctorByName,
        Intent::DoctorBySpecialty,
        Intent::DoctorByDisease,
        Intent::HealthTipQuery,
        Intent::Unanswerable,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Intent::GeneralQuery => "general query",
            Intent::DoctorByName => "doctor's availability search by its name",
            Intent::DoctorBySpecialty => "doctor's availability search by its specialization",
            Intent::DoctorByDisease => "doctor's availability search by its disease",
            Intent::HealthTipQuery => "asking about health tips and general disease",
            Intent::Unanswerable => "unanswerable question",
        }
    }

    /// Exact label lookup. Approximate matching lives in the classifier.
    pub fn from_label(label: &str) -> Option<Self> {
        Intent::ALL.into_iter().find(|i| i.label() == label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    pub intent: String,
}
