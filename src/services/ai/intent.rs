use crate::models::Intent;
use crate::services::ai::{ask, LlmProvider};
use crate::services::fuzzy::{closest_match, INTENT_MATCH_CUTOFF};

pub const SYSTEM_PROMPT: &str = r#"You are an intent classifier for a hospital customer-service assistant.

Instruction:
- Classify as "General query" only if there is no medical term in the query.
- The user query may be in Bahasa Indonesia, please handle that. Only provide the intent name in English, nothing else.
- For "doctor's availability" intents (by its name, by specialization, or by disease) the keywords are "menemui" and "bertemu".
- For "Doctor's availability search by its specialization" the specialization may be in Bahasa Indonesia (e.g. Praktisi Umum, Ahli Bedah, Dokter Bedah, Ahli Pencernaan, Dokter Pencernaan, Spesialis THT, Ahli Alergi, etc).
- "THT" is a doctor's specialization (ENT in English), so "dokter tht" means "ENT doctor".
- If the user asks about diseases, health tips, or how to prevent a disease, the intent is "Asking about health tips and general disease."

Classify the user query into one of these intents:
- General query.
- Doctor's availability search by its name.
- Doctor's availability search by its specialization.
- Doctor's availability search by its disease.
- Asking about health tips and general disease.
- Unanswerable question.
"#;

/// Classifies `query`. Never fails: any provider error resolves to
/// [`Intent::Unanswerable`].
pub async fn classify(llm: &dyn LlmProvider, query: &str) -> Intent {
    match ask(llm, SYSTEM_PROMPT, query).await {
        Ok(raw) => {
            let intent = resolve_label(&raw);
            tracing::info!(raw = %raw, intent = intent.label(), "classified query");
            intent
        }
        Err(e) => {
            tracing::error!(error = %e, "intent classification failed, using fallback");
            Intent::Unanswerable
        }
    }
}

/// Maps raw model output onto the closest canonical label.
pub fn resolve_label(raw: &str) -> Intent {
    let normalized = raw.trim().to_lowercase();
    let labels = Intent::ALL.map(|i| i.label());

    closest_match(&normalized, &labels, INTENT_MATCH_CUTOFF)
        .and_then(Intent::from_label)
        .unwrap_or(Intent::Unanswerable)
}
