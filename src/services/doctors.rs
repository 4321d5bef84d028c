use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    DiseaseMapping, Doctor, DoctorDiseaseResponse, DoctorNameResponse, SpecialtyResponse,
};
use crate::services::ai::{ask, LlmProvider};
use crate::services::fuzzy::{
    levenshtein, normalized_similarity, DISEASE_MATCH_THRESHOLD, SPECIALTY_MAX_DISTANCE,
};

/// Specializations the hospital recognizes, in resolution priority order.
pub const SPECIALTIES: [&str; 20] = [
    "Kardiolog",
    "Neurolog",
    "Dermatolog",
    "Pediater",
    "Ortopedi",
    "Praktisi Umum",
    "Androlog",
    "Endokrin",
    "Ahli Bedah",
    "Obstetri",
    "Onkologi",
    "Psikiater",
    "Ahli Pencernaan",
    "Pulmonologi",
    "Reumatologi",
    "Nephrologi",
    "Spesialis THT",
    "Ahli Alergi",
    "Fisioterapis",
    "Chiropractor",
];

const NAME_EXTRACTION_PROMPT: &str = r#"Please extract the doctor name from the user's query.

- The user query may be in Bahasa Indonesia, please handle that.
- If you only got the name add "Dr." in front of the name.
- Only provide with format Dr. <name>, nothing else.
- Don't explain anything just return the doctor's name with above format.
"#;

const SPECIALTY_EXTRACTION_PROMPT: &str = r#"Please extract the specialty from the user's query.

- The user query may be in Bahasa Indonesia, please handle that.
- Provide only the specialty name, nothing else (one word only).
- Some specialty names are two words (e.g. Praktisi Umum, Ahli Bedah, Ahli Pencernaan, Spesialis THT). You can return two words if included in these specialties.
- "Praktisi" and "Spesialis" are also known as "Dokter".
- "Ahli" can also refer to "Dokter" (e.g. Ahli Bedah is also known as Dokter Bedah, Ahli Pencernaan is also known as Dokter Pencernaan).
- Don't translate it to English.
- Capitalize the first letter.
"#;

const DISEASE_EXTRACTION_PROMPT: &str = r#"Please extract the disease or symptom mentioned in the user's query.

- If the user query is in Bahasa Indonesia, handle it accordingly.
- Provide only the disease or symptom as it is (don't translate to English), nothing else.
- Use proper capitalization for the extracted disease or symptom.
"#;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("{0}")]
    NotIdentified(String),

    #[error("{0}")]
    NotFound(String),

    #[error("language model error: {0:#}")]
    Llm(anyhow::Error),

    #[error("database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotIdentified(msg) => AppError::BadRequest(msg),
            LookupError::NotFound(msg) => AppError::NotFound(msg),
            LookupError::Llm(e) => AppError::from_llm(e),
            LookupError::Database(e) => AppError::Internal(format!("{e:#}")),
        }
    }
}

fn lock(db: &Mutex<Connection>) -> anyhow::Result<MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))
}

// ── By name ──

/// Looks up a doctor's schedule by the exact name the model extracts.
pub async fn availability_by_name(
    llm: &dyn LlmProvider,
    db: &Mutex<Connection>,
    query: &str,
) -> Result<DoctorNameResponse, LookupError> {
    let doctor_name = ask(llm, NAME_EXTRACTION_PROMPT, query)
        .await
        .map_err(LookupError::Llm)?;
    tracing::info!(doctor = %doctor_name, "extracted doctor name");

    let conn = lock(db)?;
    let doctor = queries::find_doctor_by_name(&conn, &doctor_name)?
        .ok_or_else(|| LookupError::NotFound("Dokter tidak ditemukan.".to_string()))?;

    let schedule = queries::get_schedule(&conn, doctor.id)?;
    if schedule.is_empty() {
        return Err(LookupError::NotFound(
            "Jadwal dokter tidak bisa ditemukan.".to_string(),
        ));
    }

    let availability: String = schedule
        .iter()
        .map(|entry| format!("{}\n", entry.to_line()))
        .collect();

    Ok(DoctorNameResponse {
        doctor: doctor_name,
        availability,
    })
}

// ── By specialty ──

pub async fn availability_by_specialty(
    llm: &dyn LlmProvider,
    db: &Mutex<Connection>,
    query: &str,
) -> Result<SpecialtyResponse, LookupError> {
    let extracted = ask(llm, SPECIALTY_EXTRACTION_PROMPT, query)
        .await
        .map_err(LookupError::Llm)?;

    let specialty = match_specialty(&extracted).ok_or_else(|| {
        LookupError::NotIdentified(
            "Spesialisasi tidak dapat diidentifikasi dari query.".to_string(),
        )
    })?;
    tracing::info!(extracted = %extracted, specialty, "resolved specialty");

    let conn = lock(db)?;
    let doctors = queries::get_doctors_by_specialization(&conn, specialty)?;
    if doctors.is_empty() {
        return Err(LookupError::NotFound(format!(
            "Tidak ditemukan dokter dengan spesialisasi {specialty}."
        )));
    }

    let availability = render_doctor_schedules(&conn, &doctors, "\n\n")?;

    Ok(SpecialtyResponse {
        specialty: specialty.to_string(),
        availability,
    })
}

/// Resolves a free-text specialty term against [`SPECIALTIES`].
///
/// A case-insensitive substring hit wins outright (first in list order);
/// otherwise the nearest specialty by edit distance is accepted only within
/// [`SPECIALTY_MAX_DISTANCE`].
pub fn match_specialty(term: &str) -> Option<&'static str> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return None;
    }

    if let Some(hit) = SPECIALTIES
        .iter()
        .find(|s| s.to_lowercase().contains(&term))
    {
        return Some(*hit);
    }

    SPECIALTIES
        .iter()
        .map(|s| (*s, levenshtein(&term, &s.to_lowercase())))
        .min_by_key(|(_, distance)| *distance)
        .filter(|(_, distance)| *distance <= SPECIALTY_MAX_DISTANCE)
        .map(|(s, _)| s)
}

// ── By disease ──

pub async fn availability_by_disease(
    llm: &dyn LlmProvider,
    db: &Mutex<Connection>,
    query: &str,
) -> Result<DoctorDiseaseResponse, LookupError> {
    let extracted = ask(llm, DISEASE_EXTRACTION_PROMPT, query)
        .await
        .map_err(LookupError::Llm)?;
    if extracted.is_empty() {
        return Err(LookupError::NotIdentified(
            "Gejala atau penyakit tidak dapat diidentifikasi.".to_string(),
        ));
    }

    let conn = lock(db)?;
    let mappings = queries::list_disease_mappings(&conn)?;
    let specialization = match_disease(&extracted, &mappings).ok_or_else(|| {
        LookupError::NotIdentified(
            "Gejala atau penyakit tersebut tidak ditemukan dalam database.".to_string(),
        )
    })?;
    tracing::info!(extracted = %extracted, specialization, "mapped disease to specialization");

    let doctors = queries::get_doctors_by_specialization(&conn, specialization)?;
    let Some(first) = doctors.first() else {
        return Err(LookupError::NotFound(
            "Tidak ditemukan dokter untuk spesialisasi tersebut.".to_string(),
        ));
    };

    let mut availability = format!("Jadwal dokter dengan spesialisasi {specialization}:");
    availability.push_str(&render_doctor_schedules(&conn, &doctors, "\n")?);

    Ok(DoctorDiseaseResponse {
        doctor_name: first.name.clone(),
        availability,
    })
}

/// Specialization of the reference entry most similar to `term`, if its
/// similarity reaches [`DISEASE_MATCH_THRESHOLD`]. Ties keep the earlier entry.
pub fn match_disease<'a>(term: &str, mappings: &'a [DiseaseMapping]) -> Option<&'a str> {
    let term = term.to_lowercase();
    let mut best: Option<(&'a str, f64)> = None;

    for mapping in mappings {
        let score = normalized_similarity(&term, &mapping.disease_or_symptom.to_lowercase());
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((mapping.specialization.as_str(), score));
        }
    }

    best.filter(|(_, score)| *score >= DISEASE_MATCH_THRESHOLD)
        .map(|(specialization, _)| specialization)
}

// ── Rendering ──

fn render_doctor_schedules(
    conn: &Connection,
    doctors: &[Doctor],
    separator: &str,
) -> anyhow::Result<String> {
    let mut text = String::new();
    for doctor in doctors {
        let schedule = queries::get_schedule(conn, doctor.id)?;
        if schedule.is_empty() {
            text.push_str(&format!(
                "{separator}Dokter {} tidak memiliki jadwal yang tersedia.",
                doctor.name
            ));
            continue;
        }

        text.push_str(&format!("{separator}Dokter: {}", doctor.name));
        for entry in &schedule {
            text.push('\n');
            text.push_str(&entry.to_line());
        }
    }
    Ok(text)
}
