use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub day: String,
    pub time_start: String,
    pub time_end: String,
}

impl ScheduleEntry {
    pub fn to_line(&self) -> String {
        format!(
            "Hari: {}, Pukul: {} - {}",
            self.day, self.time_start, self.time_end
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiseaseMapping {
    pub disease_or_symptom: String,
    pub specialization: String,
}
