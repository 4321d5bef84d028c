pub mod capability;
pub mod chat;
pub mod doctor;
pub mod intent;

pub use capability::{
    AnswerPayload, AnswerResponse, CapabilityResponse, DiseasePayload, DoctorDiseaseResponse,
    DoctorNameResponse, NamePayload, SpecialtyPayload, SpecialtyResponse,
};
pub use chat::{ChatResponse, QueryRequest, ERROR_INTENT};
pub use doctor::{DiseaseMapping, Doctor, ScheduleEntry};
pub use intent::{Intent, IntentResponse};
