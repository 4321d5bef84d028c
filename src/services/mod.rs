pub mod ai;
pub mod doctors;
pub mod fuzzy;
pub mod gateway;
pub mod general;
pub mod rag;
