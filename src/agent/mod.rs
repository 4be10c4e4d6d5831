pub mod ai_model;
pub mod analysis_model;
pub mod analyzer;
pub mod autofill_model;
pub mod error;
pub mod orchestrator;
pub mod recovery;
