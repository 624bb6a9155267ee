//! The five pipeline stages.

mod kb;
mod profile;
mod queries;
mod synthesis;
mod web;

pub use kb::KbMatchStage;
pub use profile::ProfileStage;
pub use queries::QueryStage;
pub use synthesis::SynthesisStage;
pub use web::WebEvidenceStage;
