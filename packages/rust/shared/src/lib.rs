//! Shared types, errors, and configuration for Payscope.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, IndexConfig, InferenceConfig, LimitsConfig, SearchConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_inference_key,
};
pub use error::{PayscopeError, Result};
pub use types::{
    Benchmark, CompanyTier, Confidence, ConfidenceLevel, Estimate, INTERNAL_KB_SOURCE, Profile,
    ProfileSummary, SalaryRange, SearchHit, Seniority,
};
