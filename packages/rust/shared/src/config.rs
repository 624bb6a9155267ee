//! Application configuration for Payscope.
//!
//! User config lives at `~/.payscope/payscope.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file — only the names of the
//! environment variables that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PayscopeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "payscope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".payscope";

// ---------------------------------------------------------------------------
// Config structs (matching payscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inference service settings.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Web search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Similarity index settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Pipeline limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// `[inference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_inference_key_env")]
    pub api_key_env: String,

    /// Model to use for extraction, query generation, and synthesis.
    #[serde(default = "default_model")]
    pub model: String,

    /// Chat-completions API base URL.
    #[serde(default = "default_inference_base_url")]
    pub base_url: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_inference_key_env(),
            model: default_model(),
            base_url: default_inference_base_url(),
        }
    }
}

fn default_inference_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "google/gemini-2.0-flash-001".into()
}
fn default_inference_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Custom search engine identifier.
    #[serde(default)]
    pub engine_id: String,

    /// Search API base URL.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Results requested per query.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            engine_id: String::new(),
            base_url: default_search_base_url(),
            results_per_query: default_results_per_query(),
        }
    }
}

fn default_search_key_env() -> String {
    "GOOGLE_CSE_API_KEY".into()
}
fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_results_per_query() -> u32 {
    5
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Path to the benchmark index database.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Path to the seed dataset (JSON list of benchmark records).
    #[serde(default = "default_seed_path")]
    pub seed_path: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            seed_path: default_seed_path(),
        }
    }
}

fn default_db_path() -> String {
    "./data/benchmarks.db".into()
}
fn default_seed_path() -> String {
    "./data/salary_benchmarks.json".into()
}

/// `[limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum search queries generated per run.
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_queries: default_max_queries(),
        }
    }
}

fn default_max_queries() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.payscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PayscopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.payscope/payscope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PayscopeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PayscopeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PayscopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PayscopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PayscopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the inference API key env var is set and non-empty.
///
/// The search key is deliberately not validated here: a missing search
/// key degrades to empty web evidence, while a missing inference key
/// makes every run fail.
pub fn validate_inference_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.inference.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(PayscopeError::config(format!(
            "inference API key not found. Set the {var_name} environment variable."
        ))),
    }
}
