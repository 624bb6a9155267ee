//! Inference service client for structured extraction and synthesis.
//!
//! [`Inference`] is the narrow collaborator contract the pipeline core
//! depends on. It directs model output into one of three typed shapes:
//! a [`Profile`], a 1–5 element query list, or a [`SalaryAnalysis`].
//! The service is treated as potentially slow and non-deterministic; a
//! failed call is fatal to the run (the pipeline has no heuristic
//! fallback), and no retry policy is applied here.

mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use payscope_shared::{ConfidenceLevel, PayscopeError, Profile, Result};

/// Typed synthesis result: the model's salary estimate before the
/// pipeline post-processes it into the final artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct SalaryAnalysis {
    /// Minimum estimated annual salary in USD.
    pub salary_min: u64,
    /// Maximum estimated annual salary in USD.
    pub salary_max: u64,
    /// Most likely/median annual salary in USD.
    pub salary_median: u64,
    /// Confidence score from 0.0 to 1.0.
    pub confidence_score: f64,
    /// Confidence band.
    pub confidence_level: ConfidenceLevel,
    /// 2-3 sentence explanation of the estimation logic.
    pub reasoning: String,
    /// Adjustments made (e.g., "+15% for SF location").
    #[serde(default)]
    pub adjustments: Vec<String>,
}

/// Narrow inference contract consumed by the pipeline stages.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Extract structured profile attributes from free text.
    async fn extract_profile(&self, profile_text: &str) -> Result<Profile>;

    /// Generate 1–5 web search queries for salary research.
    async fn generate_queries(&self, profile: &Profile) -> Result<Vec<String>>;

    /// Synthesize a salary estimate from the profile and evidence briefs.
    async fn synthesize(
        &self,
        profile: &Profile,
        benchmark_brief: &str,
        web_brief: &str,
    ) -> Result<SalaryAnalysis>;
}

// ---------------------------------------------------------------------------
// OpenRouter chat-completions client
// ---------------------------------------------------------------------------

/// Inference client over an OpenRouter-compatible chat-completions API.
pub struct OpenRouterInference {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterInference {
    /// Build a client against `base_url` (no trailing slash).
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Payscope/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PayscopeError::Inference(format!("client build: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// One structured inference call: send the prompt pair, parse the
    /// model's JSON reply into `T`.
    async fn infer<T: DeserializeOwned>(&self, system: &str, user: &str) -> Result<T> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PayscopeError::Inference(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PayscopeError::Inference(format!("HTTP {status}: {text}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PayscopeError::Inference(format!("invalid response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PayscopeError::Inference("response contained no choices".into()))?;

        debug!(bytes = content.len(), "inference reply received");

        let json = strip_code_fences(&content);
        serde_json::from_str(json).map_err(|e| {
            PayscopeError::Inference(format!("reply did not match expected shape: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

/// Intermediate shape for the query-generation call.
#[derive(Debug, Deserialize)]
struct SearchQueries {
    queries: Vec<String>,
}

#[async_trait]
impl Inference for OpenRouterInference {
    async fn extract_profile(&self, profile_text: &str) -> Result<Profile> {
        let user = format!("Extract structured information from this profile:\n\n{profile_text}");
        self.infer(prompts::PROFILE_EXTRACTION, &user).await
    }

    async fn generate_queries(&self, profile: &Profile) -> Result<Vec<String>> {
        let user = format!(
            "Generate search queries for this profile:\n\n\
             Title: {}\nCompany: {}\nCompany Tier: {}\nLocation: {}\n\
             Years of Experience: {}\nSeniority Level: {}\nSkills: {}\nIndustry: {}",
            profile.title,
            profile.company,
            profile.company_tier,
            profile.location,
            profile.years_of_experience,
            profile.seniority,
            profile.skills_brief(),
            if profile.industry.is_empty() {
                "Technology"
            } else {
                &profile.industry
            },
        );
        let result: SearchQueries = self.infer(prompts::QUERY_GENERATION, &user).await?;
        Ok(result.queries)
    }

    async fn synthesize(
        &self,
        profile: &Profile,
        benchmark_brief: &str,
        web_brief: &str,
    ) -> Result<SalaryAnalysis> {
        let user = format!(
            "Analyze and estimate salary for this profile:\n\n\
             ## Profile\n\
             - Title: {}\n- Company: {} ({})\n- Location: {}\n\
             - Years of Experience: {}\n- Seniority Level: {}\n- Skills: {}\n- Industry: {}\n\n\
             ## Internal Benchmark Data\n{}\n\n\
             ## Web Search Results\n{}\n\n\
             Please provide a salary range estimate with confidence score and reasoning.",
            profile.title,
            profile.company,
            profile.company_tier,
            profile.location,
            profile.years_of_experience,
            profile.seniority,
            profile.skills_brief(),
            if profile.industry.is_empty() {
                "Technology"
            } else {
                &profile.industry
            },
            benchmark_brief,
            web_brief,
        );
        self.infer(prompts::SALARY_ANALYSIS, &user).await
    }
}

/// Strip Markdown code fences some models wrap around JSON replies.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end_matches('`')
        .trim()
}
