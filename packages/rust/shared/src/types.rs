//! Evidence record model shared by all pipeline stages.
//!
//! [`Profile`], [`Benchmark`], [`SearchHit`], and [`Estimate`] are the
//! immutable value types threaded through the pipeline state. Benchmarks
//! are loaded once into the similarity index and never mutated by a run.

use serde::{Deserialize, Serialize};

/// Provenance tag for benchmark records from the seed dataset.
pub const INTERNAL_KB_SOURCE: &str = "internal_kb";

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Company tier classification extracted from the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyTier {
    Faang,
    Tier1,
    Tier2,
    Startup,
    #[default]
    Unknown,
}

impl std::fmt::Display for CompanyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Faang => "faang",
            Self::Tier1 => "tier1",
            Self::Tier2 => "tier2",
            Self::Startup => "startup",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Seniority level extracted from the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Entry,
    #[default]
    Mid,
    Senior,
    Staff,
    Principal,
    Executive,
}

impl std::fmt::Display for Seniority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Entry => "entry",
            Self::Mid => "mid",
            Self::Senior => "senior",
            Self::Staff => "staff",
            Self::Principal => "principal",
            Self::Executive => "executive",
        };
        write!(f, "{s}")
    }
}

/// Structured attributes extracted from free-text profile input.
///
/// Created once per run by the extraction stage; immutable afterward.
/// Invariant: `years_of_experience >= 0` (checked at extraction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Current job title/role.
    pub title: String,
    /// Current company name.
    #[serde(default)]
    pub company: String,
    /// Company tier classification.
    #[serde(default)]
    pub company_tier: CompanyTier,
    /// Total years of professional experience.
    pub years_of_experience: f64,
    /// Work location (city, state/country).
    #[serde(default)]
    pub location: String,
    /// Key technical or professional skills, most relevant first.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Highest education level or notable degree.
    #[serde(default)]
    pub education: String,
    /// Industry sector.
    #[serde(default)]
    pub industry: String,
    /// Seniority level.
    #[serde(default)]
    pub seniority: Seniority,
}

impl Profile {
    /// One-line human-readable summary, used in logs and prompt context.
    pub fn summary_line(&self) -> String {
        let mut parts = vec![self.title.clone()];
        if !self.company.is_empty() {
            parts.push(format!("at {}", self.company));
        }
        if !self.location.is_empty() {
            parts.push(format!("in {}", self.location));
        }
        parts.push(format!(
            "with {:.0} years experience",
            self.years_of_experience
        ));
        parts.join(" ")
    }

    /// Skills capped for prompt context, comma-joined.
    pub fn skills_brief(&self) -> String {
        if self.skills.is_empty() {
            return "N/A".into();
        }
        self.skills
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// Benchmark
// ---------------------------------------------------------------------------

/// An internal salary benchmark record from the seed dataset.
///
/// Invariant: `salary_min <= salary_median <= salary_max` and
/// `years_of_experience_min <= years_of_experience_max` in well-formed
/// seed data. Read-only after index population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benchmark {
    /// Job role/title.
    pub role: String,
    /// Location.
    pub location: String,
    /// Company tier.
    #[serde(default)]
    pub company_tier: CompanyTier,
    #[serde(default)]
    pub years_of_experience_min: u32,
    #[serde(default = "default_yoe_max")]
    pub years_of_experience_max: u32,
    /// Minimum salary in range.
    pub salary_min: u64,
    /// Maximum salary in range.
    pub salary_max: u64,
    /// Median salary.
    pub salary_median: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Provenance tag.
    #[serde(default = "default_source")]
    pub source: String,
    /// Data year.
    #[serde(default = "default_year")]
    pub year: i32,
}

fn default_yoe_max() -> u32 {
    30
}
fn default_currency() -> String {
    "USD".into()
}
fn default_source() -> String {
    INTERNAL_KB_SOURCE.into()
}
fn default_year() -> i32 {
    2024
}

impl Benchmark {
    /// Searchable document text stored alongside the record in the
    /// similarity index.
    pub fn document(&self) -> String {
        format!(
            "{} {} {} {}-{} years",
            self.role,
            self.location,
            self.company_tier,
            self.years_of_experience_min,
            self.years_of_experience_max
        )
    }
}

// ---------------------------------------------------------------------------
// SearchHit
// ---------------------------------------------------------------------------

/// One processed web-search result with extracted salary evidence.
///
/// Created per run, discarded after the run. The relevance score is
/// deterministic given (title, snippet, link, query).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The search query that produced this hit.
    pub query: String,
    /// Source website/domain.
    pub source: String,
    /// Result title.
    pub title: String,
    /// Result snippet/description.
    pub snippet: String,
    /// Distinct salary figures found in the hit, ascending.
    #[serde(default)]
    pub salary_mentions: Vec<u64>,
    /// Relevance score in [0, 1].
    pub relevance_score: f64,
}

// ---------------------------------------------------------------------------
// Estimate
// ---------------------------------------------------------------------------

/// Estimated salary range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryRange {
    /// Currency code.
    pub currency: String,
    /// Minimum salary estimate.
    pub min: u64,
    /// Maximum salary estimate.
    pub max: u64,
    /// Median/expected salary.
    pub median: u64,
}

impl SalaryRange {
    /// Whether `min <= median <= max` holds.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.median && self.median <= self.max
    }
}

/// Confidence band for the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{s}")
    }
}

/// Confidence information for the estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confidence {
    /// Confidence score in [0, 1].
    pub score: f64,
    /// Confidence level band.
    pub level: ConfidenceLevel,
    /// Number of quantitative data points supporting the estimate
    /// (benchmark matches + extracted salary figures).
    pub data_points: usize,
    /// Qualitative factors affecting confidence.
    #[serde(default)]
    pub factors: Vec<String>,
}

/// Subset of profile fields echoed back in the final artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub title: String,
    pub company: String,
    pub years_of_experience: f64,
    pub location: String,
}

/// The final synthesized estimation artifact.
///
/// Produced exactly once per run at the terminal stage. Invariant:
/// `salary_estimate.min <= median <= max`. This serialized shape is the
/// sole consumption contract for the CLI and any UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimate {
    pub profile_summary: ProfileSummary,
    pub salary_estimate: SalaryRange,
    pub confidence: Confidence,
    /// Explanation of the estimation logic.
    pub reasoning: String,
    /// Data sources used (`internal_kb` and/or web domains).
    pub sources: Vec<String>,
    /// Adjustments applied to the base salary.
    #[serde(default)]
    pub adjustments: Vec<String>,
}
