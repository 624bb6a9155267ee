//! analyze_salary: synthesize the final estimate from all evidence.

use std::sync::Arc;

use async_trait::async_trait;
use payscope_inference::{Inference, SalaryAnalysis};
use payscope_shared::{
    Benchmark, Confidence, Estimate, INTERNAL_KB_SOURCE, PayscopeError, ProfileSummary, Result,
    SalaryRange, SearchHit,
};
use tracing::info;

use crate::graph::Stage;
use crate::state::{Field, FieldWrite, PipelineState, StateUpdate};

/// Hit summaries included in the synthesis prompt.
const MAX_BRIEF_HITS: usize = 10;
/// Distinct web domains listed in the artifact's sources.
const MAX_WEB_SOURCES: usize = 5;

/// Produces the final [`Estimate`] via the inference service.
pub struct SynthesisStage {
    inference: Arc<dyn Inference>,
}

impl SynthesisStage {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl Stage for SynthesisStage {
    fn name(&self) -> &'static str {
        "analyze_salary"
    }

    fn writes(&self) -> &'static [Field] {
        &[Field::Estimate]
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        let profile = state.profile.as_ref().ok_or_else(|| {
            PayscopeError::precondition(self.name(), "no profile in state")
        })?;

        let benchmarks = state.benchmarks.as_deref().unwrap_or_default();
        let hits = state.search_hits.as_deref().unwrap_or_default();

        let benchmark_brief = benchmark_brief(benchmarks);
        let web_brief = web_brief(hits);

        let analysis = self
            .inference
            .synthesize(profile, &benchmark_brief, &web_brief)
            .await?;
        validate_analysis(&analysis)?;

        let data_points =
            benchmarks.len() + hits.iter().map(|h| h.salary_mentions.len()).sum::<usize>();

        let estimate = Estimate {
            profile_summary: ProfileSummary {
                title: profile.title.clone(),
                company: profile.company.clone(),
                years_of_experience: profile.years_of_experience,
                location: profile.location.clone(),
            },
            salary_estimate: SalaryRange {
                currency: "USD".into(),
                min: analysis.salary_min,
                max: analysis.salary_max,
                median: analysis.salary_median,
            },
            confidence: Confidence {
                score: analysis.confidence_score,
                level: analysis.confidence_level,
                data_points,
                factors: analysis.adjustments.clone(),
            },
            reasoning: analysis.reasoning,
            sources: collect_sources(benchmarks, hits),
            adjustments: analysis.adjustments,
        };

        info!(
            median = estimate.salary_estimate.median,
            confidence = %estimate.confidence.level,
            data_points,
            "estimate synthesized"
        );
        Ok(StateUpdate::single(FieldWrite::Estimate(estimate)))
    }
}

/// Reject model output that violates the artifact invariants.
fn validate_analysis(analysis: &SalaryAnalysis) -> Result<()> {
    if analysis.salary_min > analysis.salary_median || analysis.salary_median > analysis.salary_max
    {
        return Err(PayscopeError::Inference(format!(
            "analysis range is not ordered: min {} median {} max {}",
            analysis.salary_min, analysis.salary_median, analysis.salary_max
        )));
    }
    if !(0.0..=1.0).contains(&analysis.confidence_score) {
        return Err(PayscopeError::Inference(format!(
            "confidence score {} is outside [0, 1]",
            analysis.confidence_score
        )));
    }
    Ok(())
}

/// Format benchmark matches for the synthesis prompt.
fn benchmark_brief(benchmarks: &[Benchmark]) -> String {
    if benchmarks.is_empty() {
        return "No internal benchmark data available.".into();
    }
    benchmarks
        .iter()
        .map(|b| {
            format!(
                "- {} at {} company in {}: ${}-${} (median: ${}) for {}-{} YOE",
                b.role,
                b.company_tier,
                b.location,
                group_thousands(b.salary_min),
                group_thousands(b.salary_max),
                group_thousands(b.salary_median),
                b.years_of_experience_min,
                b.years_of_experience_max
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the top search hits for the synthesis prompt.
fn web_brief(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No web search data available.".into();
    }
    hits.iter()
        .take(MAX_BRIEF_HITS)
        .map(|hit| {
            let salaries = if hit.salary_mentions.is_empty() {
                "no specific figures".to_string()
            } else {
                hit.salary_mentions
                    .iter()
                    .map(|s| format!("${}", group_thousands(*s)))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!(
                "- [{}] {}...\n  Salaries mentioned: {}\n  Snippet: {}...",
                hit.source,
                truncate_chars(&hit.title, 60),
                salaries,
                truncate_chars(&hit.snippet, 150)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Provenance list: the internal tag when benchmarks contributed, then
/// up to [`MAX_WEB_SOURCES`] distinct web domains in first-seen order.
fn collect_sources(benchmarks: &[Benchmark], hits: &[SearchHit]) -> Vec<String> {
    let mut sources = Vec::new();
    if !benchmarks.is_empty() {
        sources.push(INTERNAL_KB_SOURCE.to_string());
    }
    let mut web = Vec::new();
    for hit in hits {
        if web.len() >= MAX_WEB_SOURCES {
            break;
        }
        if !web.contains(&hit.source) {
            web.push(hit.source.clone());
        }
    }
    sources.extend(web);
    sources
}

/// Decimal digit grouping with commas ("1234567" -> "1,234,567").
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
