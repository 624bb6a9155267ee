//! search_web: run the generated queries and distill salary evidence.
//!
//! Each raw result is turned into a [`SearchHit`] with extracted salary
//! figures and a deterministic relevance score. A failed query is logged
//! and skipped; only the provider being completely unusable would leave
//! the hit list empty, which downstream handles as missing evidence.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use payscope_search::{RawHit, SearchProvider};
use payscope_shared::{PayscopeError, Result, SearchHit};
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use crate::graph::Stage;
use crate::state::{Field, FieldWrite, PipelineState, StateUpdate};

/// Salary figure patterns, most specific first. Each match is then
/// scanned for its numeric groups.
static SALARY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\$[\d,]+(?:\s*-\s*\$[\d,]+)?(?:\s*(?:per\s+)?(?:year|yr|annually|/yr))?",
        r"(?i)[\d,]+k\s*-\s*[\d,]+k",
        r"(?i)\$[\d,]+k",
        r"(?i)(?:salary|compensation|pay|total\s+comp)[:\s]*\$?[\d,]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d,]+").expect("static pattern"));

static DOLLAR_FIGURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[\d,]+").expect("static pattern"));

/// Domains whose results get a relevance boost.
const TRUSTED_DOMAINS: &[&str] = &["levels.fyi", "glassdoor", "indeed", "payscale", "linkedin"];

const SALARY_KEYWORDS: &[&str] = &[
    "salary",
    "compensation",
    "pay",
    "wage",
    "earning",
    "total comp",
];

/// Only figures in this band count as plausible annual salaries.
const PLAUSIBLE_SALARY: std::ops::RangeInclusive<u64> = 30_000..=2_000_000;

/// Maximum hits kept after ranking.
const MAX_HITS: usize = 15;
/// Below this count, duplicate sources are still admitted.
const DIVERSITY_THRESHOLD: usize = 5;

/// Gathers and ranks web salary evidence for the generated queries.
pub struct WebEvidenceStage {
    provider: Arc<dyn SearchProvider>,
    results_per_query: u32,
}

impl WebEvidenceStage {
    pub fn new(provider: Arc<dyn SearchProvider>, results_per_query: u32) -> Self {
        Self {
            provider,
            results_per_query,
        }
    }
}

#[async_trait]
impl Stage for WebEvidenceStage {
    fn name(&self) -> &'static str {
        "search_web"
    }

    fn writes(&self) -> &'static [Field] {
        &[Field::SearchHits]
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        let queries = state.queries.as_ref().ok_or_else(|| {
            PayscopeError::precondition(self.name(), "no queries in state")
        })?;

        let mut all_hits = Vec::new();
        for query in queries {
            let raw = match self.provider.search(query, self.results_per_query).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(%query, error = %e, "search query failed, skipping");
                    continue;
                }
            };
            all_hits.extend(raw.iter().map(|hit| process_hit(query, hit)));
        }

        let hits = select_hits(all_hits);
        info!(count = hits.len(), "web evidence gathered");
        Ok(StateUpdate::single(FieldWrite::SearchHits(hits)))
    }
}

/// Turn a raw result into a scored hit with extracted salary figures.
fn process_hit(query: &str, raw: &RawHit) -> SearchHit {
    let source = domain_of(&raw.link);
    let salary_mentions = extract_salary_figures(&format!("{} {}", raw.title, raw.snippet));
    let relevance_score = relevance_score(&raw.title, &raw.snippet, &source);

    SearchHit {
        query: query.to_string(),
        source,
        title: raw.title.clone(),
        snippet: raw.snippet.clone(),
        salary_mentions,
        relevance_score,
    }
}

/// Registrable host of a link, or the raw link when it does not parse.
fn domain_of(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| link.to_lowercase())
}

/// Extract distinct plausible salary figures from text, ascending.
///
/// A `k` suffix scales values below 1000 (so "150k" reads as 150,000
/// but "$150,000k" stays as written).
pub(crate) fn extract_salary_figures(text: &str) -> Vec<u64> {
    let mut figures = BTreeSet::new();

    for pattern in SALARY_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let matched = m.as_str();
            let has_k = matched.to_lowercase().contains('k');
            for num in NUMBER_RE.find_iter(matched) {
                let Ok(mut value) = num.as_str().replace(',', "").parse::<u64>() else {
                    continue;
                };
                if has_k && value < 1000 {
                    value *= 1000;
                }
                if PLAUSIBLE_SALARY.contains(&value) {
                    figures.insert(value);
                }
            }
        }
    }

    figures.into_iter().collect()
}

/// Deterministic relevance score in [0.5, 1.0].
pub(crate) fn relevance_score(title: &str, snippet: &str, source: &str) -> f64 {
    let mut score: f64 = 0.5;

    if TRUSTED_DOMAINS.iter().any(|d| source.contains(d)) {
        score += 0.2;
    }

    let title_lower = title.to_lowercase();
    let snippet_lower = snippet.to_lowercase();
    if SALARY_KEYWORDS
        .iter()
        .any(|kw| title_lower.contains(kw) || snippet_lower.contains(kw))
    {
        score += 0.15;
    }

    let year = Utc::now().year();
    if snippet.contains(&year.to_string()) || snippet.contains(&(year - 1).to_string()) {
        score += 0.1;
    }

    if DOLLAR_FIGURE_RE.is_match(snippet) {
        score += 0.05;
    }

    score.min(1.0)
}

/// Rank hits by relevance and keep up to [`MAX_HITS`], preferring
/// source diversity once [`DIVERSITY_THRESHOLD`] hits are kept.
pub(crate) fn select_hits(mut hits: Vec<SearchHit>) -> Vec<SearchHit> {
    // Stable sort: equal scores keep query order.
    hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

    let mut seen_sources = HashSet::new();
    let mut selected = Vec::new();
    for hit in hits {
        if selected.len() >= MAX_HITS {
            break;
        }
        if !seen_sources.contains(&hit.source) || selected.len() < DIVERSITY_THRESHOLD {
            seen_sources.insert(hit.source.clone());
            selected.push(hit);
        }
    }
    selected
}
