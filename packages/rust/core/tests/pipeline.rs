//! End-to-end pipeline runs over in-memory collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use payscope_core::{GraphOptions, build_graph};
use payscope_index::{IndexRecord, SimilarityIndex};
use payscope_inference::{Inference, SalaryAnalysis};
use payscope_search::{RawHit, SearchProvider};
use payscope_shared::{
    Benchmark, CompanyTier, ConfidenceLevel, INTERNAL_KB_SOURCE, PayscopeError, Profile, Result,
    Seniority,
};

// ---------------------------------------------------------------------------
// In-memory collaborators
// ---------------------------------------------------------------------------

struct ScriptedInference {
    profile: Profile,
    queries: Vec<String>,
    analysis: Result<SalaryAnalysis>,
}

#[async_trait]
impl Inference for ScriptedInference {
    async fn extract_profile(&self, _text: &str) -> Result<Profile> {
        Ok(self.profile.clone())
    }

    async fn generate_queries(&self, _profile: &Profile) -> Result<Vec<String>> {
        Ok(self.queries.clone())
    }

    async fn synthesize(&self, _p: &Profile, _b: &str, _w: &str) -> Result<SalaryAnalysis> {
        match &self.analysis {
            Ok(a) => Ok(a.clone()),
            Err(e) => Err(PayscopeError::Inference(e.to_string())),
        }
    }
}

struct ScriptedSearch {
    by_query: HashMap<String, Vec<RawHit>>,
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, _count: u32) -> Result<Vec<RawHit>> {
        Ok(self.by_query.get(query).cloned().unwrap_or_default())
    }
}

struct MemoryIndex {
    records: std::sync::Mutex<Vec<IndexRecord>>,
}

impl MemoryIndex {
    fn new() -> Self {
        Self {
            records: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SimilarityIndex for MemoryIndex {
    async fn query(&self, _text: &str, top_k: u32) -> Result<Vec<IndexRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().take(top_k as usize).cloned().collect())
    }

    async fn add(&self, records: &[IndexRecord]) -> Result<()> {
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn senior_sf_profile() -> Profile {
    Profile {
        title: "Senior Software Engineer".into(),
        company: "Google".into(),
        company_tier: CompanyTier::Faang,
        years_of_experience: 7.0,
        location: "San Francisco".into(),
        skills: vec!["Go".into(), "Kubernetes".into()],
        education: "MS Computer Science".into(),
        industry: "Technology".into(),
        seniority: Seniority::Senior,
    }
}

fn sf_benchmark() -> Benchmark {
    Benchmark {
        role: "Senior Software Engineer".into(),
        location: "San Francisco".into(),
        company_tier: CompanyTier::Faang,
        years_of_experience_min: 5,
        years_of_experience_max: 9,
        salary_min: 250_000,
        salary_max: 420_000,
        salary_median: 340_000,
        currency: "USD".into(),
        source: INTERNAL_KB_SOURCE.into(),
        year: 2024,
    }
}

fn good_analysis() -> SalaryAnalysis {
    SalaryAnalysis {
        salary_min: 280_000,
        salary_max: 420_000,
        salary_median: 340_000,
        confidence_score: 0.85,
        confidence_level: ConfidenceLevel::High,
        reasoning: "Benchmark and role data align.".into(),
        adjustments: vec!["+20% for FAANG tier".into()],
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn benchmark_only_run_counts_one_data_point() {
    // One matching benchmark, no web evidence.
    let inference = Arc::new(ScriptedInference {
        profile: senior_sf_profile(),
        queries: vec!["senior software engineer salary san francisco".into()],
        analysis: Ok(good_analysis()),
    });
    let search = Arc::new(ScriptedSearch {
        by_query: HashMap::new(),
    });
    let index = Arc::new(MemoryIndex::new());

    let graph = build_graph(
        inference,
        search,
        index,
        vec![sf_benchmark()],
        &GraphOptions::default(),
    )
    .expect("graph");

    let state = graph
        .run("Senior SWE at Google, 7 years, San Francisco")
        .await
        .expect("run");
    let estimate = state.estimate.expect("estimate");

    assert_eq!(estimate.confidence.data_points, 1);
    assert_eq!(estimate.sources, vec![INTERNAL_KB_SOURCE]);
    assert!(estimate.salary_estimate.is_ordered());
}

#[tokio::test]
async fn web_only_run_counts_extracted_figures() {
    // No benchmark matches, three hits with five distinct figures
    // across two domains.
    let year = Utc::now().year();
    let query = "engineer salary".to_string();
    let hits = vec![
        RawHit {
            title: "Engineer salary report".into(),
            snippet: format!("Total comp $180,000 - $220,000 per year, {year}"),
            link: "https://www.levels.fyi/t/engineer".into(),
        },
        RawHit {
            title: "Pay data".into(),
            snippet: "Base salary around $150,000, senior roles near $250,000.".into(),
            link: "https://www.glassdoor.com/Salaries".into(),
        },
        RawHit {
            title: "Compensation survey".into(),
            snippet: "Median total compensation reached $200k last year.".into(),
            link: "https://www.levels.fyi/2025".into(),
        },
    ];

    let inference = Arc::new(ScriptedInference {
        profile: senior_sf_profile(),
        queries: vec![query.clone()],
        analysis: Ok(good_analysis()),
    });
    let search = Arc::new(ScriptedSearch {
        by_query: HashMap::from([(query, hits)]),
    });
    let index = Arc::new(MemoryIndex::new());

    let graph = build_graph(inference, search, index, vec![], &GraphOptions::default())
        .expect("graph");

    let state = graph.run("profile text").await.expect("run");
    let estimate = state.estimate.expect("estimate");

    // 180k, 220k, 150k, 250k, 200k.
    assert_eq!(estimate.confidence.data_points, 5);
    assert_eq!(estimate.sources.len(), 2);
    assert!(estimate.sources.contains(&"www.levels.fyi".to_string()));
    assert!(estimate.sources.contains(&"www.glassdoor.com".to_string()));
    assert!(!estimate.sources.contains(&INTERNAL_KB_SOURCE.to_string()));
}

#[tokio::test]
async fn hit_extraction_and_scoring_end_to_end() {
    let year = Utc::now().year();
    let query = "total comp".to_string();
    let hits = vec![RawHit {
        title: "Engineer pay".into(),
        snippet: format!("Total comp $180,000 - $220,000 per year, {year}"),
        link: "https://example.com/article".into(),
    }];

    let inference = Arc::new(ScriptedInference {
        profile: senior_sf_profile(),
        queries: vec![query.clone()],
        analysis: Ok(good_analysis()),
    });
    let search = Arc::new(ScriptedSearch {
        by_query: HashMap::from([(query, hits)]),
    });
    let index = Arc::new(MemoryIndex::new());

    let graph = build_graph(inference, search, index, vec![], &GraphOptions::default())
        .expect("graph");

    let state = graph.run("profile text").await.expect("run");
    let hits = state.search_hits.expect("hits");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].salary_mentions, vec![180_000, 220_000]);
    // Base 0.5 + keyword 0.15 + recent year 0.1 + dollar figure 0.05;
    // example.com is not a trusted domain.
    assert!((hits[0].relevance_score - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn synthesis_failure_never_yields_an_estimate() {
    let inference = Arc::new(ScriptedInference {
        profile: senior_sf_profile(),
        queries: vec!["q".into()],
        analysis: Err(PayscopeError::Inference("model unavailable".into())),
    });
    let search = Arc::new(ScriptedSearch {
        by_query: HashMap::new(),
    });
    let index = Arc::new(MemoryIndex::new());

    let graph = build_graph(
        inference,
        search,
        index,
        vec![sf_benchmark()],
        &GraphOptions::default(),
    )
    .expect("graph");

    let failure = graph.run("profile text").await.unwrap_err();
    assert_eq!(failure.stage, "analyze_salary");
    assert!(failure.state.estimate.is_none());
    // Everything upstream completed before the failure.
    assert!(failure.state.profile.is_some());
    assert!(failure.state.search_hits.is_some());
    assert!(failure.state.benchmarks.is_some());
}
