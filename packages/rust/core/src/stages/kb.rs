//! lookup_kb: match the profile against internal salary benchmarks.

use std::sync::Arc;

use async_trait::async_trait;
use payscope_index::{SimilarityIndex, populate_if_empty};
use payscope_shared::{Benchmark, Profile, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::graph::Stage;
use crate::state::{Field, FieldWrite, PipelineState, StateUpdate};

/// Candidates retrieved from the index per lookup.
const CANDIDATES: u32 = 10;
/// Matches kept after experience filtering.
const MAX_MATCHES: usize = 5;
/// A benchmark's experience band is widened by this margin on each side.
const YOE_MARGIN: f64 = 2.0;

/// Retrieves benchmark records similar to the extracted profile.
pub struct KbMatchStage {
    index: Arc<dyn SimilarityIndex>,
    seed: Vec<Benchmark>,
    seed_guard: Mutex<()>,
}

impl KbMatchStage {
    pub fn new(index: Arc<dyn SimilarityIndex>, seed: Vec<Benchmark>) -> Self {
        Self {
            index,
            seed,
            seed_guard: Mutex::new(()),
        }
    }

    /// Populate the index from the seed dataset on first use.
    async fn ensure_seeded(&self) -> Result<()> {
        let _guard = self.seed_guard.lock().await;
        populate_if_empty(self.index.as_ref(), &self.seed).await?;
        Ok(())
    }
}

#[async_trait]
impl Stage for KbMatchStage {
    fn name(&self) -> &'static str {
        "lookup_kb"
    }

    fn writes(&self) -> &'static [Field] {
        &[Field::Benchmarks]
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        // No profile means nothing to match against; an empty write
        // still marks the lookup as done.
        let Some(profile) = state.profile.as_ref() else {
            return Ok(StateUpdate::single(FieldWrite::Benchmarks(vec![])));
        };

        self.ensure_seeded().await?;

        let query = format!(
            "{} {} {}",
            profile.title, profile.location, profile.seniority
        );
        let records = self.index.query(&query, CANDIDATES).await?;

        let mut matches = Vec::new();
        for record in records {
            let benchmark: Benchmark = match serde_json::from_value(record.metadata.clone()) {
                Ok(b) => b,
                Err(e) => {
                    warn!(id = %record.id, error = %e, "skipping malformed benchmark record");
                    continue;
                }
            };
            if experience_matches(&benchmark, profile) {
                matches.push(benchmark);
            }
        }
        matches.truncate(MAX_MATCHES);

        info!(count = matches.len(), "benchmark matches found");
        Ok(StateUpdate::single(FieldWrite::Benchmarks(matches)))
    }
}

/// Whether the profile's experience falls within the benchmark's band,
/// widened by [`YOE_MARGIN`] years on each side (inclusive).
fn experience_matches(benchmark: &Benchmark, profile: &Profile) -> bool {
    let lo = f64::from(benchmark.years_of_experience_min) - YOE_MARGIN;
    let hi = f64::from(benchmark.years_of_experience_max) + YOE_MARGIN;
    profile.years_of_experience >= lo && profile.years_of_experience <= hi
}
