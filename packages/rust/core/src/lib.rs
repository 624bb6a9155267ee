//! Estimation pipeline core: state, stage graph, and the five stages.
//!
//! The crate wires the collaborator contracts (inference, search,
//! similarity index) into a fixed DAG and exposes [`build_graph`] as the
//! single composition point for the CLI and tests.

pub mod graph;
pub mod stages;
pub mod state;

use std::sync::Arc;

use payscope_index::SimilarityIndex;
use payscope_inference::Inference;
use payscope_search::SearchProvider;
use payscope_shared::{Benchmark, Result};

pub use graph::{RunFailure, Stage, StageGraph};
pub use state::{Field, FieldWrite, PipelineState, StateUpdate};

/// Tunable limits for graph construction.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Maximum search queries kept per run.
    pub max_queries: usize,
    /// Results requested per search query.
    pub results_per_query: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            max_queries: 5,
            results_per_query: 5,
        }
    }
}

/// Assemble the estimation pipeline from its collaborators.
pub fn build_graph(
    inference: Arc<dyn Inference>,
    provider: Arc<dyn SearchProvider>,
    index: Arc<dyn SimilarityIndex>,
    seed: Vec<Benchmark>,
    options: &GraphOptions,
) -> Result<StageGraph> {
    StageGraph::new(
        Arc::new(stages::ProfileStage::new(Arc::clone(&inference))),
        Arc::new(stages::QueryStage::new(
            Arc::clone(&inference),
            options.max_queries,
        )),
        Arc::new(stages::WebEvidenceStage::new(
            provider,
            options.results_per_query,
        )),
        Arc::new(stages::KbMatchStage::new(index, seed)),
        Arc::new(stages::SynthesisStage::new(inference)),
    )
}
