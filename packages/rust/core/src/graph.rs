//! Fixed-topology stage graph with one concurrent fan-out.
//!
//! The pipeline is a five-stage DAG: parse_profile → generate_queries →
//! {search_web ∥ lookup_kb} → analyze_salary. Topology is validated at
//! construction: the two concurrent stages must declare disjoint output
//! fields, so their updates can be merged at the join barrier without
//! any ordering ambiguity. Stage failures are fatal and surface as a
//! [`RunFailure`] carrying the failing stage's name and the state as it
//! stood when the run stopped.

use std::sync::Arc;

use async_trait::async_trait;
use payscope_shared::{PayscopeError, Result};
use tracing::{debug, info, instrument};

use crate::state::{Field, PipelineState, StateUpdate};

/// One unit of pipeline work.
///
/// A stage reads from the shared state and returns a [`StateUpdate`];
/// it never mutates the state directly. `writes()` declares every field
/// the stage may write, and the graph enforces the declaration.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable stage name used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// The state fields this stage may write.
    fn writes(&self) -> &'static [Field];

    /// Execute against a snapshot of the current state.
    async fn run(&self, state: &PipelineState) -> Result<StateUpdate>;
}

/// A failed run: which stage broke, why, and the state at that point.
///
/// The partial state lets callers report how far the run progressed
/// before aborting.
#[derive(Debug, thiserror::Error)]
#[error("stage '{stage}' failed: {error}")]
pub struct RunFailure {
    /// Name of the stage that failed.
    pub stage: &'static str,
    /// The underlying error.
    #[source]
    pub error: PayscopeError,
    /// State as of the failure, with all completed writes applied.
    pub state: PipelineState,
}

/// The estimation pipeline: four sequential steps with a concurrent
/// pair in the middle.
pub struct StageGraph {
    parse: Arc<dyn Stage>,
    queries: Arc<dyn Stage>,
    web: Arc<dyn Stage>,
    kb: Arc<dyn Stage>,
    synthesize: Arc<dyn Stage>,
}

impl StageGraph {
    /// Assemble the graph, rejecting topologies where the concurrent
    /// stages declare overlapping output fields.
    pub fn new(
        parse: Arc<dyn Stage>,
        queries: Arc<dyn Stage>,
        web: Arc<dyn Stage>,
        kb: Arc<dyn Stage>,
        synthesize: Arc<dyn Stage>,
    ) -> Result<Self> {
        for field in web.writes() {
            if kb.writes().contains(field) {
                return Err(PayscopeError::Topology(format!(
                    "concurrent stages '{}' and '{}' both declare output field '{field}'",
                    web.name(),
                    kb.name()
                )));
            }
        }
        Ok(Self {
            parse,
            queries,
            web,
            kb,
            synthesize,
        })
    }

    /// Run the full pipeline over `raw_input`.
    ///
    /// Any stage error aborts the run; downstream stages do not execute.
    /// When one concurrent stage fails, the join barrier still waits for
    /// its sibling before aborting, and the sibling's completed write is
    /// kept in the returned partial state.
    #[instrument(skip_all)]
    pub async fn run(&self, raw_input: &str) -> std::result::Result<PipelineState, Box<RunFailure>> {
        let mut state = PipelineState::new(raw_input);

        for stage in [&self.parse, &self.queries] {
            state = run_sequential(stage.as_ref(), state).await?;
        }

        state = self.run_fan_out(state).await?;
        state = run_sequential(self.synthesize.as_ref(), state).await?;

        info!("pipeline run complete");
        Ok(state)
    }

    /// Execute the concurrent pair against a shared snapshot and merge
    /// both updates at the join barrier.
    async fn run_fan_out(
        &self,
        state: PipelineState,
    ) -> std::result::Result<PipelineState, Box<RunFailure>> {
        let snapshot = Arc::new(state);

        let web = Arc::clone(&self.web);
        let web_state = Arc::clone(&snapshot);
        let web_task =
            tokio::spawn(async move { checked_update(web.as_ref(), &web_state).await });

        let kb = Arc::clone(&self.kb);
        let kb_state = Arc::clone(&snapshot);
        let kb_task = tokio::spawn(async move { checked_update(kb.as_ref(), &kb_state).await });

        // Join barrier: both tasks finish before anything merges.
        let (web_joined, kb_joined) = tokio::join!(web_task, kb_task);

        let mut state = Arc::try_unwrap(snapshot).unwrap_or_else(|arc| (*arc).clone());

        let web_result = flatten_join(self.web.name(), web_joined);
        let kb_result = flatten_join(self.kb.name(), kb_joined);

        // Merge whatever completed, then report the first failure in a
        // fixed stage order so outcomes are deterministic.
        let mut failure: Option<(&'static str, PayscopeError)> = None;
        for (name, result) in [
            (self.web.name(), web_result),
            (self.kb.name(), kb_result),
        ] {
            match result {
                Ok(update) => {
                    if let Err(error) = state.apply(update) {
                        failure.get_or_insert((name, error));
                    }
                }
                Err(error) => {
                    failure.get_or_insert((name, error));
                }
            }
        }

        match failure {
            None => Ok(state),
            Some((stage, error)) => Err(Box::new(RunFailure {
                stage,
                error,
                state,
            })),
        }
    }
}

async fn run_sequential(
    stage: &dyn Stage,
    mut state: PipelineState,
) -> std::result::Result<PipelineState, Box<RunFailure>> {
    let update = match checked_update(stage, &state).await {
        Ok(update) => update,
        Err(error) => {
            return Err(Box::new(RunFailure {
                stage: stage.name(),
                error,
                state,
            }));
        }
    };
    if let Err(error) = state.apply(update) {
        return Err(Box::new(RunFailure {
            stage: stage.name(),
            error,
            state,
        }));
    }
    Ok(state)
}

/// Run a stage and verify its update stays within its declared fields.
async fn checked_update(stage: &dyn Stage, state: &PipelineState) -> Result<StateUpdate> {
    debug!(stage = stage.name(), "stage starting");
    let update = stage.run(state).await?;
    for write in update.writes() {
        if !stage.writes().contains(&write.field()) {
            return Err(PayscopeError::Topology(format!(
                "stage '{}' wrote undeclared field '{}'",
                stage.name(),
                write.field()
            )));
        }
    }
    debug!(
        stage = stage.name(),
        writes = update.writes().len(),
        "stage complete"
    );
    Ok(update)
}

fn flatten_join(
    stage: &'static str,
    joined: std::result::Result<Result<StateUpdate>, tokio::task::JoinError>,
) -> Result<StateUpdate> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(PayscopeError::Validation {
            message: format!("stage '{stage}' task aborted: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FieldWrite;
    use payscope_shared::{
        Confidence, ConfidenceLevel, Estimate, Profile, ProfileSummary, SalaryRange,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct FixedStage {
        name: &'static str,
        writes: &'static [Field],
        write: Option<FieldWrite>,
        fail: bool,
        delay: Duration,
        ran: Arc<AtomicBool>,
    }

    impl FixedStage {
        fn new(name: &'static str, writes: &'static [Field], write: Option<FieldWrite>) -> Self {
            Self {
                name,
                writes,
                write,
                fail: false,
                delay: Duration::ZERO,
                ran: Arc::new(AtomicBool::new(false)),
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl Stage for FixedStage {
        fn name(&self) -> &'static str {
            self.name
        }

        fn writes(&self) -> &'static [Field] {
            self.writes
        }

        async fn run(&self, _state: &PipelineState) -> Result<StateUpdate> {
            self.ran.store(true, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(PayscopeError::Search(format!("{} broke", self.name)));
            }
            Ok(match &self.write {
                Some(write) => StateUpdate::single(write.clone()),
                None => StateUpdate::empty(),
            })
        }
    }

    fn profile_write() -> FieldWrite {
        FieldWrite::Profile(Profile {
            title: "Engineer".into(),
            company: "Acme".into(),
            company_tier: Default::default(),
            years_of_experience: 4.0,
            location: "Austin".into(),
            skills: vec![],
            education: String::new(),
            industry: String::new(),
            seniority: Default::default(),
        })
    }

    fn estimate_write() -> FieldWrite {
        FieldWrite::Estimate(Estimate {
            profile_summary: ProfileSummary {
                title: "Engineer".into(),
                company: "Acme".into(),
                years_of_experience: 4.0,
                location: "Austin".into(),
            },
            salary_estimate: SalaryRange {
                currency: "USD".into(),
                min: 100_000,
                max: 160_000,
                median: 130_000,
            },
            confidence: Confidence {
                score: 0.6,
                level: ConfidenceLevel::Medium,
                data_points: 3,
                factors: vec![],
            },
            reasoning: "test".into(),
            sources: vec![],
            adjustments: vec![],
        })
    }

    fn graph_with(
        web: FixedStage,
        kb: FixedStage,
        synthesize: FixedStage,
    ) -> (Result<StageGraph>, Arc<AtomicBool>) {
        let synth_ran = Arc::clone(&synthesize.ran);
        let graph = StageGraph::new(
            Arc::new(FixedStage::new(
                "parse_profile",
                &[Field::Profile],
                Some(profile_write()),
            )),
            Arc::new(FixedStage::new(
                "generate_queries",
                &[Field::Queries],
                Some(FieldWrite::Queries(vec!["q1".into()])),
            )),
            Arc::new(web),
            Arc::new(kb),
            Arc::new(synthesize),
        );
        (graph, synth_ran)
    }

    #[test]
    fn rejects_overlapping_concurrent_outputs() {
        let (graph, _) = graph_with(
            FixedStage::new("search_web", &[Field::SearchHits], None),
            FixedStage::new("lookup_kb", &[Field::SearchHits], None),
            FixedStage::new("analyze_salary", &[Field::Estimate], Some(estimate_write())),
        );
        let err = graph.err().expect("overlap must be rejected");
        assert!(matches!(err, PayscopeError::Topology(_)));
        assert!(err.to_string().contains("search_hits"));
    }

    #[tokio::test]
    async fn full_run_merges_both_concurrent_writes() {
        let (graph, _) = graph_with(
            FixedStage::new(
                "search_web",
                &[Field::SearchHits],
                Some(FieldWrite::SearchHits(vec![])),
            ),
            FixedStage::new(
                "lookup_kb",
                &[Field::Benchmarks],
                Some(FieldWrite::Benchmarks(vec![])),
            ),
            FixedStage::new("analyze_salary", &[Field::Estimate], Some(estimate_write())),
        );
        let state = graph.unwrap().run("raw profile text").await.expect("run");

        assert!(state.profile.is_some());
        assert!(state.queries.is_some());
        assert!(state.search_hits.is_some());
        assert!(state.benchmarks.is_some());
        assert!(state.estimate.is_some());
    }

    #[tokio::test]
    async fn concurrent_failure_aborts_before_synthesis() {
        let (graph, synth_ran) = graph_with(
            FixedStage::new("search_web", &[Field::SearchHits], None).failing(),
            FixedStage::new(
                "lookup_kb",
                &[Field::Benchmarks],
                Some(FieldWrite::Benchmarks(vec![])),
            )
            .delayed(Duration::from_millis(20)),
            FixedStage::new("analyze_salary", &[Field::Estimate], Some(estimate_write())),
        );
        let failure = graph.unwrap().run("raw").await.unwrap_err();

        assert_eq!(failure.stage, "search_web");
        // The sibling still finished and its write is in the partial state.
        assert!(failure.state.benchmarks.is_some());
        assert!(failure.state.estimate.is_none());
        assert!(!synth_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn web_failure_wins_when_both_fail() {
        let (graph, _) = graph_with(
            FixedStage::new("search_web", &[Field::SearchHits], None).failing(),
            FixedStage::new("lookup_kb", &[Field::Benchmarks], None).failing(),
            FixedStage::new("analyze_salary", &[Field::Estimate], Some(estimate_write())),
        );
        let failure = graph.unwrap().run("raw").await.unwrap_err();
        assert_eq!(failure.stage, "search_web");
    }

    #[tokio::test]
    async fn sequential_failure_carries_partial_state() {
        let graph = StageGraph::new(
            Arc::new(FixedStage::new(
                "parse_profile",
                &[Field::Profile],
                Some(profile_write()),
            )),
            Arc::new(FixedStage::new("generate_queries", &[Field::Queries], None).failing()),
            Arc::new(FixedStage::new("search_web", &[Field::SearchHits], None)),
            Arc::new(FixedStage::new("lookup_kb", &[Field::Benchmarks], None)),
            Arc::new(FixedStage::new(
                "analyze_salary",
                &[Field::Estimate],
                Some(estimate_write()),
            )),
        )
        .unwrap();

        let failure = graph.run("raw").await.unwrap_err();
        assert_eq!(failure.stage, "generate_queries");
        assert!(failure.state.profile.is_some());
        assert!(failure.state.queries.is_none());
    }

    #[tokio::test]
    async fn undeclared_write_is_a_topology_error() {
        let graph = StageGraph::new(
            Arc::new(FixedStage::new(
                "parse_profile",
                &[Field::Profile],
                // Declares profile but writes queries.
                Some(FieldWrite::Queries(vec!["q".into()])),
            )),
            Arc::new(FixedStage::new("generate_queries", &[Field::Queries], None)),
            Arc::new(FixedStage::new("search_web", &[Field::SearchHits], None)),
            Arc::new(FixedStage::new("lookup_kb", &[Field::Benchmarks], None)),
            Arc::new(FixedStage::new(
                "analyze_salary",
                &[Field::Estimate],
                Some(estimate_write()),
            )),
        )
        .unwrap();

        let failure = graph.run("raw").await.unwrap_err();
        assert_eq!(failure.stage, "parse_profile");
        assert!(matches!(failure.error, PayscopeError::Topology(_)));
    }
}
