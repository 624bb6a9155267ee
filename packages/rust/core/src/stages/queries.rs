//! generate_queries: profile in, ordered web search queries out.

use std::sync::Arc;

use async_trait::async_trait;
use payscope_inference::Inference;
use payscope_shared::{PayscopeError, Result};
use tracing::{debug, info};

use crate::graph::Stage;
use crate::state::{Field, FieldWrite, PipelineState, StateUpdate};

/// Generates targeted salary-search queries via the inference service.
pub struct QueryStage {
    inference: Arc<dyn Inference>,
    max_queries: usize,
}

impl QueryStage {
    pub fn new(inference: Arc<dyn Inference>, max_queries: usize) -> Self {
        Self {
            inference,
            max_queries,
        }
    }
}

#[async_trait]
impl Stage for QueryStage {
    fn name(&self) -> &'static str {
        "generate_queries"
    }

    fn writes(&self) -> &'static [Field] {
        &[Field::Queries]
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        let profile = state.profile.as_ref().ok_or_else(|| {
            PayscopeError::precondition(self.name(), "no profile in state")
        })?;

        let mut queries = self.inference.generate_queries(profile).await?;

        if queries.is_empty() {
            return Err(PayscopeError::Inference(
                "query generation returned no queries".into(),
            ));
        }
        if queries.len() > self.max_queries {
            debug!(
                generated = queries.len(),
                kept = self.max_queries,
                "truncating query list"
            );
            queries.truncate(self.max_queries);
        }

        info!(count = queries.len(), "search queries generated");
        Ok(StateUpdate::single(FieldWrite::Queries(queries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payscope_inference::SalaryAnalysis;
    use payscope_shared::Profile;

    struct StubInference {
        queries: Vec<String>,
    }

    #[async_trait]
    impl Inference for StubInference {
        async fn extract_profile(&self, _text: &str) -> Result<Profile> {
            unimplemented!()
        }

        async fn generate_queries(&self, _profile: &Profile) -> Result<Vec<String>> {
            Ok(self.queries.clone())
        }

        async fn synthesize(&self, _p: &Profile, _b: &str, _w: &str) -> Result<SalaryAnalysis> {
            unimplemented!()
        }
    }

    fn state_with_profile() -> PipelineState {
        let mut state = PipelineState::new("raw");
        state
            .apply(StateUpdate::single(FieldWrite::Profile(Profile {
                title: "Engineer".into(),
                company: "Acme".into(),
                company_tier: Default::default(),
                years_of_experience: 4.0,
                location: "Austin".into(),
                skills: vec![],
                education: String::new(),
                industry: String::new(),
                seniority: Default::default(),
            })))
            .unwrap();
        state
    }

    #[tokio::test]
    async fn missing_profile_is_a_precondition_failure() {
        let stage = QueryStage::new(Arc::new(StubInference { queries: vec![] }), 5);
        let err = stage.run(&PipelineState::new("raw")).await.unwrap_err();
        assert!(matches!(err, PayscopeError::Precondition { .. }));
    }

    #[tokio::test]
    async fn empty_query_list_is_fatal() {
        let stage = QueryStage::new(Arc::new(StubInference { queries: vec![] }), 5);
        let err = stage.run(&state_with_profile()).await.unwrap_err();
        assert!(matches!(err, PayscopeError::Inference(_)));
    }

    #[tokio::test]
    async fn truncates_to_limit_preserving_order() {
        let queries: Vec<String> = (0..8).map(|i| format!("query {i}")).collect();
        let stage = QueryStage::new(Arc::new(StubInference { queries }), 5);
        let update = stage.run(&state_with_profile()).await.expect("run");

        let FieldWrite::Queries(kept) = &update.writes()[0] else {
            panic!("expected a queries write");
        };
        assert_eq!(kept.len(), 5);
        assert_eq!(kept[0], "query 0");
        assert_eq!(kept[4], "query 4");
    }
}
