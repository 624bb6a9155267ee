//! parse_profile: free text in, structured [`Profile`] out.

use std::sync::Arc;

use async_trait::async_trait;
use payscope_inference::Inference;
use payscope_shared::{PayscopeError, Result};
use tracing::info;

use crate::graph::Stage;
use crate::state::{Field, FieldWrite, PipelineState, StateUpdate};

/// Extracts structured profile attributes via the inference service.
pub struct ProfileStage {
    inference: Arc<dyn Inference>,
}

impl ProfileStage {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self { inference }
    }
}

#[async_trait]
impl Stage for ProfileStage {
    fn name(&self) -> &'static str {
        "parse_profile"
    }

    fn writes(&self) -> &'static [Field] {
        &[Field::Profile]
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate> {
        let raw = state.raw_input.trim();
        if raw.is_empty() {
            return Err(PayscopeError::precondition(
                self.name(),
                "profile text is empty",
            ));
        }

        let profile = self.inference.extract_profile(raw).await?;

        if profile.years_of_experience < 0.0 {
            return Err(PayscopeError::Inference(format!(
                "extracted years_of_experience is negative: {}",
                profile.years_of_experience
            )));
        }

        info!(summary = %profile.summary_line(), "profile extracted");
        Ok(StateUpdate::single(FieldWrite::Profile(profile)))
    }
}
