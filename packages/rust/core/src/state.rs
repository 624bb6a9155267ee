//! Pipeline state: the mutable-by-merge container threaded through stages.
//!
//! Each field is written by exactly one stage. An unwritten field reads as
//! `None` — an explicit "absent" sentinel, distinct from "computed as
//! empty". Stage outputs are applied through [`StateUpdate`] with a
//! replace-if-absent merge rule: writing a field that is already set is
//! rejected, so concurrent writers can never interleave partial updates.

use payscope_shared::{Benchmark, Estimate, PayscopeError, Profile, Result, SearchHit};

/// The named fields of [`PipelineState`] a stage may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Profile,
    Queries,
    SearchHits,
    Benchmarks,
    Estimate,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Profile => "profile",
            Self::Queries => "queries",
            Self::SearchHits => "search_hits",
            Self::Benchmarks => "benchmarks",
            Self::Estimate => "estimate",
        };
        write!(f, "{s}")
    }
}

/// A single field write produced by a stage.
#[derive(Debug, Clone)]
pub enum FieldWrite {
    Profile(Profile),
    Queries(Vec<String>),
    SearchHits(Vec<SearchHit>),
    Benchmarks(Vec<Benchmark>),
    Estimate(Estimate),
}

impl FieldWrite {
    /// Which state field this write targets.
    pub fn field(&self) -> Field {
        match self {
            Self::Profile(_) => Field::Profile,
            Self::Queries(_) => Field::Queries,
            Self::SearchHits(_) => Field::SearchHits,
            Self::Benchmarks(_) => Field::Benchmarks,
            Self::Estimate(_) => Field::Estimate,
        }
    }
}

/// The partial update a stage returns: zero or more whole-field writes.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    writes: Vec<FieldWrite>,
}

impl StateUpdate {
    /// An update that writes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An update carrying a single field write.
    pub fn single(write: FieldWrite) -> Self {
        Self {
            writes: vec![write],
        }
    }

    /// The writes in this update, in order.
    pub fn writes(&self) -> &[FieldWrite] {
        &self.writes
    }
}

/// The aggregate state carried through one estimation run.
///
/// Not shared across concurrent runs. `raw_input` is set at construction;
/// every other field starts absent and is filled by its producing stage.
#[derive(Debug, Clone)]
pub struct PipelineState {
    /// Raw free-text profile input.
    pub raw_input: String,
    /// Extracted profile (stage: parse_profile).
    pub profile: Option<Profile>,
    /// Ordered search queries (stage: generate_queries).
    pub queries: Option<Vec<String>>,
    /// Web evidence (stage: search_web).
    pub search_hits: Option<Vec<SearchHit>>,
    /// Knowledge-base matches (stage: lookup_kb).
    pub benchmarks: Option<Vec<Benchmark>>,
    /// Final artifact (stage: analyze_salary).
    pub estimate: Option<Estimate>,
}

impl PipelineState {
    /// Fresh state for a run over `raw_input`.
    pub fn new(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            profile: None,
            queries: None,
            search_hits: None,
            benchmarks: None,
            estimate: None,
        }
    }

    /// Whether `field` has been written.
    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Profile => self.profile.is_some(),
            Field::Queries => self.queries.is_some(),
            Field::SearchHits => self.search_hits.is_some(),
            Field::Benchmarks => self.benchmarks.is_some(),
            Field::Estimate => self.estimate.is_some(),
        }
    }

    /// Merge a stage's update into this state.
    ///
    /// Replace-if-absent: each write lands only if its target field is
    /// still absent; a second write to the same field is a topology
    /// violation, not a silent overwrite.
    pub fn apply(&mut self, update: StateUpdate) -> Result<()> {
        for write in update.writes {
            if self.is_set(write.field()) {
                return Err(PayscopeError::Topology(format!(
                    "field '{}' written more than once",
                    write.field()
                )));
            }
            match write {
                FieldWrite::Profile(v) => self.profile = Some(v),
                FieldWrite::Queries(v) => self.queries = Some(v),
                FieldWrite::SearchHits(v) => self.search_hits = Some(v),
                FieldWrite::Benchmarks(v) => self.benchmarks = Some(v),
                FieldWrite::Estimate(v) => self.estimate = Some(v),
            }
        }
        Ok(())
    }
}
