//! Prover policy.

use crate::error::SearchError;
use crate::local_search::LocalSearchLimits;

/// Limits and chunk sizes for one proof run.
///
/// Every field is echoed into the proof log so a run can be reproduced from
/// its bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverPolicyV1 {
    /// Hard cap on arena nodes.
    pub arena_capacity: usize,
    /// Step rounds after initialization before the run is inconclusive.
    pub max_rounds: usize,
    /// Expansion passes during initialization, before the root-level cut.
    pub initial_expansions: usize,
    /// Candidates per oracle round trip during expansion.
    pub expansion_chunk_size: usize,
    /// Local-search ply budget per round.
    pub max_proof_steps: usize,
    /// Pool entries per strategy and oracle call within a ply.
    pub proof_chunk_size: usize,
    /// Local search aborts once its pool exceeds this size.
    pub pool_abort_threshold: usize,
    /// Propagation iteration cap per round.
    pub max_bound_iterations: usize,
}

impl ProverPolicyV1 {
    /// Pre-flight validation.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] naming the first zero field that
    /// must be positive.
    pub fn validate(&self) -> Result<(), SearchError> {
        let positive = [
            ("arena_capacity", self.arena_capacity),
            ("initial_expansions", self.initial_expansions),
            ("expansion_chunk_size", self.expansion_chunk_size),
            ("proof_chunk_size", self.proof_chunk_size),
            ("pool_abort_threshold", self.pool_abort_threshold),
            ("max_bound_iterations", self.max_bound_iterations),
        ];
        match positive.iter().find(|(_, v)| *v == 0) {
            Some((name, _)) => Err(SearchError::InvalidPolicy {
                detail: format!("{name} must be at least 1"),
            }),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn local_search_limits(&self) -> LocalSearchLimits {
        LocalSearchLimits {
            max_steps: self.max_proof_steps,
            chunk_size: self.proof_chunk_size,
            abort_threshold: self.pool_abort_threshold,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "arena_capacity": self.arena_capacity,
            "expansion_chunk_size": self.expansion_chunk_size,
            "initial_expansions": self.initial_expansions,
            "max_bound_iterations": self.max_bound_iterations,
            "max_proof_steps": self.max_proof_steps,
            "max_rounds": self.max_rounds,
            "pool_abort_threshold": self.pool_abort_threshold,
            "proof_chunk_size": self.proof_chunk_size,
            "schema_version": "prover_policy.v1",
        })
    }
}

impl Default for ProverPolicyV1 {
    fn default() -> Self {
        Self {
            arena_capacity: 500_000,
            max_rounds: 20,
            initial_expansions: 2,
            expansion_chunk_size: 1000,
            max_proof_steps: 1000,
            proof_chunk_size: 256,
            pool_abort_threshold: 100_000,
            max_bound_iterations: 100,
        }
    }
}
