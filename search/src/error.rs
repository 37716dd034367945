//! Typed prover errors.
//!
//! Fatal conditions only. The pool-threshold abort and the round cap are not
//! errors: they surface as [`crate::local_search::LocalSearchOutcome::Aborted`]
//! and [`crate::prover::ProofOutcome::Inconclusive`].

use certmin_kernel::choice::Choice;

use crate::arena::NodeIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Appending a batch would grow the arena past its capacity.
    CapacityExceeded { requested: usize, capacity: usize },
    /// An in-play node ended a propagation step with `lower > upper`.
    BoundCoherenceViolation {
        node: NodeIndex,
        lower: u64,
        upper: u64,
    },
    /// A structural invariant of the proof tree does not hold.
    InvariantViolation { detail: String },
    /// The availability oracle broke its contract (arity, mask shape, empty mask).
    OracleContractViolation { detail: String },
    /// The guidance strategy returned the wrong arity or an illegal group.
    StrategyContractViolation { detail: String },
    /// Pre-flight policy validation failed.
    InvalidPolicy { detail: String },
    /// The requested root-level cut cannot be applied.
    InvalidCut { choice: Choice, detail: String },
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "arena capacity exceeded: {requested} nodes requested, capacity {capacity}"
            ),
            Self::BoundCoherenceViolation { node, lower, upper } => write!(
                f,
                "bound coherence violated at node {node}: lower {lower} > upper {upper}"
            ),
            Self::InvariantViolation { detail } => write!(f, "invariant violation: {detail}"),
            Self::OracleContractViolation { detail } => {
                write!(f, "oracle contract violation: {detail}")
            }
            Self::StrategyContractViolation { detail } => {
                write!(f, "strategy contract violation: {detail}")
            }
            Self::InvalidPolicy { detail } => write!(f, "invalid prover policy: {detail}"),
            Self::InvalidCut { choice, detail } => {
                write!(f, "invalid root-level cut {choice}: {detail}")
            }
        }
    }
}

impl std::error::Error for SearchError {}
