//! `ProofLogV1`: per-round audit log of a proof run.
//!
//! The normative surface is the ordered list of [`RoundEventV1`] entries plus
//! the metadata. Serialization is canonical JSON; the log digest is computed
//! over those bytes under [`HashDomain::ProofLog`].

use certmin_kernel::choice::{Choice, ChoiceSpace};
use certmin_kernel::proof::canon::{canonical_json_bytes, CanonError};
use certmin_kernel::proof::hash::{canonical_hash, ContentHash};
use certmin_kernel::proof::hash_domain::HashDomain;

use crate::arena::{Bracket, NodeIndex, UNBOUNDED};
use crate::expand::ExpansionReport;
use crate::local_search::{LocalSearchOutcome, LocalSearchReport};
use crate::policy::ProverPolicyV1;
use crate::propagate::PropagationReport;
use crate::prune::PruneReport;

/// Everything that happened in one orchestrator round.
#[derive(Debug, Clone)]
pub struct RoundEventV1 {
    /// 0 for initialization, then 1, 2, ... for steps.
    pub round: u64,
    pub kind: RoundKindV1,
    pub expansions: Vec<ExpansionReport>,
    pub local_search: LocalSearchReport,
    pub propagation: PropagationReport,
    pub prune: PruneReport,
    pub subject: NodeIndex,
    pub subject_bracket: Bracket,
    pub arena_len: u64,
    pub inplay_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundKindV1 {
    Init {
        cut: Option<Choice>,
        /// Nodes retired by the cut.
        cut_retired: u64,
    },
    Step,
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReasonV1 {
    Certified { value: u64 },
    RoundBudgetExceeded { rounds: u64 },
}

#[derive(Debug, Clone)]
pub struct ProofLogMetadata {
    pub oracle_id: String,
    pub strategy_id: String,
    pub space: ChoiceSpace,
    pub policy: ProverPolicyV1,
    pub cut: Option<Choice>,
    pub subject: NodeIndex,
    pub arena_len: u64,
    /// `None` while the run is still in progress.
    pub termination: Option<TerminationReasonV1>,
}

/// Complete audit trail of a proof run.
#[derive(Debug, Clone)]
pub struct ProofLogV1 {
    pub rounds: Vec<RoundEventV1>,
    pub metadata: ProofLogMetadata,
}

impl ProofLogV1 {
    /// Serialize to canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// [`CanonError`] if a value has no canonical form.
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, CanonError> {
        canonical_json_bytes(&self.to_json_value())
    }

    /// Content hash of the canonical bytes.
    ///
    /// # Errors
    ///
    /// As [`ProofLogV1::to_canonical_json_bytes`].
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        Ok(canonical_hash(
            HashDomain::ProofLog,
            &self.to_canonical_json_bytes()?,
        ))
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "metadata": metadata_to_json(&self.metadata),
            "rounds": self.rounds.iter().map(round_to_json).collect::<Vec<_>>(),
            "schema_version": "proof_log.v1",
        })
    }
}

/// `[x, y, p]`, or null.
#[must_use]
pub fn choice_to_json(choice: Option<Choice>) -> serde_json::Value {
    choice.map_or(serde_json::Value::Null, |c| serde_json::json!([c.x, c.y, c.p]))
}

/// `{"lower": l, "upper": u}` with an unbounded upper written as null.
#[must_use]
pub fn bracket_to_json(b: Bracket) -> serde_json::Value {
    let upper = if b.upper == UNBOUNDED {
        serde_json::Value::Null
    } else {
        serde_json::json!(b.upper)
    };
    serde_json::json!({"lower": b.lower, "upper": upper})
}

fn round_to_json(e: &RoundEventV1) -> serde_json::Value {
    let kind = match e.kind {
        RoundKindV1::Init { cut, cut_retired } => serde_json::json!({
            "cut": choice_to_json(cut),
            "cut_retired": cut_retired,
            "type": "init",
        }),
        RoundKindV1::Step => serde_json::json!({"type": "step"}),
    };
    serde_json::json!({
        "arena_len": e.arena_len,
        "expansions": e.expansions.iter().map(expansion_to_json).collect::<Vec<_>>(),
        "inplay_count": e.inplay_count,
        "kind": kind,
        "local_search": local_search_to_json(&e.local_search),
        "propagation": {
            "converged": e.propagation.converged,
            "iterations": e.propagation.iterations,
            "updated": e.propagation.updated,
        },
        "prune": prune_to_json(&e.prune),
        "round": e.round,
        "subject": e.subject.get(),
        "subject_bracket": bracket_to_json(e.subject_bracket),
    })
}

fn expansion_to_json(r: &ExpansionReport) -> serde_json::Value {
    serde_json::json!({
        "active": r.active,
        "chunks": r.chunks,
        "done": r.done,
        "frontier": r.frontier,
        "impossible": r.impossible,
    })
}

fn local_search_to_json(r: &LocalSearchReport) -> serde_json::Value {
    let outcome = match r.outcome {
        LocalSearchOutcome::Idle => serde_json::json!({"type": "idle"}),
        LocalSearchOutcome::Resolved => serde_json::json!({"type": "resolved"}),
        LocalSearchOutcome::Aborted { pool } => {
            serde_json::json!({"pool": pool, "type": "aborted"})
        }
        LocalSearchOutcome::BudgetSpent { pool } => {
            serde_json::json!({"pool": pool, "type": "budget_spent"})
        }
    };
    serde_json::json!({
        "certified": r.certified,
        "entries_created": r.entries_created,
        "outcome": outcome,
        "owners": r.owners,
        "peak_pool": r.peak_pool,
        "steps": r.steps,
        "tightened": r.tightened,
    })
}

fn prune_to_json(r: &PruneReport) -> serde_json::Value {
    serde_json::json!({
        "attained": r.attained.len(),
        "cascaded": r.cascaded.len(),
        "inplay_after": r.inplay_after,
        "nonoptimal": r.nonoptimal.len(),
    })
}

fn termination_to_json(t: Option<TerminationReasonV1>) -> serde_json::Value {
    match t {
        None => serde_json::Value::Null,
        Some(TerminationReasonV1::Certified { value }) => {
            serde_json::json!({"type": "certified", "value": value})
        }
        Some(TerminationReasonV1::RoundBudgetExceeded { rounds }) => {
            serde_json::json!({"rounds": rounds, "type": "round_budget_exceeded"})
        }
    }
}

fn metadata_to_json(m: &ProofLogMetadata) -> serde_json::Value {
    serde_json::json!({
        "arena_len": m.arena_len,
        "cut": choice_to_json(m.cut),
        "oracle_id": m.oracle_id,
        "policy": m.policy.to_json(),
        "space": {"arity": m.space.arity(), "cases": m.space.cases()},
        "strategy_id": m.strategy_id,
        "subject": m.subject.get(),
        "termination": termination_to_json(m.termination),
    })
}
