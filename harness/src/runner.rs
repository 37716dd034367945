//! Harness runner: drives the prover over a world and packages the result.
//!
//! The runner owns no proof logic; it delegates to `certmin_search::prove`.
//!
//! # Pipeline
//!
//! ```text
//! fixture_json() -> canonical bytes
//!   -> policy.to_json() -> canonical bytes
//!   -> prove() -> ProofOutcome + ProofLogV1
//!   -> outcome.json (binds fixture, policy and log digests)
//!   -> round_summary.txt (observational, outside the digest)
//!   -> build_bundle()
//! ```

use std::fmt;

use certmin_kernel::choice::Choice;
use certmin_kernel::proof::canon::{canonical_json_bytes, CanonError};
use certmin_kernel::proof::hash::{canonical_hash, ContentHash};
use certmin_kernel::proof::hash_domain::HashDomain;
use certmin_search::graph::{bracket_to_json, choice_to_json, ProofLogV1, RoundKindV1};
use certmin_search::policy::ProverPolicyV1;
use certmin_search::propagate::GroupAggregate;
use certmin_search::prover::{prove, ProofOutcome};
use certmin_search::strategy::ProofStrategy;
use certmin_search::{Bracket, SearchError};
use tracing::info;

use crate::bundle::{
    build_bundle, ArtifactBundleV1, BundleBuildError, FIXTURE_ARTIFACT, OUTCOME_ARTIFACT,
    POLICY_ARTIFACT, PROOF_LOG_ARTIFACT, ROUND_SUMMARY_ARTIFACT,
};
use crate::contract::ProofWorldV1;

/// Error during a harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The prover failed fatally.
    Search(SearchError),
    /// Canonical JSON serialization failed.
    CanonFailed { detail: String },
    /// Bundle assembly failed.
    BundleFailed(BundleBuildError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search(e) => write!(f, "search error: {e}"),
            Self::CanonFailed { detail } => write!(f, "canonical JSON error: {detail}"),
            Self::BundleFailed(e) => write!(f, "bundle error: {e}"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<SearchError> for RunError {
    fn from(e: SearchError) -> Self {
        Self::Search(e)
    }
}

impl From<CanonError> for RunError {
    fn from(e: CanonError) -> Self {
        Self::CanonFailed {
            detail: e.to_string(),
        }
    }
}

impl From<BundleBuildError> for RunError {
    fn from(e: BundleBuildError) -> Self {
        Self::BundleFailed(e)
    }
}

/// Result of [`run_proof`]: the in-memory outcome plus its bundle.
#[derive(Debug, Clone)]
pub struct ProofBundleV1 {
    pub outcome: ProofOutcome,
    pub log: ProofLogV1,
    pub bundle: ArtifactBundleV1,
    /// `canonical_hash(HashDomain::OutcomeReport, outcome.json)`.
    pub outcome_digest: ContentHash,
}

impl ProofBundleV1 {
    /// Certified value, if the run certified one.
    #[must_use]
    pub fn value(&self) -> Option<u64> {
        outcome_value(&self.outcome)
    }
}

/// Run the prover over `world` and package the result.
///
/// An inconclusive run still yields a bundle; only fatal prover errors and
/// serialization failures are errors.
///
/// # Errors
///
/// [`RunError`] on a fatal prover error, a fixture without canonical form,
/// or bundle assembly failure.
pub fn run_proof<W, S>(
    world: &W,
    strategy: &S,
    cut: Option<Choice>,
    policy: ProverPolicyV1,
) -> Result<ProofBundleV1, RunError>
where
    W: ProofWorldV1,
    S: ProofStrategy<W::Payload> + ?Sized,
{
    info!(
        world = world.world_id(),
        strategy = strategy.strategy_id(),
        "running proof"
    );
    let fixture_bytes = canonical_json_bytes(&world.fixture_json())?;
    let policy_bytes = canonical_json_bytes(&policy.to_json())?;

    let (outcome, log) = prove(world, strategy, world.root_payload(), cut, policy)?;
    let log_bytes = log.to_canonical_json_bytes()?;

    let mut report = outcome_to_json(&outcome, &log);
    report["fixture_digest"] = digest_json(HashDomain::WorldFixture, &fixture_bytes);
    report["policy_digest"] = digest_json(HashDomain::PolicySnapshot, &policy_bytes);
    report["proof_log_digest"] = digest_json(HashDomain::ProofLog, &log_bytes);
    report["strategy_id"] = serde_json::json!(strategy.strategy_id());
    report["world_id"] = serde_json::json!(world.world_id());
    let outcome_bytes = canonical_json_bytes(&report)?;
    let outcome_digest = canonical_hash(HashDomain::OutcomeReport, &outcome_bytes);

    let bundle = build_bundle(vec![
        (FIXTURE_ARTIFACT.into(), fixture_bytes, true),
        (POLICY_ARTIFACT.into(), policy_bytes, true),
        (PROOF_LOG_ARTIFACT.into(), log_bytes, true),
        (OUTCOME_ARTIFACT.into(), outcome_bytes, true),
        (ROUND_SUMMARY_ARTIFACT.into(), round_summary(&log).into_bytes(), false),
    ])?;

    info!(
        world = world.world_id(),
        value = ?outcome_value(&outcome),
        digest = bundle.digest.as_str(),
        "proof bundle built"
    );
    Ok(ProofBundleV1 {
        outcome,
        log,
        bundle,
        outcome_digest,
    })
}

fn outcome_value(outcome: &ProofOutcome) -> Option<u64> {
    match outcome {
        ProofOutcome::Certified(cert) => Some(cert.value),
        ProofOutcome::Inconclusive { .. } => None,
    }
}

/// One human-readable line per round.
fn round_summary(log: &ProofLogV1) -> String {
    log.rounds
        .iter()
        .map(|r| {
            let kind = match r.kind {
                RoundKindV1::Init { .. } => "init",
                RoundKindV1::Step => "step",
            };
            format!(
                "round {} {kind}: subject {} {} arena {} in play {} tightened {}\n",
                r.round,
                r.subject,
                r.subject_bracket,
                r.arena_len,
                r.inplay_count,
                r.local_search.tightened
            )
        })
        .collect()
}

fn digest_json(domain: HashDomain, bytes: &[u8]) -> serde_json::Value {
    serde_json::json!(canonical_hash(domain, bytes).as_str())
}

fn breakdown_to_json(breakdown: &[GroupAggregate]) -> serde_json::Value {
    breakdown
        .iter()
        .map(|a| {
            serde_json::json!({
                "bracket": bracket_to_json(a.bracket),
                "group": [a.group.x, a.group.y],
            })
        })
        .collect()
}

fn outcome_to_json(outcome: &ProofOutcome, log: &ProofLogV1) -> serde_json::Value {
    match outcome {
        ProofOutcome::Certified(cert) => serde_json::json!({
            "arena_len": cert.arena_len,
            "breakdown": breakdown_to_json(&cert.breakdown),
            "cut": choice_to_json(cert.cut),
            "rounds": cert.rounds,
            "schema_version": "proof_outcome.v1",
            "status": "certified",
            "subject": cert.subject.get(),
            "subject_bracket": bracket_to_json(Bracket::exact(cert.value)),
            "value": cert.value,
        }),
        ProofOutcome::Inconclusive {
            rounds,
            subject_bracket,
        } => serde_json::json!({
            "arena_len": log.metadata.arena_len,
            "breakdown": [],
            "cut": choice_to_json(log.metadata.cut),
            "rounds": rounds,
            "schema_version": "proof_outcome.v1",
            "status": "inconclusive",
            "subject": log.metadata.subject.get(),
            "subject_bracket": bracket_to_json(*subject_bracket),
            "value": null,
        }),
    }
}
