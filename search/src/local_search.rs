//! Guided local search: tighten frontier upper bounds by building concrete
//! proof trees.
//!
//! Each frontier node seeds a transient pool with one entry. A step advances
//! the whole pool one ply: for every entry the strategy picks one legal group
//! and every legal case of it is extended. Active results form the next
//! generation under the same owner. An owner whose entries have all been
//! resolved holds the size of a complete proof tree, which is a sound upper
//! bound for it.
//!
//! Within a ply, entries go to the strategy and the oracle in batches of
//! `chunk_size`. Budgets and the abort threshold are only checked between
//! plies, so the result does not depend on the chunk size.

use std::collections::BTreeMap;

use certmin_kernel::choice::{Choice, ChoiceMask};
use tracing::{debug, warn};

use crate::arena::{Bracket, NodeArena, NodeIndex};
use crate::contract::AvailabilityOracle;
use crate::error::SearchError;
use crate::expand::{extend_batch, Extension};
use crate::strategy::ProofStrategy;

/// Effort limits for one local-search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSearchLimits {
    /// Plies over the whole pool.
    pub max_steps: usize,
    /// Entries per strategy and oracle call within a ply.
    pub chunk_size: usize,
    /// Abort when the pool grows beyond this many entries.
    pub abort_threshold: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSearchOutcome {
    /// The frontier was empty.
    Idle,
    /// The pool drained; every owner was resolved.
    Resolved,
    /// The pool exceeded the abort threshold.
    Aborted { pool: usize },
    /// The step budget ran out with work left.
    BudgetSpent { pool: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSearchReport {
    pub outcome: LocalSearchOutcome,
    pub owners: usize,
    pub steps: usize,
    /// Owners whose tally was applied.
    pub certified: usize,
    /// Owners whose upper bound strictly decreased.
    pub tightened: usize,
    pub peak_pool: usize,
    pub entries_created: usize,
}

struct ProofEntry<P> {
    owner: NodeIndex,
    payload: P,
    mask: ChoiceMask,
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    total: u64,
    open: usize,
}

/// Run local search over the current frontier and apply the resolved tallies.
///
/// Owners left unresolved keep their previous upper bound.
///
/// # Errors
///
/// Oracle and strategy contract violations;
/// [`SearchError::BoundCoherenceViolation`] if a tally undercuts an owner's
/// lower bound.
pub fn local_search<O, S>(
    arena: &mut NodeArena<O::Payload>,
    oracle: &O,
    strategy: &S,
    limits: LocalSearchLimits,
) -> Result<LocalSearchReport, SearchError>
where
    O: AvailabilityOracle,
    S: ProofStrategy<O::Payload> + ?Sized,
{
    let owners = arena.frontier();
    let mut report = LocalSearchReport {
        outcome: LocalSearchOutcome::Idle,
        owners: owners.len(),
        steps: 0,
        certified: 0,
        tightened: 0,
        peak_pool: owners.len(),
        entries_created: 0,
    };
    if owners.is_empty() {
        return Ok(report);
    }

    let mut pool: Vec<ProofEntry<O::Payload>> = owners
        .iter()
        .map(|&owner| ProofEntry {
            owner,
            payload: arena[owner].payload().clone(),
            mask: arena[owner].mask().clone(),
        })
        .collect();
    let mut tallies: BTreeMap<NodeIndex, Tally> = owners
        .iter()
        .map(|&owner| (owner, Tally { total: 1, open: 1 }))
        .collect();

    report.outcome = loop {
        if pool.is_empty() {
            break LocalSearchOutcome::Resolved;
        }
        if pool.len() > limits.abort_threshold {
            warn!(
                pool = pool.len(),
                threshold = limits.abort_threshold,
                "local search pool over threshold, aborting"
            );
            break LocalSearchOutcome::Aborted { pool: pool.len() };
        }
        if report.steps >= limits.max_steps {
            break LocalSearchOutcome::BudgetSpent { pool: pool.len() };
        }
        let mut generation = std::mem::take(&mut pool).into_iter();
        loop {
            let batch: Vec<ProofEntry<O::Payload>> =
                generation.by_ref().take(limits.chunk_size.max(1)).collect();
            if batch.is_empty() {
                break;
            }
            report.entries_created += advance(oracle, strategy, batch, &mut pool, &mut tallies)?;
        }
        report.steps += 1;
        report.peak_pool = report.peak_pool.max(pool.len());
    };
    drop(pool);

    for (owner, tally) in tallies {
        if tally.open > 0 {
            continue;
        }
        report.certified += 1;
        let old = arena[owner].bracket();
        if tally.total >= old.upper {
            continue;
        }
        if tally.total < old.lower {
            return Err(SearchError::BoundCoherenceViolation {
                node: owner,
                lower: old.lower,
                upper: tally.total,
            });
        }
        report.tightened += 1;
        arena.set_bracket(
            owner,
            Bracket {
                lower: old.lower,
                upper: tally.total,
            },
        );
    }

    debug!(
        owners = report.owners,
        steps = report.steps,
        certified = report.certified,
        tightened = report.tightened,
        peak_pool = report.peak_pool,
        "local search finished"
    );
    Ok(report)
}

/// Advance every entry of `batch` one ply, pushing active results onto
/// `next`. Returns the number of new entries.
fn advance<O, S>(
    oracle: &O,
    strategy: &S,
    batch: Vec<ProofEntry<O::Payload>>,
    next: &mut Vec<ProofEntry<O::Payload>>,
    tallies: &mut BTreeMap<NodeIndex, Tally>,
) -> Result<usize, SearchError>
where
    O: AvailabilityOracle,
    S: ProofStrategy<O::Payload> + ?Sized,
{
    let payloads: Vec<&O::Payload> = batch.iter().map(|e| &e.payload).collect();
    let masks: Vec<&ChoiceMask> = batch.iter().map(|e| &e.mask).collect();
    let picks = strategy.select_groups(&payloads, &masks);
    if picks.len() != batch.len() {
        return Err(SearchError::StrategyContractViolation {
            detail: format!(
                "{} returned {} picks for {} entries",
                strategy.strategy_id(),
                picks.len(),
                batch.len()
            ),
        });
    }

    let mut parents = Vec::new();
    let mut choices: Vec<Choice> = Vec::new();
    let mut owners = Vec::new();
    for (entry, pick) in batch.iter().zip(picks) {
        let group = pick.ok_or_else(|| SearchError::StrategyContractViolation {
            detail: format!(
                "{} declined an entry of owner {}",
                strategy.strategy_id(),
                entry.owner
            ),
        })?;
        if !entry.mask.group_is_legal(group) {
            return Err(SearchError::StrategyContractViolation {
                detail: format!(
                    "{} picked illegal group {group} for owner {}",
                    strategy.strategy_id(),
                    entry.owner
                ),
            });
        }
        for choice in entry.mask.legal_cases(group) {
            parents.push(&entry.payload);
            choices.push(choice);
            owners.push(entry.owner);
        }
    }

    let extensions = extend_batch(oracle, &parents, &choices)?;

    for entry in &batch {
        tally_for(tallies, entry.owner)?.open -= 1;
    }
    let mut created = 0;
    for (owner, extension) in owners.into_iter().zip(extensions) {
        let tally = tally_for(tallies, owner)?;
        match extension {
            Extension::Active { payload, mask } => {
                tally.total = tally.total.saturating_add(1);
                tally.open += 1;
                created += 1;
                next.push(ProofEntry {
                    owner,
                    payload,
                    mask,
                });
            }
            Extension::Done { value, .. } => {
                tally.total = tally.total.saturating_add(value);
            }
            Extension::Impossible => {}
        }
    }
    Ok(created)
}

fn tally_for(
    tallies: &mut BTreeMap<NodeIndex, Tally>,
    owner: NodeIndex,
) -> Result<&mut Tally, SearchError> {
    tallies
        .get_mut(&owner)
        .ok_or_else(|| SearchError::InvariantViolation {
            detail: format!("pool entry for unknown owner {owner}"),
        })
}
