//! Frontier expansion.
//!
//! Every frontier node gets a child table filled for every legal choice:
//! active extensions become open nodes, done extensions become resolved
//! leaves, impossible extensions mark the slot terminal. Candidates are sent
//! to the oracle in fixed-size chunks; the arena is only touched once every
//! chunk has been classified.

use certmin_kernel::choice::{Choice, ChoiceMask};
use tracing::debug;

use crate::arena::{NodeArena, NodeDraft, NodeIndex, Resolution};
use crate::contract::{AvailabilityOracle, Verdict};
use crate::error::SearchError;

/// Counters for one expansion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    /// Frontier nodes split by this pass.
    pub frontier: usize,
    pub active: usize,
    pub done: usize,
    pub impossible: usize,
    /// Oracle round trips.
    pub chunks: usize,
}

/// One extension after classification.
#[derive(Debug, Clone)]
pub(crate) enum Extension<P> {
    Active { payload: P, mask: ChoiceMask },
    Done { payload: P, value: u64 },
    Impossible,
}

/// Extend `parents[i]` by `choices[i]`, classify, and fetch masks for the
/// active results.
pub(crate) fn extend_batch<O: AvailabilityOracle>(
    oracle: &O,
    parents: &[&O::Payload],
    choices: &[Choice],
) -> Result<Vec<Extension<O::Payload>>, SearchError> {
    let children = oracle.extend(parents, choices);
    check_arity("extend", choices.len(), children.len())?;
    let verdicts = oracle.classify(&children);
    check_arity("classify", children.len(), verdicts.len())?;

    let active: Vec<&O::Payload> = children
        .iter()
        .zip(&verdicts)
        .filter(|(_, v)| **v == Verdict::Active)
        .map(|(c, _)| c)
        .collect();
    let masks = if active.is_empty() {
        Vec::new()
    } else {
        oracle.availability(&active)
    };
    check_arity("availability", active.len(), masks.len())?;
    let space = oracle.space();
    for mask in &masks {
        if mask.space() != space {
            return Err(SearchError::OracleContractViolation {
                detail: "availability mask is over a different choice space".into(),
            });
        }
        if mask.is_empty() {
            return Err(SearchError::OracleContractViolation {
                detail: "active payload has no legal choice".into(),
            });
        }
    }

    let mut masks = masks.into_iter();
    let mut out = Vec::with_capacity(children.len());
    for (payload, verdict) in children.into_iter().zip(verdicts) {
        out.push(match verdict {
            Verdict::Active => {
                let mask = masks.next().ok_or_else(|| SearchError::InvariantViolation {
                    detail: "availability mask missing for active payload".into(),
                })?;
                Extension::Active { payload, mask }
            }
            Verdict::Done { value } => Extension::Done { payload, value },
            Verdict::Impossible => Extension::Impossible,
        });
    }
    Ok(out)
}

fn check_arity(call: &str, expected: usize, actual: usize) -> Result<(), SearchError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SearchError::OracleContractViolation {
            detail: format!("{call} returned {actual} results for {expected} inputs"),
        })
    }
}

/// Split every frontier node.
///
/// `chunk_size` bounds how many candidates go to the oracle at once; the
/// resulting arena does not depend on it.
///
/// # Errors
///
/// Oracle contract violations, and [`SearchError::CapacityExceeded`] when the
/// new children do not fit. On error the arena is unchanged.
pub fn expand_frontier<O: AvailabilityOracle>(
    arena: &mut NodeArena<O::Payload>,
    oracle: &O,
    chunk_size: usize,
) -> Result<ExpansionReport, SearchError> {
    let frontier = arena.frontier();
    let mut report = ExpansionReport {
        frontier: frontier.len(),
        ..ExpansionReport::default()
    };
    if frontier.is_empty() {
        return Ok(report);
    }

    let view: &NodeArena<O::Payload> = arena;
    let candidates: Vec<(NodeIndex, Choice)> = frontier
        .iter()
        .flat_map(|&i| view[i].mask().legal_choices().map(move |c| (i, c)))
        .collect();

    let mut drafts = Vec::new();
    let mut terminals = Vec::new();
    for chunk in candidates.chunks(chunk_size.max(1)) {
        let parents: Vec<&O::Payload> = chunk.iter().map(|(i, _)| view[*i].payload()).collect();
        let choices: Vec<Choice> = chunk.iter().map(|(_, c)| *c).collect();
        let extensions = extend_batch(oracle, &parents, &choices)?;
        for (&(parent, choice), extension) in chunk.iter().zip(extensions) {
            match extension {
                Extension::Active { payload, mask } => {
                    report.active += 1;
                    drafts.push(NodeDraft {
                        parent,
                        choice,
                        payload,
                        resolution: Resolution::Open { mask },
                    });
                }
                Extension::Done { payload, value } => {
                    report.done += 1;
                    drafts.push(NodeDraft {
                        parent,
                        choice,
                        payload,
                        resolution: Resolution::Done { value },
                    });
                }
                Extension::Impossible => {
                    report.impossible += 1;
                    terminals.push((parent, choice));
                }
            }
        }
        report.chunks += 1;
    }

    arena.append(drafts)?;
    for (parent, choice) in terminals {
        arena.mark_terminal(parent, choice)?;
    }
    for index in frontier {
        arena.mark_split(index)?;
    }

    debug!(
        frontier = report.frontier,
        active = report.active,
        done = report.done,
        impossible = report.impossible,
        chunks = report.chunks,
        arena_len = arena.len(),
        "expanded frontier"
    );
    Ok(report)
}
