//! Guidance strategies for local search.
//!
//! A strategy picks, for each pool entry, the `(x, y)` group to advance.
//! Every legal case of the picked group is then extended, so a strategy only
//! steers which proof tree local search builds; it never affects soundness.

use certmin_kernel::choice::{ChoiceGroup, ChoiceMask};

/// Batch group selection.
///
/// # Contract
///
/// - Returns exactly one pick per entry, in entry order.
/// - Each pick is `Some(group)` with `masks[i].group_is_legal(group)`.
/// - Deterministic for identical input.
pub trait ProofStrategy<P> {
    /// Stable identifier, echoed into the proof log.
    fn strategy_id(&self) -> &str;

    fn select_groups(&self, entries: &[&P], masks: &[&ChoiceMask]) -> Vec<Option<ChoiceGroup>>;
}

/// Picks the legal group with the fewest legal cases.
///
/// Ties go to the earliest group in slot order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FewestCasesStrategy;

impl<P> ProofStrategy<P> for FewestCasesStrategy {
    fn strategy_id(&self) -> &str {
        "fewest_cases"
    }

    fn select_groups(&self, _entries: &[&P], masks: &[&ChoiceMask]) -> Vec<Option<ChoiceGroup>> {
        masks
            .iter()
            .map(|mask| {
                mask.legal_groups()
                    .min_by_key(|&group| mask.legal_cases(group).count())
            })
            .collect()
    }
}

/// Picks the first legal group in slot order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstGroupStrategy;

impl<P> ProofStrategy<P> for FirstGroupStrategy {
    fn strategy_id(&self) -> &str {
        "first_group"
    }

    fn select_groups(&self, _entries: &[&P], masks: &[&ChoiceMask]) -> Vec<Option<ChoiceGroup>> {
        masks.iter().map(|mask| mask.legal_groups().next()).collect()
    }
}

/// Picks the legal group with the highest integer score.
///
/// Ties go to the earliest group in slot order.
pub struct ScoredStrategy<F> {
    id: String,
    score: F,
}

impl<F> ScoredStrategy<F> {
    pub fn new(id: impl Into<String>, score: F) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

impl<P, F> ProofStrategy<P> for ScoredStrategy<F>
where
    F: Fn(&P, ChoiceGroup) -> i64,
{
    fn strategy_id(&self) -> &str {
        &self.id
    }

    fn select_groups(&self, entries: &[&P], masks: &[&ChoiceMask]) -> Vec<Option<ChoiceGroup>> {
        entries
            .iter()
            .zip(masks)
            .map(|(entry, mask)| {
                let mut best: Option<(i64, ChoiceGroup)> = None;
                for group in mask.legal_groups() {
                    let score = (self.score)(entry, group);
                    if best.map_or(true, |(top, _)| score > top) {
                        best = Some((score, group));
                    }
                }
                best.map(|(_, group)| group)
            })
            .collect()
    }
}

impl<F> std::fmt::Debug for ScoredStrategy<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoredStrategy").field("id", &self.id).finish_non_exhaustive()
    }
}
