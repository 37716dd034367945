//! `ResidueSieve`: identify a hidden integer by asking residue questions.
//!
//! The payload is the set of candidates still consistent with the answers so
//! far. Group `(x, y)` asks "what is `(v >> y) mod (x + 2)`?" and case `p` is
//! the answer. A node's value is the number of questions in a smallest
//! decision tree that singles out the hidden integer from its candidates.
//!
//! # Legality
//!
//! A choice `(x, y, p)` is legal iff `p < x + 2` and the group `(x, y)`
//! separates the current set into at least two non-empty classes. An answer
//! class with no candidates is an impossible extension; a class with at most
//! one candidate is done with value 0.
//!
//! Construction checks that every pair of candidates is told apart by some
//! group, so every active set has a legal group.

use std::collections::HashMap;
use std::fmt;

use certmin_kernel::choice::{Choice, ChoiceGroup, ChoiceMask, ChoiceSpace};
use certmin_search::contract::{AvailabilityOracle, Verdict};
use certmin_search::strategy::ProofStrategy;

use crate::contract::ProofWorldV1;

/// Largest supported arity. Shifts stay below 8 and moduli below 10.
pub const MAX_ARITY: u8 = 8;

/// Largest supported candidate count (one bit per candidate in the
/// brute-force memo key).
pub const MAX_CANDIDATES: usize = 64;

/// Sorted, duplicate-free candidate integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateSet(Vec<u64>);

impl CandidateSet {
    #[must_use]
    pub fn new(mut values: Vec<u64>) -> Self {
        values.sort_unstable();
        values.dedup();
        Self(values)
    }

    #[must_use]
    pub fn values(&self) -> &[u64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Candidates whose answer to `group` is `p`.
    #[must_use]
    pub fn answering(&self, group: ChoiceGroup, p: u8) -> Self {
        Self(
            self.0
                .iter()
                .copied()
                .filter(|&v| residue(v, group) == p)
                .collect(),
        )
    }

    /// Size of each answer class of `group`, indexed by answer.
    #[must_use]
    pub fn class_sizes(&self, group: ChoiceGroup) -> Vec<usize> {
        let mut sizes = vec![0; usize::from(modulus(group))];
        for &v in &self.0 {
            sizes[usize::from(residue(v, group))] += 1;
        }
        sizes
    }

    /// Whether `group` leaves at least two non-empty classes.
    #[must_use]
    pub fn splits(&self, group: ChoiceGroup) -> bool {
        self.class_sizes(group).iter().filter(|&&n| n > 0).count() >= 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SieveError {
    ArityOutOfRange { arity: u8 },
    TooFewCandidates { count: usize },
    TooManyCandidates { count: usize },
    /// No group tells `a` and `b` apart.
    Inseparable { a: u64, b: u64 },
}

impl fmt::Display for SieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArityOutOfRange { arity } => {
                write!(f, "arity {arity} outside 1..={MAX_ARITY}")
            }
            Self::TooFewCandidates { count } => {
                write!(f, "need at least 2 distinct candidates, got {count}")
            }
            Self::TooManyCandidates { count } => {
                write!(f, "at most {MAX_CANDIDATES} candidates supported, got {count}")
            }
            Self::Inseparable { a, b } => {
                write!(f, "candidates {a} and {b} give the same answer to every group")
            }
        }
    }
}

impl std::error::Error for SieveError {}

fn modulus(group: ChoiceGroup) -> u8 {
    group.x + 2
}

fn residue(v: u64, group: ChoiceGroup) -> u8 {
    // The modulus is below 10, so the remainder fits.
    u8::try_from((v >> group.y) % u64::from(modulus(group))).unwrap_or(u8::MAX)
}

/// The residue-question world.
#[derive(Debug, Clone)]
pub struct ResidueSieve {
    space: ChoiceSpace,
    root: CandidateSet,
}

impl ResidueSieve {
    /// Build a sieve over `candidates` with groups `(x, y)` for
    /// `x, y < arity`.
    ///
    /// # Errors
    ///
    /// [`SieveError`] if the arity or candidate count is out of range, or if
    /// some pair of candidates cannot be told apart.
    pub fn new(arity: u8, candidates: Vec<u64>) -> Result<Self, SieveError> {
        if arity == 0 || arity > MAX_ARITY {
            return Err(SieveError::ArityOutOfRange { arity });
        }
        let root = CandidateSet::new(candidates);
        if root.len() < 2 {
            return Err(SieveError::TooFewCandidates { count: root.len() });
        }
        if root.len() > MAX_CANDIDATES {
            return Err(SieveError::TooManyCandidates { count: root.len() });
        }
        let space = ChoiceSpace::new(arity, arity + 1);
        for (i, &a) in root.values().iter().enumerate() {
            for &b in &root.values()[i + 1..] {
                if space.groups().all(|g| residue(a, g) == residue(b, g)) {
                    return Err(SieveError::Inseparable { a, b });
                }
            }
        }
        Ok(Self { space, root })
    }

    /// Candidates `0..count`.
    ///
    /// # Errors
    ///
    /// As [`ResidueSieve::new`].
    pub fn first_n(arity: u8, count: u64) -> Result<Self, SieveError> {
        Self::new(arity, (0..count).collect())
    }

    #[must_use]
    pub fn arity(&self) -> u8 {
        self.space.arity()
    }

    #[must_use]
    pub fn candidates(&self) -> &CandidateSet {
        &self.root
    }

    /// Exact minimum by exhaustive memoized recursion over candidate
    /// subsets. Exponential; intended for small fixtures and for checking
    /// certified values.
    #[must_use]
    pub fn brute_force_minimum(&self) -> u64 {
        let full = if self.root.len() == 64 {
            u64::MAX
        } else {
            (1_u64 << self.root.len()) - 1
        };
        let mut memo = HashMap::new();
        self.minimum_of(full, &mut memo)
    }

    fn minimum_of(&self, subset: u64, memo: &mut HashMap<u64, u64>) -> u64 {
        if subset.count_ones() <= 1 {
            return 0;
        }
        if let Some(&known) = memo.get(&subset) {
            return known;
        }
        let values = self.root.values();
        let mut best = u64::MAX;
        for group in self.space.groups() {
            let mut classes = vec![0_u64; usize::from(modulus(group))];
            for (bit, &v) in values.iter().enumerate() {
                if subset & (1 << bit) != 0 {
                    classes[usize::from(residue(v, group))] |= 1 << bit;
                }
            }
            if classes.iter().filter(|&&c| c != 0).count() < 2 {
                continue;
            }
            let total = classes.iter().fold(1_u64, |acc, &class| {
                acc.saturating_add(self.minimum_of(class, memo))
            });
            best = best.min(total);
        }
        memo.insert(subset, best);
        best
    }

    fn mask_for(&self, set: &CandidateSet) -> ChoiceMask {
        let mut mask = ChoiceMask::empty(self.space);
        if set.len() < 2 {
            return mask;
        }
        for group in self.space.groups().filter(|&g| set.splits(g)) {
            for p in 0..modulus(group) {
                mask.set(group.case(p), true);
            }
        }
        mask
    }
}

impl AvailabilityOracle for ResidueSieve {
    type Payload = CandidateSet;

    fn oracle_id(&self) -> &str {
        "residue_sieve"
    }

    fn space(&self) -> ChoiceSpace {
        self.space
    }

    fn availability(&self, nodes: &[&CandidateSet]) -> Vec<ChoiceMask> {
        nodes.iter().map(|set| self.mask_for(set)).collect()
    }

    fn extend(&self, parents: &[&CandidateSet], choices: &[Choice]) -> Vec<CandidateSet> {
        parents
            .iter()
            .zip(choices)
            .map(|(set, choice)| set.answering(choice.group(), choice.p))
            .collect()
    }

    fn classify(&self, children: &[CandidateSet]) -> Vec<Verdict> {
        children
            .iter()
            .map(|set| match set.len() {
                0 => Verdict::Impossible,
                1 => Verdict::Done { value: 0 },
                _ => Verdict::Active,
            })
            .collect()
    }
}

impl ProofWorldV1 for ResidueSieve {
    fn world_id(&self) -> &str {
        "residue_sieve"
    }

    fn root_payload(&self) -> CandidateSet {
        self.root.clone()
    }

    fn fixture_json(&self) -> serde_json::Value {
        serde_json::json!({
            "arity": self.arity(),
            "candidates": self.root.values(),
            "schema_version": "residue_sieve.v1",
            "world_id": self.world_id(),
        })
    }
}

/// Asks the question whose largest answer class is smallest.
///
/// Ties go to the earliest group in slot order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResidueGuide;

impl ProofStrategy<CandidateSet> for ResidueGuide {
    fn strategy_id(&self) -> &str {
        "residue_guide"
    }

    fn select_groups(
        &self,
        entries: &[&CandidateSet],
        masks: &[&ChoiceMask],
    ) -> Vec<Option<ChoiceGroup>> {
        entries
            .iter()
            .zip(masks)
            .map(|(set, mask)| {
                mask.legal_groups().min_by_key(|&group| {
                    set.class_sizes(group).into_iter().max().unwrap_or(0)
                })
            })
            .collect()
    }
}
