//! Availability oracle contract.

use certmin_kernel::choice::{Choice, ChoiceMask, ChoiceSpace};

/// Classification of a freshly extended payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Needs further exploration.
    Active,
    /// Fully resolved with exact remaining value `value`.
    Done { value: u64 },
    /// Dead: no node is created and the slot contributes nothing.
    Impossible,
}

/// Domain collaborator that decides legality and terminality.
///
/// # Contract
///
/// - Every batch method returns exactly one result per input, in input order.
/// - Masks are over [`AvailabilityOracle::space`].
/// - Results depend only on the inputs. Parent payloads are never mutated.
/// - `availability` is only asked about payloads classified [`Verdict::Active`]
///   (and the root), and must report at least one legal choice for them.
pub trait AvailabilityOracle {
    type Payload: Clone;

    /// Stable identifier, echoed into the proof log.
    fn oracle_id(&self) -> &str;

    /// The `(x, y, p)` dimensions every mask is expressed in.
    fn space(&self) -> ChoiceSpace;

    /// Legal extension choices for each payload.
    fn availability(&self, nodes: &[&Self::Payload]) -> Vec<ChoiceMask>;

    /// Apply `choices[i]` to `parents[i]`.
    fn extend(&self, parents: &[&Self::Payload], choices: &[Choice]) -> Vec<Self::Payload>;

    /// Classify each extended payload.
    fn classify(&self, children: &[Self::Payload]) -> Vec<Verdict>;
}
