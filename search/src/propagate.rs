//! Bound propagation.
//!
//! For a split node, each legal group `(x, y)` aggregates to
//! `1 + sum over legal p of contribution(child[x][y][p])`, lower and upper
//! independently; the node's derived bracket is the minimum over groups.
//! A step derives every target from the same snapshot, then applies all
//! updates at once. Updates intersect with the current bracket, so lower
//! bounds never fall and upper bounds never rise.

use certmin_kernel::choice::ChoiceGroup;
use tracing::debug;

use crate::arena::{Bracket, ChildSlot, NodeArena, NodeIndex, NodeKind, UNBOUNDED};
use crate::error::SearchError;

/// Aggregated bracket of one legal group at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupAggregate {
    pub group: ChoiceGroup,
    pub bracket: Bracket,
}

/// Counters for a [`recursive_bound`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub iterations: usize,
    /// The last step changed nothing.
    pub converged: bool,
    /// Bracket updates applied over all iterations.
    pub updated: usize,
}

fn contribution<P>(arena: &NodeArena<P>, slot: ChildSlot) -> Bracket {
    match slot {
        ChildSlot::Terminal => Bracket::exact(0),
        ChildSlot::Child(i) => arena[i].bracket(),
        ChildSlot::Unexpanded => Bracket::WIDE,
    }
}

/// Per-group aggregates of `index`, in slot order.
#[must_use]
pub fn group_aggregates<P>(arena: &NodeArena<P>, index: NodeIndex) -> Vec<GroupAggregate> {
    let node = &arena[index];
    node.mask()
        .legal_groups()
        .map(|group| {
            let mut lower: u64 = 1;
            let mut upper: u64 = 1;
            for choice in node.mask().legal_cases(group) {
                let part = contribution(arena, node.child(choice));
                lower = lower.saturating_add(part.lower);
                upper = upper.saturating_add(part.upper);
            }
            GroupAggregate {
                group,
                bracket: Bracket { lower, upper },
            }
        })
        .collect()
}

/// Bracket implied by the children of `index`, or `None` without legal groups.
#[must_use]
pub fn derive_bracket<P>(arena: &NodeArena<P>, index: NodeIndex) -> Option<Bracket> {
    group_aggregates(arena, index)
        .into_iter()
        .map(|a| a.bracket)
        .reduce(|best, b| Bracket {
            lower: best.lower.min(b.lower),
            upper: best.upper.min(b.upper),
        })
}

fn is_target<P>(arena: &NodeArena<P>, index: NodeIndex) -> bool {
    let node = &arena[index];
    node.is_inplay() && node.is_split() && node.kind() == NodeKind::Open
}

/// One snapshot step over every split, in-play, open node.
///
/// Returns the number of brackets that changed.
///
/// # Errors
///
/// [`SearchError::BoundCoherenceViolation`] if any in-play node ends the
/// step with `lower > upper`.
pub fn propagation_step<P>(arena: &mut NodeArena<P>) -> Result<usize, SearchError> {
    let view: &NodeArena<P> = arena;
    let updates: Vec<(NodeIndex, Bracket)> = (0..view.len())
        .map(NodeIndex)
        .filter(|&i| is_target(view, i))
        .filter_map(|i| {
            let current = view[i].bracket();
            let next = current.intersect(derive_bracket(view, i)?);
            (next != current).then_some((i, next))
        })
        .collect();

    for &(index, bracket) in &updates {
        arena.set_bracket(index, bracket);
    }

    if let Some((node, b)) = arena
        .iter()
        .find(|(_, n)| n.is_inplay() && !n.bracket().is_coherent())
        .map(|(i, n)| (i, n.bracket()))
    {
        return Err(SearchError::BoundCoherenceViolation {
            node,
            lower: b.lower,
            upper: b.upper,
        });
    }
    Ok(updates.len())
}

/// Iterate [`propagation_step`] until nothing changes or `max_iterations`
/// steps have run.
///
/// # Errors
///
/// As [`propagation_step`].
pub fn recursive_bound<P>(
    arena: &mut NodeArena<P>,
    max_iterations: usize,
) -> Result<PropagationReport, SearchError> {
    let mut report = PropagationReport::default();
    while report.iterations < max_iterations {
        let changed = propagation_step(arena)?;
        report.iterations += 1;
        report.updated += changed;
        if changed == 0 {
            report.converged = true;
            break;
        }
    }
    let root = arena[NodeIndex::ROOT].bracket();
    debug!(
        iterations = report.iterations,
        converged = report.converged,
        updated = report.updated,
        root_lower = root.lower,
        root_upper = (root.upper != UNBOUNDED).then_some(root.upper),
        "propagated bounds"
    );
    Ok(report)
}
