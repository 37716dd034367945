//! Retirement of attained and non-optimal nodes.
//!
//! Rules are evaluated against a snapshot of in-play nodes and applied
//! together, then retirement cascades down to every descendant. Retired
//! nodes keep their last bracket so their parents' aggregates stay valid.

use std::collections::BTreeSet;

use tracing::debug;

use crate::arena::{NodeArena, NodeIndex};
use crate::error::SearchError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Nodes retired because `lower == upper`.
    pub attained: Vec<NodeIndex>,
    /// Nodes retired because `lower + 1 >= parent.upper`.
    ///
    /// A node can appear in both lists.
    pub nonoptimal: Vec<NodeIndex>,
    /// Descendants retired by the cascade.
    pub cascaded: Vec<NodeIndex>,
    pub inplay_after: usize,
}

/// Retire the attained and non-optimal nodes, then cascade.
///
/// Strict ancestors of `subject` are never retired, and `subject` itself is
/// only retired by attaining.
pub fn prune<P>(arena: &mut NodeArena<P>, subject: NodeIndex) -> PruneReport {
    let protected: BTreeSet<NodeIndex> = arena.ancestors(subject).collect();
    let mut report = PruneReport::default();
    let mut retire = BTreeSet::new();

    for (index, node) in arena.iter() {
        if !node.is_inplay() || protected.contains(&index) {
            continue;
        }
        let bracket = node.bracket();
        if bracket.is_attained() {
            report.attained.push(index);
            retire.insert(index);
        }
        let dominated = index != subject
            && node
                .parent()
                .is_some_and(|p| bracket.lower.saturating_add(1) >= arena[p].bracket().upper);
        if dominated {
            report.nonoptimal.push(index);
            retire.insert(index);
        }
    }

    report.cascaded = remove_from_play(arena, &retire.into_iter().collect::<Vec<_>>());
    report.inplay_after = arena.inplay_count();
    debug!(
        attained = report.attained.len(),
        nonoptimal = report.nonoptimal.len(),
        cascaded = report.cascaded.len(),
        inplay = report.inplay_after,
        "pruned"
    );
    report
}

/// Retire `subset`, then every in-play node whose parent is retired, until
/// no more change. Returns the nodes retired by the cascade alone.
pub fn remove_from_play<P>(arena: &mut NodeArena<P>, subset: &[NodeIndex]) -> Vec<NodeIndex> {
    for &index in subset {
        arena.retire(index);
    }
    let mut cascaded = Vec::new();
    loop {
        let orphans = arena.slice(|n| {
            n.is_inplay() && n.parent().is_some_and(|p| !arena[p].is_inplay())
        });
        if orphans.is_empty() {
            break;
        }
        for &index in &orphans {
            arena.retire(index);
        }
        cascaded.extend(orphans);
    }
    cascaded.sort_unstable();
    cascaded
}

/// Keep only `keep`, its subtree, and its strict ancestors in play.
///
/// Returns every node retired by the restriction.
///
/// # Errors
///
/// [`SearchError::InvariantViolation`] if `keep` is not an in-play node.
pub fn restrict_to<P>(
    arena: &mut NodeArena<P>,
    keep: NodeIndex,
) -> Result<Vec<NodeIndex>, SearchError> {
    if !arena.get(keep).is_some_and(|n| n.is_inplay()) {
        return Err(SearchError::InvariantViolation {
            detail: format!("cannot restrict play to node {keep}: not in play"),
        });
    }
    let ancestors: BTreeSet<NodeIndex> = arena.ancestors(keep).collect();
    let outside: Vec<NodeIndex> = arena
        .iter()
        .filter(|(i, n)| n.is_inplay() && !ancestors.contains(i) && !arena.in_subtree(*i, keep))
        .map(|(i, _)| i)
        .collect();
    for &index in &outside {
        arena.retire(index);
    }
    debug!(keep = keep.get(), retired = outside.len(), "restricted play");
    Ok(outside)
}
