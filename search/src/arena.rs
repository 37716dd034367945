//! Node arena: the proof tree in index-addressed, capacity-bounded storage.
//!
//! Nodes are appended and never deleted. A node's index is stable for the
//! life of the arena; parents are plain indices and children live in a
//! per-slot table keyed by the `(x, y, p)` slot index. Retirement is the
//! `inplay = false` flag and is permanent.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;

use certmin_kernel::choice::{Choice, ChoiceMask, ChoiceSpace};

use crate::error::SearchError;

/// Upper bound of a bracket that has not been tightened yet.
pub const UNBOUNDED: u64 = u64::MAX;

/// Stable arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

impl NodeIndex {
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Certified bracket `[lower, upper]` on a node's exact minimal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bracket {
    pub lower: u64,
    pub upper: u64,
}

impl Bracket {
    /// Bracket of a freshly created active node.
    pub const WIDE: Self = Self {
        lower: 1,
        upper: UNBOUNDED,
    };

    #[must_use]
    pub const fn exact(value: u64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    #[must_use]
    pub fn is_attained(self) -> bool {
        self.lower == self.upper
    }

    #[must_use]
    pub fn is_coherent(self) -> bool {
        self.lower <= self.upper
    }

    /// Tightest bracket consistent with both `self` and `other`.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.upper == UNBOUNDED {
            write!(f, "[{}, inf]", self.lower)
        } else {
            write!(f, "[{}, {}]", self.lower, self.upper)
        }
    }
}

/// What a `(x, y, p)` slot of a node points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSlot {
    Unexpanded,
    /// Impossible extension: no node, contributes nothing.
    Terminal,
    Child(NodeIndex),
}

/// Whether a node still needs splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Open,
    /// A done leaf; its bracket is fixed at `value`.
    Resolved { value: u64 },
}

/// One proof-tree node.
#[derive(Debug, Clone)]
pub struct Node<P> {
    parent: Option<NodeIndex>,
    choice: Option<Choice>,
    depth: u32,
    kind: NodeKind,
    bracket: Bracket,
    split: bool,
    inplay: bool,
    mask: ChoiceMask,
    children: Vec<ChildSlot>,
    payload: P,
}

impl<P> Node<P> {
    #[must_use]
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// The choice that produced this node from its parent.
    #[must_use]
    pub fn choice(&self) -> Option<Choice> {
        self.choice
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn bracket(&self) -> Bracket {
        self.bracket
    }

    #[must_use]
    pub fn is_split(&self) -> bool {
        self.split
    }

    #[must_use]
    pub fn is_inplay(&self) -> bool {
        self.inplay
    }

    #[must_use]
    pub fn mask(&self) -> &ChoiceMask {
        &self.mask
    }

    #[must_use]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Slot for `choice`; [`ChildSlot::Unexpanded`] outside the space.
    #[must_use]
    pub fn child(&self, choice: Choice) -> ChildSlot {
        self.mask
            .space()
            .slot_index(choice)
            .map_or(ChildSlot::Unexpanded, |slot| self.children[slot])
    }

    /// `(choice, slot)` for every legal choice, in slot order.
    pub fn legal_slots(&self) -> impl Iterator<Item = (Choice, ChildSlot)> + '_ {
        self.mask
            .legal_choices()
            .map(move |choice| (choice, self.child(choice)))
    }

    /// Whether this node is on the frontier: in play and awaiting a split.
    #[must_use]
    pub fn is_frontier(&self) -> bool {
        self.inplay && !self.split && self.kind == NodeKind::Open
    }
}

/// How a drafted child enters the arena.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Active node with wide bracket and its own legality mask.
    Open { mask: ChoiceMask },
    /// Done leaf with exact bracket `value`.
    Done { value: u64 },
}

/// A child waiting to be appended.
#[derive(Debug, Clone)]
pub struct NodeDraft<P> {
    pub parent: NodeIndex,
    pub choice: Choice,
    pub payload: P,
    pub resolution: Resolution,
}

/// Growable, capacity-bounded node store.
#[derive(Debug, Clone)]
pub struct NodeArena<P> {
    space: ChoiceSpace,
    capacity: usize,
    nodes: Vec<Node<P>>,
}

impl<P> NodeArena<P> {
    /// Create an arena holding only the root.
    ///
    /// # Errors
    ///
    /// [`SearchError::CapacityExceeded`] when `capacity` is zero;
    /// [`SearchError::OracleContractViolation`] when the root mask is over a
    /// different space or has no legal choice.
    pub fn with_root(
        space: ChoiceSpace,
        capacity: usize,
        payload: P,
        mask: ChoiceMask,
    ) -> Result<Self, SearchError> {
        if capacity == 0 {
            return Err(SearchError::CapacityExceeded {
                requested: 1,
                capacity,
            });
        }
        check_mask(space, &mask, "root")?;
        let root = Node {
            parent: None,
            choice: None,
            depth: 0,
            kind: NodeKind::Open,
            bracket: Bracket::WIDE,
            split: false,
            inplay: true,
            children: vec![ChildSlot::Unexpanded; space.slot_count()],
            mask,
            payload,
        };
        Ok(Self {
            space,
            capacity,
            nodes: vec![root],
        })
    }

    #[must_use]
    pub fn space(&self) -> ChoiceSpace {
        self.space
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: NodeIndex) -> Option<&Node<P>> {
        self.nodes.get(index.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Node<P>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i), node))
    }

    /// Indices of every node matching `predicate`, ascending.
    pub fn slice(&self, mut predicate: impl FnMut(&Node<P>) -> bool) -> Vec<NodeIndex> {
        self.iter()
            .filter(|(_, node)| predicate(node))
            .map(|(i, _)| i)
            .collect()
    }

    /// In-play, unsplit, open nodes.
    #[must_use]
    pub fn frontier(&self) -> Vec<NodeIndex> {
        self.slice(Node::is_frontier)
    }

    #[must_use]
    pub fn inplay_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.inplay).count()
    }

    /// Strict ancestors of `index`, nearest first.
    pub fn ancestors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        std::iter::successors(self.get(index).and_then(Node::parent), |&i| {
            self.get(i).and_then(Node::parent)
        })
    }

    /// Whether `index` lies in the subtree rooted at `root` (inclusive).
    #[must_use]
    pub fn in_subtree(&self, index: NodeIndex, root: NodeIndex) -> bool {
        index == root || self.ancestors(index).any(|a| a == root)
    }

    /// Append a single child. See [`NodeArena::append`].
    ///
    /// # Errors
    ///
    /// As [`NodeArena::append`].
    pub fn create(&mut self, draft: NodeDraft<P>) -> Result<NodeIndex, SearchError> {
        let mut created = self.append(vec![draft])?;
        created.pop().ok_or_else(|| SearchError::InvariantViolation {
            detail: "single-node append created nothing".into(),
        })
    }

    /// Append a batch contiguously, in order, and link each child into its
    /// parent's slot table.
    ///
    /// The whole batch is validated before anything is written, so a failed
    /// append leaves the arena untouched.
    ///
    /// # Errors
    ///
    /// - [`SearchError::CapacityExceeded`] if the batch does not fit.
    /// - [`SearchError::OracleContractViolation`] for an open draft whose mask
    ///   is over the wrong space or empty.
    /// - [`SearchError::InvariantViolation`] for an unknown parent, an illegal
    ///   or already-filled slot, or two drafts targeting the same slot.
    pub fn append(&mut self, drafts: Vec<NodeDraft<P>>) -> Result<Vec<NodeIndex>, SearchError> {
        let requested = self.nodes.len() + drafts.len();
        if requested > self.capacity {
            return Err(SearchError::CapacityExceeded {
                requested,
                capacity: self.capacity,
            });
        }

        let mut targets = BTreeSet::new();
        for draft in &drafts {
            let slot = self.empty_slot(draft.parent, draft.choice)?;
            if !targets.insert((draft.parent, slot)) {
                return Err(SearchError::InvariantViolation {
                    detail: format!(
                        "two drafts target slot {} of node {}",
                        draft.choice, draft.parent
                    ),
                });
            }
            if let Resolution::Open { mask } = &draft.resolution {
                check_mask(self.space, mask, "active child")?;
            }
        }

        let first = self.nodes.len();
        for draft in drafts {
            let index = NodeIndex(self.nodes.len());
            let parent = &mut self.nodes[draft.parent.0];
            let depth = parent.depth + 1;
            if let Some(slot) = self.space.slot_index(draft.choice) {
                parent.children[slot] = ChildSlot::Child(index);
            }
            let (kind, bracket, split, mask) = match draft.resolution {
                Resolution::Open { mask } => (NodeKind::Open, Bracket::WIDE, false, mask),
                Resolution::Done { value } => (
                    NodeKind::Resolved { value },
                    Bracket::exact(value),
                    true,
                    ChoiceMask::empty(self.space),
                ),
            };
            self.nodes.push(Node {
                parent: Some(draft.parent),
                choice: Some(draft.choice),
                depth,
                kind,
                bracket,
                split,
                inplay: true,
                mask,
                children: vec![ChildSlot::Unexpanded; self.space.slot_count()],
                payload: draft.payload,
            });
        }
        Ok((first..self.nodes.len()).map(NodeIndex).collect())
    }

    /// Mark slot `choice` of `parent` as an impossible extension.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvariantViolation`] if the slot is illegal or filled.
    pub fn mark_terminal(&mut self, parent: NodeIndex, choice: Choice) -> Result<(), SearchError> {
        let slot = self.empty_slot(parent, choice)?;
        self.nodes[parent.0].children[slot] = ChildSlot::Terminal;
        Ok(())
    }

    /// Mark `index` as split.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvariantViolation`] if the node is already split, is a
    /// done leaf, or still has an unexpanded legal slot.
    pub fn mark_split(&mut self, index: NodeIndex) -> Result<(), SearchError> {
        let node = self.node_checked(index)?;
        if node.split {
            return Err(SearchError::InvariantViolation {
                detail: format!("node {index} is already split"),
            });
        }
        if let Some((choice, _)) = node
            .legal_slots()
            .find(|(_, slot)| *slot == ChildSlot::Unexpanded)
        {
            return Err(SearchError::InvariantViolation {
                detail: format!("node {index} cannot split: slot {choice} is unexpanded"),
            });
        }
        self.nodes[index.0].split = true;
        Ok(())
    }

    pub(crate) fn set_bracket(&mut self, index: NodeIndex, bracket: Bracket) {
        self.nodes[index.0].bracket = bracket;
    }

    pub(crate) fn retire(&mut self, index: NodeIndex) {
        self.nodes[index.0].inplay = false;
    }

    fn node_checked(&self, index: NodeIndex) -> Result<&Node<P>, SearchError> {
        self.get(index)
            .ok_or_else(|| SearchError::InvariantViolation {
                detail: format!("node {index} is not in the arena"),
            })
    }

    fn empty_slot(&self, parent: NodeIndex, choice: Choice) -> Result<usize, SearchError> {
        let node = self.node_checked(parent)?;
        let slot = self
            .space
            .slot_index(choice)
            .filter(|_| node.mask.is_legal(choice))
            .ok_or_else(|| SearchError::InvariantViolation {
                detail: format!("choice {choice} is not legal at node {parent}"),
            })?;
        if node.children[slot] != ChildSlot::Unexpanded {
            return Err(SearchError::InvariantViolation {
                detail: format!("slot {choice} of node {parent} is already filled"),
            });
        }
        Ok(slot)
    }
}

impl<P> Index<NodeIndex> for NodeArena<P> {
    type Output = Node<P>;

    fn index(&self, index: NodeIndex) -> &Node<P> {
        &self.nodes[index.0]
    }
}

fn check_mask(space: ChoiceSpace, mask: &ChoiceMask, what: &str) -> Result<(), SearchError> {
    if mask.space() != space {
        return Err(SearchError::OracleContractViolation {
            detail: format!("{what} mask is over a different choice space"),
        });
    }
    if mask.is_empty() {
        return Err(SearchError::OracleContractViolation {
            detail: format!("{what} has no legal choice"),
        });
    }
    Ok(())
}
