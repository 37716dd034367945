//! Extension choices and per-node legality masks.
//!
//! A choice is a triple `(x, y, p)`. The pair `(x, y)` names a
//! [`ChoiceGroup`]; `p` names one case of that group. Bounds are minimized
//! over groups and summed over the cases of a group, so the two coordinates
//! play different roles and are kept as distinct types.

use std::fmt;

/// Dimensions of the choice space.
///
/// `x` and `y` range over `0..arity`; `p` ranges over `0..cases`. Slots are
/// laid out row-major as `(x * arity + y) * cases + p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChoiceSpace {
    arity: u8,
    cases: u8,
}

impl ChoiceSpace {
    /// Build a choice space.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    #[must_use]
    pub const fn new(arity: u8, cases: u8) -> Self {
        assert!(arity > 0 && cases > 0, "choice space dimensions must be nonzero");
        Self { arity, cases }
    }

    #[must_use]
    pub fn arity(&self) -> u8 {
        self.arity
    }

    #[must_use]
    pub fn cases(&self) -> u8 {
        self.cases
    }

    /// Number of `(x, y)` groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        usize::from(self.arity) * usize::from(self.arity)
    }

    /// Number of `(x, y, p)` slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.group_count() * usize::from(self.cases)
    }

    /// Whether every coordinate of `choice` lies inside this space.
    #[must_use]
    pub fn contains(&self, choice: Choice) -> bool {
        choice.x < self.arity && choice.y < self.arity && choice.p < self.cases
    }

    /// Whether both coordinates of `group` lie inside this space.
    #[must_use]
    pub fn contains_group(&self, group: ChoiceGroup) -> bool {
        group.x < self.arity && group.y < self.arity
    }

    /// Flat slot index of `choice`, or `None` when it lies outside the space.
    #[must_use]
    pub fn slot_index(&self, choice: Choice) -> Option<usize> {
        if !self.contains(choice) {
            return None;
        }
        let group = usize::from(choice.x) * usize::from(self.arity) + usize::from(choice.y);
        Some(group * usize::from(self.cases) + usize::from(choice.p))
    }

    /// Inverse of [`ChoiceSpace::slot_index`].
    ///
    /// # Panics
    ///
    /// Panics if `slot >= self.slot_count()`.
    #[must_use]
    pub fn choice_at(&self, slot: usize) -> Choice {
        assert!(slot < self.slot_count(), "slot {slot} outside choice space");
        let cases = usize::from(self.cases);
        let arity = usize::from(self.arity);
        let group = slot / cases;
        // Each coordinate is below a u8 dimension, so the narrowing casts are exact.
        #[allow(clippy::cast_possible_truncation)]
        Choice {
            x: (group / arity) as u8,
            y: (group % arity) as u8,
            p: (slot % cases) as u8,
        }
    }

    /// All groups in slot order.
    pub fn groups(&self) -> impl Iterator<Item = ChoiceGroup> {
        let arity = self.arity;
        (0..arity).flat_map(move |x| (0..arity).map(move |y| ChoiceGroup { x, y }))
    }

    /// All choices of one group, in case order.
    pub fn choices_in(&self, group: ChoiceGroup) -> impl Iterator<Item = Choice> {
        (0..self.cases).map(move |p| group.case(p))
    }
}

/// One extension choice `(x, y, p)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Choice {
    pub x: u8,
    pub y: u8,
    pub p: u8,
}

impl Choice {
    #[must_use]
    pub const fn new(x: u8, y: u8, p: u8) -> Self {
        Self { x, y, p }
    }

    /// The `(x, y)` group this choice belongs to.
    #[must_use]
    pub fn group(self) -> ChoiceGroup {
        ChoiceGroup {
            x: self.x,
            y: self.y,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.p)
    }
}

/// The `(x, y)` reduction of a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChoiceGroup {
    pub x: u8,
    pub y: u8,
}

impl ChoiceGroup {
    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// The choice selecting case `p` of this group.
    #[must_use]
    pub fn case(self, p: u8) -> Choice {
        Choice {
            x: self.x,
            y: self.y,
            p,
        }
    }
}

impl fmt::Display for ChoiceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Legality of every `(x, y, p)` slot at one node.
///
/// The group-level reduction `available[x][y]` is derived on demand: a group
/// is legal when any of its cases is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceMask {
    space: ChoiceSpace,
    slots: Vec<bool>,
}

impl ChoiceMask {
    /// A mask with no legal choice.
    #[must_use]
    pub fn empty(space: ChoiceSpace) -> Self {
        Self {
            space,
            slots: vec![false; space.slot_count()],
        }
    }

    /// Build a mask by evaluating `legal` on every slot of `space`.
    pub fn from_fn(space: ChoiceSpace, mut legal: impl FnMut(Choice) -> bool) -> Self {
        let slots = (0..space.slot_count())
            .map(|slot| legal(space.choice_at(slot)))
            .collect();
        Self { space, slots }
    }

    /// Build a mask from an explicit list of legal choices.
    ///
    /// # Panics
    ///
    /// Panics if any choice lies outside `space`.
    #[must_use]
    pub fn from_choices(space: ChoiceSpace, legal: &[Choice]) -> Self {
        let mut mask = Self::empty(space);
        for &choice in legal {
            mask.set(choice, true);
        }
        mask
    }

    #[must_use]
    pub fn space(&self) -> ChoiceSpace {
        self.space
    }

    /// Set the legality of one slot.
    ///
    /// # Panics
    ///
    /// Panics if `choice` lies outside the mask's space.
    pub fn set(&mut self, choice: Choice, legal: bool) {
        let Some(slot) = self.space.slot_index(choice) else {
            panic!("choice {choice} outside choice space");
        };
        self.slots[slot] = legal;
    }

    /// Whether `choice` is legal. Choices outside the space are never legal.
    #[must_use]
    pub fn is_legal(&self, choice: Choice) -> bool {
        self.space
            .slot_index(choice)
            .is_some_and(|slot| self.slots[slot])
    }

    /// Whether any case of `group` is legal.
    #[must_use]
    pub fn group_is_legal(&self, group: ChoiceGroup) -> bool {
        self.space.contains_group(group)
            && self
                .space
                .choices_in(group)
                .any(|choice| self.is_legal(choice))
    }

    /// Legal choices in slot order.
    pub fn legal_choices(&self) -> impl Iterator<Item = Choice> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, &legal)| legal)
            .map(|(slot, _)| self.space.choice_at(slot))
    }

    /// Legal groups in slot order.
    pub fn legal_groups(&self) -> impl Iterator<Item = ChoiceGroup> + '_ {
        self.space
            .groups()
            .filter(|&group| self.group_is_legal(group))
    }

    /// Legal cases of `group`, in case order.
    pub fn legal_cases(&self, group: ChoiceGroup) -> impl Iterator<Item = Choice> + '_ {
        self.space
            .choices_in(group)
            .filter(|&choice| self.is_legal(choice))
    }

    /// Number of legal slots.
    #[must_use]
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|&&legal| legal).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.slots.iter().any(|&legal| legal)
    }
}
