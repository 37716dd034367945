//! `ScriptedTree`: a world whose every outcome is written down in a table.
//!
//! Node 0 is the root. Each scripted node lists its legal choices and what
//! each choice leads to: another scripted node, a done leaf with a terminal
//! value, or an impossible extension.

use certmin_kernel::choice::{Choice, ChoiceMask, ChoiceSpace};
use certmin_search::contract::{AvailabilityOracle, Verdict};

use crate::contract::ProofWorldV1;

/// Payload of a scripted world, and also what a scripted edge leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Scripted node `id`; classified active.
    Node(usize),
    Done(u64),
    Impossible,
}

/// An explicit tree of outcomes per (node, choice).
#[derive(Debug, Clone)]
pub struct ScriptedTree {
    space: ChoiceSpace,
    nodes: Vec<Vec<(Choice, Outcome)>>,
}

impl ScriptedTree {
    #[must_use]
    pub fn new(space: ChoiceSpace) -> Self {
        Self {
            space,
            nodes: Vec::new(),
        }
    }

    /// Append a scripted node and return its id. The first node added is
    /// the root.
    pub fn node(&mut self, edges: Vec<(Choice, Outcome)>) -> usize {
        self.nodes.push(edges);
        self.nodes.len() - 1
    }

    /// A root whose group `(i, 0)` has a single case leading to a done leaf
    /// of value `values[i]`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty or has more than 255 entries.
    #[must_use]
    pub fn flat(values: &[u64]) -> Self {
        assert!(
            (1..=usize::from(u8::MAX)).contains(&values.len()),
            "flat tree needs 1 to 255 values"
        );
        let arity = u8::try_from(values.len()).unwrap_or(u8::MAX);
        let mut tree = Self::new(ChoiceSpace::new(arity, 1));
        tree.node(
            (0..arity)
                .zip(values)
                .map(|(x, &v)| (Choice::new(x, 0, 0), Outcome::Done(v)))
                .collect(),
        );
        tree
    }

    /// A straight line of `length` single-choice nodes ending in a done leaf
    /// of value 0. The root's exact value is `length`.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    #[must_use]
    pub fn chain(length: usize) -> Self {
        assert!(length > 0, "a chain needs at least the root");
        let only = Choice::new(0, 0, 0);
        let mut tree = Self::new(ChoiceSpace::new(1, 1));
        for next in 1..length {
            tree.node(vec![(only, Outcome::Node(next))]);
        }
        tree.node(vec![(only, Outcome::Done(0))]);
        tree
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edges(&self, outcome: Outcome) -> &[(Choice, Outcome)] {
        match outcome {
            Outcome::Node(id) => self.nodes.get(id).map_or(&[], Vec::as_slice),
            Outcome::Done(_) | Outcome::Impossible => &[],
        }
    }
}

impl AvailabilityOracle for ScriptedTree {
    type Payload = Outcome;

    fn oracle_id(&self) -> &str {
        "scripted_tree"
    }

    fn space(&self) -> ChoiceSpace {
        self.space
    }

    fn availability(&self, nodes: &[&Outcome]) -> Vec<ChoiceMask> {
        nodes
            .iter()
            .map(|&&outcome| {
                let legal: Vec<Choice> = self.edges(outcome).iter().map(|(c, _)| *c).collect();
                ChoiceMask::from_choices(self.space, &legal)
            })
            .collect()
    }

    fn extend(&self, parents: &[&Outcome], choices: &[Choice]) -> Vec<Outcome> {
        parents
            .iter()
            .zip(choices)
            .map(|(&&parent, choice)| {
                self.edges(parent)
                    .iter()
                    .find(|(c, _)| c == choice)
                    .map_or(Outcome::Impossible, |(_, next)| *next)
            })
            .collect()
    }

    fn classify(&self, children: &[Outcome]) -> Vec<Verdict> {
        children
            .iter()
            .map(|outcome| match *outcome {
                Outcome::Node(_) => Verdict::Active,
                Outcome::Done(value) => Verdict::Done { value },
                Outcome::Impossible => Verdict::Impossible,
            })
            .collect()
    }
}

impl ProofWorldV1 for ScriptedTree {
    fn world_id(&self) -> &str {
        "scripted_tree"
    }

    fn root_payload(&self) -> Outcome {
        Outcome::Node(0)
    }

    fn fixture_json(&self) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = self
            .nodes
            .iter()
            .map(|edges| {
                edges
                    .iter()
                    .map(|(c, outcome)| {
                        let to = match *outcome {
                            Outcome::Node(id) => serde_json::json!({"node": id}),
                            Outcome::Done(value) => serde_json::json!({"done": value}),
                            Outcome::Impossible => serde_json::json!("impossible"),
                        };
                        serde_json::json!({"choice": [c.x, c.y, c.p], "to": to})
                    })
                    .collect()
            })
            .collect();
        serde_json::json!({
            "arity": self.space.arity(),
            "cases": self.space.cases(),
            "nodes": nodes,
            "schema_version": "scripted_tree.v1",
            "world_id": self.world_id(),
        })
    }
}
