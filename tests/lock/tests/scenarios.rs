//! End-to-end scenarios on scripted trees with known answers.
//!
//! - Trivial root: one choice to a done child of value 1 certifies `[2, 2]`
//!   in the initialization round.
//! - Two-choice minimum: done children 3 and 5 certify 4 and the value-5
//!   branch is retired as non-optimal.
//! - Capacity overflow fails the expansion without touching committed nodes.

use certmin_harness::worlds::scripted::{Outcome, ScriptedTree};
use certmin_kernel::choice::{Choice, ChoiceGroup, ChoiceSpace};
use certmin_search::prover::{prove, ProofOutcome, ProofStatus, Prover};
use certmin_search::strategy::{FewestCasesStrategy, FirstGroupStrategy};
use certmin_search::{Bracket, NodeIndex, ProverPolicyV1, SearchError};
use lock_tests::scenario_fixtures::{
    arena_snapshot, mixed_tree, propagation_only, trivial_root, two_choice,
};

#[test]
fn trivial_root_certifies_in_one_round() {
    let world = trivial_root();
    let mut prover = Prover::new(
        &world,
        &FirstGroupStrategy,
        Outcome::Node(0),
        ProverPolicyV1::default(),
    )
    .unwrap();
    prover.initialize(None).unwrap();

    assert_eq!(prover.status().unwrap(), ProofStatus::Done { value: 2 });
    assert_eq!(prover.arena()[NodeIndex::ROOT].bracket(), Bracket::exact(2));
    assert_eq!(prover.rounds().len(), 1);

    let ProofOutcome::Certified(cert) = prover.run().unwrap() else {
        panic!("trivial root must certify");
    };
    assert_eq!(cert.value, 2);
    assert_eq!(cert.rounds, 1);
}

#[test]
fn two_choice_minimum_retires_the_worse_branch() {
    let world = two_choice();
    let (outcome, log) = prove(
        &world,
        &FirstGroupStrategy,
        Outcome::Node(0),
        None,
        ProverPolicyV1::default(),
    )
    .unwrap();

    let ProofOutcome::Certified(cert) = outcome else {
        panic!("two-choice tree must certify, got {outcome:?}");
    };
    assert_eq!(cert.value, 4);
    assert_eq!(cert.breakdown.len(), 2);
    assert_eq!(cert.breakdown[0].group, ChoiceGroup::new(0, 0));
    assert_eq!(cert.breakdown[0].bracket, Bracket::exact(4));
    assert_eq!(cert.breakdown[1].bracket, Bracket::exact(6));

    // Children are appended in choice order: #1 is the 3-branch, #2 the 5-branch.
    let init = &log.rounds[0];
    assert!(init.prune.nonoptimal.contains(&NodeIndex(2)));
}

#[test]
fn mixed_tree_certifies_its_minimum() {
    let world = mixed_tree();
    for policy in [ProverPolicyV1::default(), propagation_only()] {
        let (outcome, _) =
            prove(&world, &FewestCasesStrategy, Outcome::Node(0), None, policy).unwrap();
        let ProofOutcome::Certified(cert) = outcome else {
            panic!("mixed tree must certify, got {outcome:?}");
        };
        assert_eq!(cert.value, 4);
    }
}

#[test]
fn cut_certifies_the_chosen_subtree() {
    let world = mixed_tree();
    // Root (0,0,0) leads to A, whose exact value is 2.
    let (outcome, log) = prove(
        &world,
        &FirstGroupStrategy,
        Outcome::Node(0),
        Some(Choice::new(0, 0, 0)),
        ProverPolicyV1::default(),
    )
    .unwrap();
    let ProofOutcome::Certified(cert) = outcome else {
        panic!("cut subtree must certify, got {outcome:?}");
    };
    assert_eq!(cert.value, 2);
    assert_eq!(cert.cut, Some(Choice::new(0, 0, 0)));
    assert_ne!(cert.subject, NodeIndex::ROOT);
    assert_eq!(log.metadata.subject, cert.subject);
}

#[test]
fn cut_to_an_impossible_slot_is_rejected() {
    let world = mixed_tree();
    let err = prove(
        &world,
        &FirstGroupStrategy,
        Outcome::Node(0),
        Some(Choice::new(0, 0, 1)),
        ProverPolicyV1::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SearchError::InvalidCut { .. }));
}

#[test]
fn capacity_overflow_on_first_expansion() {
    let world = ScriptedTree::flat(&[3, 5, 7]);
    let policy = ProverPolicyV1 {
        arena_capacity: 2,
        ..ProverPolicyV1::default()
    };
    let err = prove(&world, &FirstGroupStrategy, Outcome::Node(0), None, policy).unwrap_err();
    assert_eq!(
        err,
        SearchError::CapacityExceeded {
            requested: 4,
            capacity: 2
        }
    );
}

#[test]
fn capacity_overflow_leaves_committed_bounds_intact() {
    let only = |p| Choice::new(0, 0, p);
    let mut world = ScriptedTree::new(ChoiceSpace::new(1, 2));
    world.node(vec![(only(0), Outcome::Node(1)), (only(1), Outcome::Node(2))]);
    world.node(vec![(only(0), Outcome::Done(0)), (only(1), Outcome::Done(0))]);
    world.node(vec![(only(0), Outcome::Done(0)), (only(1), Outcome::Done(0))]);

    let policy = ProverPolicyV1 {
        arena_capacity: 3,
        ..ProverPolicyV1::default()
    };
    let mut prover = Prover::new(&world, &FirstGroupStrategy, Outcome::Node(0), policy).unwrap();
    prover.expand().unwrap();
    prover.propagate().unwrap();
    assert_eq!(prover.arena()[NodeIndex::ROOT].bracket().lower, 3);
    let before = arena_snapshot(prover.arena());

    let err = prover.expand().unwrap_err();
    assert_eq!(
        err,
        SearchError::CapacityExceeded {
            requested: 7,
            capacity: 3
        }
    );
    assert_eq!(arena_snapshot(prover.arena()), before);
    assert_eq!(prover.arena().frontier(), vec![NodeIndex(1), NodeIndex(2)]);
}
