//! Bound properties that must hold on every run.
//!
//! 1. Monotonicity: lower bounds never fall and upper bounds never rise,
//!    across propagation steps and across whole rounds.
//! 2. Soundness at a fixpoint: after propagation converges, every in-play
//!    split node's lower bound equals the one derived from its children; its
//!    upper bound is no greater (equal when local search is off).
//! 3. Downward closure: after every pruning pass, no in-play node has a
//!    retired parent.
//! 4. Termination correctness: the certified node's children re-derive
//!    the certified value.

use certmin_harness::contract::ProofWorldV1;
use certmin_harness::worlds::residue_sieve::{ResidueGuide, ResidueSieve};
use certmin_harness::worlds::scripted::ScriptedTree;
use certmin_kernel::choice::Choice;
use certmin_search::arena::{Bracket, NodeArena};
use certmin_search::contract::AvailabilityOracle;
use certmin_search::expand::expand_frontier;
use certmin_search::propagate::{derive_bracket, propagation_step};
use certmin_search::prover::{ProofOutcome, ProofStatus, Prover};
use certmin_search::strategy::{FewestCasesStrategy, ProofStrategy};
use certmin_search::ProverPolicyV1;
use lock_tests::scenario_fixtures::{
    assert_downward_closed, assert_fixpoint_sound, mixed_tree, propagation_only,
};

fn brackets<P>(arena: &NodeArena<P>) -> Vec<Bracket> {
    arena.iter().map(|(_, n)| n.bracket()).collect()
}

fn assert_tightened(before: &[Bracket], after: &[Bracket]) {
    for (i, (old, new)) in before.iter().zip(after).enumerate() {
        assert!(new.lower >= old.lower, "lower of #{i} fell: {old} -> {new}");
        assert!(new.upper <= old.upper, "upper of #{i} rose: {old} -> {new}");
    }
}

#[test]
fn propagation_steps_are_monotone() {
    let world = ResidueSieve::first_n(2, 7).unwrap();
    let root = world.root_payload();
    let mask = world.availability(&[&root]).remove(0);
    let mut arena = NodeArena::with_root(world.space(), 100_000, root, mask).unwrap();
    for _ in 0..3 {
        expand_frontier(&mut arena, &world, 64).unwrap();
    }

    let mut steps = 0;
    loop {
        let before = brackets(&arena);
        let changed = propagation_step(&mut arena).unwrap();
        assert_tightened(&before, &brackets(&arena));
        steps += 1;
        if changed == 0 {
            break;
        }
    }
    assert!(steps > 1, "three levels need more than one step");
}

fn assert_rounds_monotone<W, S>(world: &W, strategy: &S, policy: ProverPolicyV1)
where
    W: ProofWorldV1,
    S: ProofStrategy<W::Payload>,
{
    let mut prover = Prover::new(world, strategy, world.root_payload(), policy).unwrap();
    prover.initialize(None).unwrap();
    while prover.status().unwrap() == ProofStatus::InProgress {
        let before = brackets(prover.arena());
        prover.step().unwrap();
        assert_tightened(&before, &brackets(prover.arena()));
    }
}

#[test]
fn rounds_are_monotone() {
    assert_rounds_monotone(&mixed_tree(), &FewestCasesStrategy, ProverPolicyV1::default());
    assert_rounds_monotone(&mixed_tree(), &FewestCasesStrategy, propagation_only());
    assert_rounds_monotone(
        &ResidueSieve::first_n(2, 8).unwrap(),
        &ResidueGuide,
        ProverPolicyV1::default(),
    );
}

/// Drive rounds by hand, checking properties 2 and 3 after every phase
/// they concern. Returns the certified value.
fn drive_by_hand<W, S>(world: &W, strategy: &S, policy: ProverPolicyV1) -> u64
where
    W: ProofWorldV1,
    S: ProofStrategy<W::Payload>,
{
    let exact_upper = policy.max_proof_steps == 0;
    let mut prover = Prover::new(world, strategy, world.root_payload(), policy).unwrap();
    prover.initialize(None).unwrap();
    assert_downward_closed(prover.arena());

    for _ in 0..30 {
        if let ProofStatus::Done { value } = prover.status().unwrap() {
            return value;
        }
        prover.expand().unwrap();
        prover.local_search().unwrap();
        let report = prover.propagate().unwrap();
        assert!(report.converged);
        assert_fixpoint_sound(prover.arena(), exact_upper);
        prover.prune();
        assert_downward_closed(prover.arena());
    }
    panic!("no certificate after 30 manual rounds");
}

#[test]
fn fixpoints_are_sound_and_retirement_is_closed() {
    assert_eq!(drive_by_hand(&mixed_tree(), &FewestCasesStrategy, propagation_only()), 4);
    assert_eq!(
        drive_by_hand(&mixed_tree(), &FewestCasesStrategy, ProverPolicyV1::default()),
        4
    );
    let sieve = ResidueSieve::first_n(2, 8).unwrap();
    assert_eq!(
        drive_by_hand(&sieve, &ResidueGuide, ProverPolicyV1::default()),
        sieve.brute_force_minimum()
    );
    assert_eq!(
        drive_by_hand(&sieve, &ResidueGuide, propagation_only()),
        sieve.brute_force_minimum()
    );
}

fn assert_certificate_rederives<W, S>(
    world: &W,
    strategy: &S,
    cut: Option<Choice>,
    policy: ProverPolicyV1,
) where
    W: ProofWorldV1,
    S: ProofStrategy<W::Payload>,
{
    let exact_upper = policy.max_proof_steps == 0;
    let mut prover = Prover::new(world, strategy, world.root_payload(), policy).unwrap();
    prover.initialize(cut).unwrap();
    let ProofOutcome::Certified(cert) = prover.run().unwrap() else {
        panic!("expected a certificate");
    };

    let derived = derive_bracket(prover.arena(), cert.subject).unwrap();
    assert_eq!(derived.lower, cert.value);
    if exact_upper {
        assert_eq!(derived, Bracket::exact(cert.value));
    } else {
        assert!(derived.upper >= cert.value);
    }
    let best = cert.breakdown.iter().map(|a| a.bracket.lower).min();
    assert_eq!(best, Some(cert.value));
}

#[test]
fn certificates_rederive_from_children() {
    assert_certificate_rederives(&mixed_tree(), &FewestCasesStrategy, None, propagation_only());
    assert_certificate_rederives(
        &mixed_tree(),
        &FewestCasesStrategy,
        None,
        ProverPolicyV1::default(),
    );
    let sieve = ResidueSieve::first_n(3, 8).unwrap();
    assert_certificate_rederives(&sieve, &ResidueGuide, None, ProverPolicyV1::default());
    assert_certificate_rederives(
        &sieve,
        &ResidueGuide,
        Some(Choice::new(0, 0, 1)),
        ProverPolicyV1::default(),
    );
}

#[test]
fn chain_value_needs_every_level() {
    let world = ScriptedTree::chain(6);
    assert_certificate_rederives(&world, &FewestCasesStrategy, None, propagation_only());
}
