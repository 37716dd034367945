//! Certified residue-sieve values agree with exhaustive search, for every
//! strategy and with or without local search.

use certmin_harness::contract::ProofWorldV1;
use certmin_harness::runner::run_proof;
use certmin_harness::worlds::residue_sieve::{CandidateSet, ResidueGuide, ResidueSieve};
use certmin_kernel::choice::Choice;
use certmin_search::strategy::{FewestCasesStrategy, FirstGroupStrategy, ProofStrategy};
use certmin_search::{prove, ProofOutcome, ProverPolicyV1};
use lock_tests::scenario_fixtures::propagation_only;

fn fixtures() -> Vec<ResidueSieve> {
    let mut worlds: Vec<ResidueSieve> = (3..=8)
        .map(|n| ResidueSieve::first_n(2, n).unwrap())
        .collect();
    worlds.extend((5..=8).map(|n| ResidueSieve::first_n(3, n).unwrap()));
    worlds.push(ResidueSieve::new(2, vec![1, 5, 9]).unwrap());
    worlds.push(ResidueSieve::new(3, vec![2, 3, 7, 11, 13, 19]).unwrap());
    worlds
}

fn certified_value<S>(world: &ResidueSieve, strategy: &S, policy: ProverPolicyV1) -> u64
where
    S: ProofStrategy<CandidateSet>,
{
    let (outcome, _) = prove(world, strategy, world.root_payload(), None, policy).unwrap();
    match outcome {
        ProofOutcome::Certified(cert) => cert.value,
        ProofOutcome::Inconclusive { subject_bracket, .. } => {
            panic!("{:?}: inconclusive at {subject_bracket}", world.candidates())
        }
    }
}

#[test]
fn certified_values_match_brute_force() {
    for world in fixtures() {
        let expected = world.brute_force_minimum();
        for policy in [ProverPolicyV1::default(), propagation_only()] {
            assert_eq!(
                certified_value(&world, &ResidueGuide, policy.clone()),
                expected,
                "{:?} residue_guide",
                world.candidates()
            );
            assert_eq!(
                certified_value(&world, &FewestCasesStrategy, policy.clone()),
                expected,
                "{:?} fewest_cases",
                world.candidates()
            );
            assert_eq!(
                certified_value(&world, &FirstGroupStrategy, policy),
                expected,
                "{:?} first_group",
                world.candidates()
            );
        }
    }
}

#[test]
fn cut_subject_matches_brute_force_of_its_class() {
    let world = ResidueSieve::first_n(2, 8).unwrap();
    let root = world.candidates();
    for choice in [Choice::new(0, 0, 1), Choice::new(1, 0, 0), Choice::new(1, 1, 2)] {
        let class = root.answering(choice.group(), choice.p);
        let expected = if class.len() < 2 {
            0
        } else {
            ResidueSieve::new(2, class.values().to_vec())
                .unwrap()
                .brute_force_minimum()
        };
        let run = run_proof(&world, &ResidueGuide, Some(choice), ProverPolicyV1::default())
            .unwrap();
        assert_eq!(run.value(), Some(expected), "cut {choice:?} on {class:?}");
        let ProofOutcome::Certified(cert) = &run.outcome else {
            unreachable!()
        };
        assert_ne!(cert.subject.get(), 0);
        assert_eq!(cert.cut, Some(choice));
    }
}

#[test]
fn local_search_does_not_change_values() {
    let world = ResidueSieve::first_n(3, 8).unwrap();
    let tight = ProverPolicyV1 {
        max_proof_steps: 3,
        proof_chunk_size: 1,
        ..ProverPolicyV1::default()
    };
    assert_eq!(
        certified_value(&world, &ResidueGuide, tight),
        world.brute_force_minimum()
    );
}
