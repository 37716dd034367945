//! The arena after expansion does not depend on how many candidates go to
//! the oracle per round trip.

use certmin_harness::contract::ProofWorldV1;
use certmin_harness::worlds::residue_sieve::ResidueSieve;
use certmin_search::arena::NodeArena;
use certmin_search::contract::AvailabilityOracle;
use certmin_search::expand::expand_frontier;
use certmin_search::prover::prove;
use certmin_search::strategy::FewestCasesStrategy;
use certmin_search::ProverPolicyV1;
use lock_tests::scenario_fixtures::{arena_snapshot, mixed_tree};

fn expanded_snapshot<W: ProofWorldV1>(world: &W, passes: usize, chunk_size: usize) -> Vec<String>
where
    W::Payload: std::fmt::Debug,
{
    let root = world.root_payload();
    let mask = world.availability(&[&root]).remove(0);
    let mut arena = NodeArena::with_root(world.space(), 1_000_000, root, mask).unwrap();
    let mut chunks = 0;
    for _ in 0..passes {
        chunks += expand_frontier(&mut arena, world, chunk_size).unwrap().chunks;
    }
    if chunk_size == 1 {
        assert!(chunks > passes, "chunk size 1 needs many round trips");
    }
    arena_snapshot(&arena)
}

#[test]
fn residue_expansion_is_chunk_invariant() {
    let world = ResidueSieve::first_n(2, 8).unwrap();
    let baseline = expanded_snapshot(&world, 3, 1000);
    for chunk_size in [1, 3, 7] {
        assert_eq!(
            expanded_snapshot(&world, 3, chunk_size),
            baseline,
            "chunk size {chunk_size}"
        );
    }
}

#[test]
fn scripted_expansion_is_chunk_invariant() {
    let world = mixed_tree();
    let baseline = expanded_snapshot(&world, 2, 1000);
    assert_eq!(expanded_snapshot(&world, 2, 1), baseline);
    assert_eq!(expanded_snapshot(&world, 2, 2), baseline);
}

#[test]
fn proof_run_is_chunk_invariant() {
    let world = ResidueSieve::first_n(2, 7).unwrap();
    let run = |expansion_chunk_size| {
        let policy = ProverPolicyV1 {
            expansion_chunk_size,
            ..ProverPolicyV1::default()
        };
        let (outcome, log) =
            prove(&world, &FewestCasesStrategy, world.root_payload(), None, policy).unwrap();
        let trace: Vec<_> = log
            .rounds
            .iter()
            .map(|r| (r.subject_bracket, r.arena_len, r.inplay_count))
            .collect();
        (outcome, trace)
    };
    let baseline = run(1000);
    for chunk_size in [1, 5] {
        assert_eq!(run(chunk_size), baseline, "chunk size {chunk_size}");
    }
}
