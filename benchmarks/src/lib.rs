//! Shared helpers for certmin benchmark suites.

use certmin_harness::contract::ProofWorldV1;
use certmin_harness::worlds::residue_sieve::ResidueSieve;
use certmin_search::arena::NodeArena;
use certmin_search::contract::AvailabilityOracle;
use certmin_search::expand::expand_frontier;

/// Residue fixtures timed by the suites: `(label, arity, candidate count)`.
pub const RESIDUE_REGIMES: [(&str, u8, u64); 3] =
    [("a2_n6", 2, 6), ("a2_n8", 2, 8), ("a3_n10", 3, 10)];

/// Build the residue fixture for one regime.
///
/// # Panics
///
/// Panics if the regime is not a valid sieve. Benchmark setup failures are
/// fatal.
#[must_use]
pub fn residue_world(arity: u8, count: u64) -> ResidueSieve {
    ResidueSieve::first_n(arity, count).expect("benchmark regime is a valid sieve")
}

/// A fresh single-node arena for `world`.
///
/// # Panics
///
/// Panics if the root has no usable mask.
#[must_use]
pub fn root_arena<W: ProofWorldV1>(world: &W) -> NodeArena<W::Payload> {
    let root = world.root_payload();
    let mask = world
        .availability(&[&root])
        .pop()
        .expect("availability returns one mask per payload");
    NodeArena::with_root(world.space(), 5_000_000, root, mask).expect("root arena")
}

/// An arena expanded `passes` times, without any bounds applied.
///
/// # Panics
///
/// Panics if expansion fails.
#[must_use]
pub fn expanded_arena<W: ProofWorldV1>(world: &W, passes: usize) -> NodeArena<W::Payload> {
    let mut arena = root_arena(world);
    for _ in 0..passes {
        expand_frontier(&mut arena, world, 1000).expect("expansion");
    }
    arena
}
