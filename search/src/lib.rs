//! Certmin search: certified branch-and-bound over a growing proof tree.
//!
//! Depends only on `certmin_kernel`; worlds, bundles and the CLI live in
//! `certmin_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! certmin_kernel  <-  certmin_search  <-  certmin_harness
//! (choices, hash)     (arena, prover)     (worlds, bundles, cli)
//! ```
//!
//! # Key types
//!
//! - [`NodeArena`] with [`Bracket`] and [`ChildSlot`]: the proof tree
//! - [`AvailabilityOracle`]: legality and terminality, supplied by a world
//! - [`ProofStrategy`]: group selection for local search
//! - [`Prover`]: the round orchestrator, with [`ProverPolicyV1`] limits
//! - [`ProofLogV1`]: per-round audit log

#![forbid(unsafe_code)]

pub mod arena;
pub mod contract;
pub mod error;
pub mod expand;
pub mod graph;
pub mod local_search;
pub mod policy;
pub mod propagate;
pub mod prover;
pub mod prune;
pub mod strategy;


pub use arena::{Bracket, ChildSlot, NodeArena, NodeIndex};
pub use contract::{AvailabilityOracle, Verdict};
pub use error::SearchError;
pub use graph::ProofLogV1;
pub use policy::ProverPolicyV1;
pub use prover::{prove, Certificate, ProofOutcome, ProofStatus, Prover};
pub use strategy::ProofStrategy;
