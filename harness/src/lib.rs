//! Certmin harness: worlds, proof runs, and their artifact bundles.
//!
//! The harness runs a world through `certmin_search::prove` and packages the
//! result as a self-contained artifact bundle (`fixture.json`, `policy.json`,
//! `proof_log.json`, `outcome.json`). It does not implement proof logic.
//! Worlds provide domain data only; the harness owns orchestration.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bundle;
pub mod bundle_dir;
pub mod contract;
pub mod runner;
pub mod worlds;
