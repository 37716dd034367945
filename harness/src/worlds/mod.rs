//! World implementations for the harness runner.

pub mod residue_sieve;
pub mod scripted;
