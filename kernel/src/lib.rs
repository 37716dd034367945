//! Certmin kernel: choice-space types and canonical hashing.
//!
//! # Module Dependency Direction
//!
//! `choice` and `proof` are independent. Both `certmin-search` and
//! `certmin-harness` build on them; nothing here depends on either.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod choice;
pub mod proof;
