//! Canonical serialization and domain-separated hashing.

pub mod canon;
pub mod hash;
pub mod hash_domain;
