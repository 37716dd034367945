//! World contract: what the runner needs from a proof world.
//!
//! A world is an [`AvailabilityOracle`] that can also name itself, hand out
//! its root payload, and describe its fixture as JSON. Worlds do not hash,
//! write bundles, or enforce policy; the runner owns those concerns.

use certmin_search::contract::AvailabilityOracle;

/// The contract a world must implement to be run by [`crate::runner::run_proof`].
pub trait ProofWorldV1: AvailabilityOracle {
    /// Unique world identifier (e.g., `"residue_sieve"`).
    fn world_id(&self) -> &str;

    /// Payload of the root node.
    fn root_payload(&self) -> Self::Payload;

    /// Fixture description. Must contain only integers, strings, booleans,
    /// arrays, objects and nulls so it has a canonical form.
    fn fixture_json(&self) -> serde_json::Value;
}
