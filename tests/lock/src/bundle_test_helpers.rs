//! Shared test helpers for mutating and rebuilding artifact bundles.
//!
//! These helpers keep the bundle digest and the `outcome.json` bindings
//! consistent when an artifact is modified, so negative tests exercise the
//! check they intend to and not an incidental digest mismatch.

use certmin_harness::bundle::{
    build_bundle, ArtifactBundleV1, OUTCOME_ARTIFACT, OUTCOME_BINDINGS,
};
use certmin_kernel::proof::canon::canonical_json_bytes;
use certmin_kernel::proof::hash::canonical_hash;

/// Rewrite the JSON artifact `name`, re-bind `outcome.json` to the new
/// content, and rebuild the bundle.
///
/// # Panics
///
/// Panics if `name` or `outcome.json` is missing or not JSON. These are
/// test-only invariants.
pub fn rebuild_with_modified_artifact(
    bundle: &ArtifactBundleV1,
    name: &str,
    modify: impl FnOnce(&mut serde_json::Value),
) -> ArtifactBundleV1 {
    let mut value: serde_json::Value =
        serde_json::from_slice(&bundle.artifacts[name].content).unwrap();
    modify(&mut value);
    let modified = canonical_json_bytes(&value).unwrap();

    let mut contents: Vec<(String, Vec<u8>, bool)> = bundle
        .artifacts
        .values()
        .map(|a| {
            let content = if a.name == name {
                modified.clone()
            } else {
                a.content.clone()
            };
            (a.name.clone(), content, a.normative)
        })
        .collect();

    if name != OUTCOME_ARTIFACT {
        let mut outcome: serde_json::Value =
            serde_json::from_slice(&bundle.artifacts[OUTCOME_ARTIFACT].content).unwrap();
        for (field, bound, domain) in OUTCOME_BINDINGS {
            if bound == name {
                outcome[field] = serde_json::json!(canonical_hash(domain, &modified).as_str());
            }
        }
        let outcome_bytes = canonical_json_bytes(&outcome).unwrap();
        for entry in &mut contents {
            if entry.0 == OUTCOME_ARTIFACT {
                entry.1.clone_from(&outcome_bytes);
            }
        }
    }
    build_bundle(contents).unwrap()
}

/// Rebuild the bundle without the artifact `name`.
///
/// # Panics
///
/// Panics if the rebuilt bundle cannot be assembled.
pub fn rebuild_without_artifact(bundle: &ArtifactBundleV1, name: &str) -> ArtifactBundleV1 {
    let contents = bundle
        .artifacts
        .values()
        .filter(|a| a.name != name)
        .map(|a| (a.name.clone(), a.content.clone(), a.normative))
        .collect();
    build_bundle(contents).unwrap()
}
