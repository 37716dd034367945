//! In-memory artifact bundle: the output of a proof run.
//!
//! No file I/O in this module. The bundle is a deterministic in-memory
//! representation that can be inspected programmatically.
//!
//! # Normative vs observational artifacts
//!
//! Each artifact is tagged `normative` (participates in bundle digest)
//! or observational (present in the manifest but excluded from digest).
//! The runner's JSON artifacts are normative; its round summary is
//! observational, so it can be reworded without moving the digest.
//!
//! The bundle digest is computed over the **digest basis**: a canonical
//! JSON projection of normative artifact hashes only.

use std::collections::BTreeMap;
use std::fmt;

use certmin_kernel::proof::canon::canonical_json_bytes;
use certmin_kernel::proof::hash::{canonical_hash, ContentHash};
use certmin_kernel::proof::hash_domain::HashDomain;

/// Domain prefix for bundle artifact content hashing.
pub const DOMAIN_BUNDLE_ARTIFACT: HashDomain = HashDomain::BundleArtifact;

/// Domain prefix for bundle digest computation.
pub const DOMAIN_BUNDLE_DIGEST: HashDomain = HashDomain::BundleDigest;

pub const FIXTURE_ARTIFACT: &str = "fixture.json";
pub const POLICY_ARTIFACT: &str = "policy.json";
pub const PROOF_LOG_ARTIFACT: &str = "proof_log.json";
pub const OUTCOME_ARTIFACT: &str = "outcome.json";
/// Human-readable per-round summary. Observational.
pub const ROUND_SUMMARY_ARTIFACT: &str = "round_summary.txt";

/// A single artifact in the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleArtifact {
    /// Logical filename (e.g., `"fixture.json"`).
    pub name: String,
    pub content: Vec<u8>,
    /// `canonical_hash(DOMAIN_BUNDLE_ARTIFACT, content)`.
    pub content_hash: ContentHash,
    /// Whether this artifact participates in the bundle digest.
    pub normative: bool,
}

/// The complete artifact bundle of a proof run.
#[derive(Debug, Clone)]
pub struct ArtifactBundleV1 {
    /// Artifacts indexed by logical name, in sorted order.
    pub artifacts: BTreeMap<String, BundleArtifact>,
    /// Full manifest: canonical JSON listing all artifacts with normative flags.
    pub manifest: Vec<u8>,
    /// Digest basis: canonical JSON listing normative artifact hashes only.
    pub digest_basis: Vec<u8>,
    /// `canonical_hash(DOMAIN_BUNDLE_DIGEST, digest_basis)`.
    pub digest: ContentHash,
}

impl ArtifactBundleV1 {
    #[must_use]
    pub fn artifact(&self, name: &str) -> Option<&BundleArtifact> {
        self.artifacts.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleBuildError {
    /// Canonical JSON serialization failed.
    CanonError { detail: String },
    /// Two inputs share a name.
    DuplicateArtifact { name: String },
}

impl fmt::Display for BundleBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CanonError { detail } => write!(f, "canonical JSON error: {detail}"),
            Self::DuplicateArtifact { name } => write!(f, "duplicate artifact name: {name}"),
        }
    }
}

impl std::error::Error for BundleBuildError {}

/// Build an `ArtifactBundleV1` from `(name, content, normative)` triples.
///
/// Computes content hashes, builds the sorted manifest and digest basis, and
/// derives the bundle digest.
///
/// # Errors
///
/// [`BundleBuildError`] on a duplicate name or a canonicalization failure.
pub fn build_bundle(
    artifacts: Vec<(String, Vec<u8>, bool)>,
) -> Result<ArtifactBundleV1, BundleBuildError> {
    let mut artifact_map = BTreeMap::new();

    for (name, content, normative) in artifacts {
        if artifact_map.contains_key(&name) {
            return Err(BundleBuildError::DuplicateArtifact { name });
        }
        let content_hash = canonical_hash(DOMAIN_BUNDLE_ARTIFACT, &content);
        artifact_map.insert(
            name.clone(),
            BundleArtifact {
                name,
                content,
                content_hash,
                normative,
            },
        );
    }

    let manifest = compute_manifest_bytes(&artifact_map)
        .map_err(|detail| BundleBuildError::CanonError { detail })?;
    let digest_basis = compute_digest_basis_bytes(&artifact_map)
        .map_err(|detail| BundleBuildError::CanonError { detail })?;
    let digest = canonical_hash(DOMAIN_BUNDLE_DIGEST, &digest_basis);

    Ok(ArtifactBundleV1 {
        artifacts: artifact_map,
        manifest,
        digest_basis,
        digest,
    })
}

/// Error from bundle integrity verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleVerifyError {
    /// An artifact's stored `content_hash` does not match recomputed hash.
    ContentHashMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },
    /// Stored `manifest` bytes do not match the manifest recomputed from artifacts.
    ManifestMismatch,
    ManifestNotCanonical,
    /// Stored `digest_basis` bytes do not match the normative projection.
    DigestBasisMismatch,
    DigestBasisNotCanonical,
    DigestMismatch { expected: String, actual: String },
    /// A normative JSON artifact is not in canonical JSON form.
    ArtifactNotCanonical { artifact: String },
    /// `outcome.json` is present but an artifact it binds to is not.
    BoundArtifactMissing { artifact: String },
    /// `outcome.json` is not valid JSON.
    OutcomeParseError { detail: String },
    /// `outcome.json` is missing a binding field.
    OutcomeFieldMissing { field: String },
    /// A digest declared in `outcome.json` does not match the artifact.
    BindingMismatch {
        field: String,
        declared: String,
        recomputed: String,
    },
    CanonError { detail: String },
}

impl fmt::Display for BundleVerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentHashMismatch {
                artifact,
                expected,
                actual,
            } => write!(
                f,
                "content hash mismatch for {artifact}: expected {expected}, got {actual}"
            ),
            Self::ManifestMismatch => write!(f, "manifest does not match artifacts"),
            Self::ManifestNotCanonical => write!(f, "manifest is not canonical JSON"),
            Self::DigestBasisMismatch => write!(f, "digest basis does not match artifacts"),
            Self::DigestBasisNotCanonical => write!(f, "digest basis is not canonical JSON"),
            Self::DigestMismatch { expected, actual } => {
                write!(f, "bundle digest mismatch: expected {expected}, got {actual}")
            }
            Self::ArtifactNotCanonical { artifact } => {
                write!(f, "artifact {artifact} is not canonical JSON")
            }
            Self::BoundArtifactMissing { artifact } => {
                write!(f, "outcome binds to missing artifact {artifact}")
            }
            Self::OutcomeParseError { detail } => write!(f, "outcome parse error: {detail}"),
            Self::OutcomeFieldMissing { field } => write!(f, "outcome is missing {field}"),
            Self::BindingMismatch {
                field,
                declared,
                recomputed,
            } => write!(
                f,
                "{field} mismatch: declared {declared}, recomputed {recomputed}"
            ),
            Self::CanonError { detail } => write!(f, "canonical JSON error: {detail}"),
        }
    }
}

impl std::error::Error for BundleVerifyError {}

/// Digest fields of `outcome.json`, the artifact each covers, and the hash
/// domain it is computed under.
pub const OUTCOME_BINDINGS: [(&str, &str, HashDomain); 3] = [
    ("fixture_digest", FIXTURE_ARTIFACT, HashDomain::WorldFixture),
    ("policy_digest", POLICY_ARTIFACT, HashDomain::PolicySnapshot),
    ("proof_log_digest", PROOF_LOG_ARTIFACT, HashDomain::ProofLog),
];

/// Verify the internal consistency of a bundle.
///
/// Pure integrity check. It proves:
///
/// 1. Each artifact's `content_hash` matches `canonical_hash(DOMAIN_BUNDLE_ARTIFACT, content)`.
/// 2. `manifest` bytes match the canonical projection of all artifacts.
/// 3. `digest_basis` bytes match the canonical projection of normative artifacts.
/// 4. `digest` matches `canonical_hash(DOMAIN_BUNDLE_DIGEST, digest_basis)`.
/// 5. `manifest`, `digest_basis` and normative `.json` artifacts are canonical.
/// 6. If `outcome.json` exists, each digest it declares matches the bound
///    artifact hashed under that artifact's own domain.
///
/// # Errors
///
/// Returns the first [`BundleVerifyError`] encountered.
pub fn verify_bundle(bundle: &ArtifactBundleV1) -> Result<(), BundleVerifyError> {
    for artifact in bundle.artifacts.values() {
        let recomputed = canonical_hash(DOMAIN_BUNDLE_ARTIFACT, &artifact.content);
        if recomputed != artifact.content_hash {
            return Err(BundleVerifyError::ContentHashMismatch {
                artifact: artifact.name.clone(),
                expected: artifact.content_hash.as_str().to_string(),
                actual: recomputed.as_str().to_string(),
            });
        }
    }

    let expected_manifest = compute_manifest_bytes(&bundle.artifacts)
        .map_err(|detail| BundleVerifyError::CanonError { detail })?;
    if expected_manifest != bundle.manifest {
        return Err(BundleVerifyError::ManifestMismatch);
    }
    if !is_canonical_json(&bundle.manifest) {
        return Err(BundleVerifyError::ManifestNotCanonical);
    }

    let expected_basis = compute_digest_basis_bytes(&bundle.artifacts)
        .map_err(|detail| BundleVerifyError::CanonError { detail })?;
    if expected_basis != bundle.digest_basis {
        return Err(BundleVerifyError::DigestBasisMismatch);
    }
    if !is_canonical_json(&bundle.digest_basis) {
        return Err(BundleVerifyError::DigestBasisNotCanonical);
    }

    let recomputed_digest = canonical_hash(DOMAIN_BUNDLE_DIGEST, &bundle.digest_basis);
    if recomputed_digest != bundle.digest {
        return Err(BundleVerifyError::DigestMismatch {
            expected: bundle.digest.as_str().to_string(),
            actual: recomputed_digest.as_str().to_string(),
        });
    }

    for artifact in bundle.artifacts.values() {
        let is_json = std::path::Path::new(&artifact.name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if artifact.normative && is_json && !is_canonical_json(&artifact.content) {
            return Err(BundleVerifyError::ArtifactNotCanonical {
                artifact: artifact.name.clone(),
            });
        }
    }

    verify_outcome_bindings(bundle)
}

fn verify_outcome_bindings(bundle: &ArtifactBundleV1) -> Result<(), BundleVerifyError> {
    let Some(outcome_artifact) = bundle.artifact(OUTCOME_ARTIFACT) else {
        return Ok(());
    };
    let outcome: serde_json::Value = serde_json::from_slice(&outcome_artifact.content)
        .map_err(|e| BundleVerifyError::OutcomeParseError {
            detail: e.to_string(),
        })?;

    for (field, name, domain) in OUTCOME_BINDINGS {
        let declared =
            outcome[field]
                .as_str()
                .ok_or_else(|| BundleVerifyError::OutcomeFieldMissing {
                    field: field.to_string(),
                })?;
        let bound = bundle
            .artifact(name)
            .ok_or_else(|| BundleVerifyError::BoundArtifactMissing {
                artifact: name.to_string(),
            })?;
        let recomputed = canonical_hash(domain, &bound.content);
        if recomputed.as_str() != declared {
            return Err(BundleVerifyError::BindingMismatch {
                field: field.to_string(),
                declared: declared.to_string(),
                recomputed: recomputed.as_str().to_string(),
            });
        }
    }
    Ok(())
}

/// Recompute manifest bytes from the artifact map.
pub(crate) fn compute_manifest_bytes(
    artifacts: &BTreeMap<String, BundleArtifact>,
) -> Result<Vec<u8>, String> {
    let manifest_artifacts: Vec<serde_json::Value> = artifacts
        .values()
        .map(|a| {
            serde_json::json!({
                "content_hash": a.content_hash.as_str(),
                "name": a.name,
                "normative": a.normative,
            })
        })
        .collect();

    let manifest_value = serde_json::json!({
        "artifacts": manifest_artifacts,
        "schema_version": "bundle.v1",
    });

    canonical_json_bytes(&manifest_value).map_err(|e| e.to_string())
}

/// Recompute digest basis bytes from normative artifacts only.
pub(crate) fn compute_digest_basis_bytes(
    artifacts: &BTreeMap<String, BundleArtifact>,
) -> Result<Vec<u8>, String> {
    let normative_artifacts: Vec<serde_json::Value> = artifacts
        .values()
        .filter(|a| a.normative)
        .map(|a| {
            serde_json::json!({
                "content_hash": a.content_hash.as_str(),
                "name": a.name,
            })
        })
        .collect();

    let digest_basis_value = serde_json::json!({
        "artifacts": normative_artifacts,
        "schema_version": "bundle_digest_basis.v1",
    });

    canonical_json_bytes(&digest_basis_value).map_err(|e| e.to_string())
}

/// Parse, re-canonicalize and compare.
fn is_canonical_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .ok()
        .and_then(|value| canonical_json_bytes(&value).ok())
        .is_some_and(|recanonized| recanonized == bytes)
}
