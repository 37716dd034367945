//! Persisted bundles: write, read back, verify, and fail closed on
//! tampering.

use std::fs;

use certmin_harness::bundle::BundleVerifyError;
use certmin_harness::bundle_dir::{
    read_bundle_dir, verify_bundle_dir, write_bundle_dir, BundleDirReadError,
    BundleDirVerifyError,
};
use certmin_harness::runner::{run_proof, ProofBundleV1};
use certmin_harness::worlds::residue_sieve::{ResidueGuide, ResidueSieve};
use certmin_search::ProverPolicyV1;
use lock_tests::bundle_test_helpers::{rebuild_with_modified_artifact, rebuild_without_artifact};

fn certified_run() -> ProofBundleV1 {
    let world = ResidueSieve::first_n(2, 6).unwrap();
    run_proof(&world, &ResidueGuide, None, ProverPolicyV1::default()).unwrap()
}

#[test]
fn round_trip_preserves_digest_and_content() {
    let run = certified_run();
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&run.bundle, dir.path()).unwrap();

    let loaded = verify_bundle_dir(dir.path()).unwrap();
    assert_eq!(loaded.digest, run.bundle.digest);
    assert_eq!(loaded.manifest, run.bundle.manifest);
    for (name, artifact) in &run.bundle.artifacts {
        assert_eq!(loaded.artifacts[name].content, artifact.content, "{name}");
        assert_eq!(loaded.artifacts[name].normative, artifact.normative, "{name}");
    }
    assert!(!loaded.artifacts["round_summary.txt"].normative);
}

#[test]
fn edited_round_summary_fails_closed() {
    let run = certified_run();
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&run.bundle, dir.path()).unwrap();
    fs::write(dir.path().join("round_summary.txt"), b"annotated\n").unwrap();

    let err = verify_bundle_dir(dir.path()).unwrap_err();
    match err {
        BundleDirVerifyError::VerifyError(BundleVerifyError::ContentHashMismatch {
            artifact,
            ..
        }) => assert_eq!(artifact, "round_summary.txt"),
        other => panic!("expected a content hash mismatch, got {other}"),
    }
}

#[test]
fn second_write_overwrites_cleanly() {
    let run = certified_run();
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&run.bundle, dir.path()).unwrap();
    write_bundle_dir(&run.bundle, dir.path()).unwrap();
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
        .collect();
    assert!(leftovers.is_empty());
    verify_bundle_dir(dir.path()).unwrap();
}

#[test]
fn tampered_artifact_fails_verification() {
    let run = certified_run();
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&run.bundle, dir.path()).unwrap();
    fs::write(dir.path().join("outcome.json"), b"{\"value\":1}").unwrap();

    let err = verify_bundle_dir(dir.path()).unwrap_err();
    match err {
        BundleDirVerifyError::VerifyError(BundleVerifyError::ContentHashMismatch {
            artifact,
            ..
        }) => assert_eq!(artifact, "outcome.json"),
        other => panic!("expected a content hash mismatch, got {other}"),
    }
}

#[test]
fn extra_and_missing_files_fail_closed() {
    let run = certified_run();
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&run.bundle, dir.path()).unwrap();

    fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
    assert!(matches!(
        read_bundle_dir(dir.path()).unwrap_err(),
        BundleDirReadError::ExtraFile { .. }
    ));
    fs::remove_file(dir.path().join("notes.txt")).unwrap();

    fs::remove_file(dir.path().join("policy.json")).unwrap();
    assert!(matches!(
        read_bundle_dir(dir.path()).unwrap_err(),
        BundleDirReadError::MissingArtifact { .. }
    ));
}

#[test]
fn consistent_rewrite_of_a_bound_artifact_still_verifies() {
    let run = certified_run();
    let rebuilt = rebuild_with_modified_artifact(&run.bundle, "policy.json", |v| {
        v["max_rounds"] = serde_json::json!(7);
    });
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&rebuilt, dir.path()).unwrap();
    let loaded = verify_bundle_dir(dir.path()).unwrap();
    assert_ne!(loaded.digest, run.bundle.digest);
}

#[test]
fn stale_outcome_binding_is_rejected() {
    let run = certified_run();
    let rebuilt = rebuild_with_modified_artifact(&run.bundle, "outcome.json", |v| {
        v["policy_digest"] = serde_json::json!(format!("sha256:{}", "0".repeat(64)));
    });
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&rebuilt, dir.path()).unwrap();

    let err = verify_bundle_dir(dir.path()).unwrap_err();
    match err {
        BundleDirVerifyError::VerifyError(BundleVerifyError::BindingMismatch { field, .. }) => {
            assert_eq!(field, "policy_digest");
        }
        other => panic!("expected a binding mismatch, got {other}"),
    }
}

#[test]
fn bundle_without_proof_log_is_rejected() {
    let run = certified_run();
    let rebuilt = rebuild_without_artifact(&run.bundle, "proof_log.json");
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&rebuilt, dir.path()).unwrap();

    let err = verify_bundle_dir(dir.path()).unwrap_err();
    assert!(
        matches!(
            err,
            BundleDirVerifyError::VerifyError(BundleVerifyError::BoundArtifactMissing { .. })
        ),
        "{err}"
    );
}
