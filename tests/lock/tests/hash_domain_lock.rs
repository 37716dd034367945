//! Hash domain governance lock tests.
//!
//! Proves:
//! 1. The domain set has the expected count (catches forgotten additions to `ALL`)
//! 2. All domain byte strings are unique
//! 3. All domains follow the `CERTMIN::*::V1\0` convention
//! 4. `canonical_hash` is exactly `sha256(domain || data)`, hex-encoded
//! 5. No raw `CERTMIN::` domain literals in production source outside `hash_domain.rs`

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use certmin_kernel::proof::hash::canonical_hash;
use certmin_kernel::proof::hash_domain::HashDomain;
use sha2::{Digest, Sha256};

#[test]
fn hash_domain_canonical_set_count() {
    assert_eq!(
        HashDomain::ALL.len(),
        6,
        "expected 6 domain variants; if you added a new domain, update this count"
    );
}

#[test]
fn hash_domain_all_unique_bytes() {
    let mut seen = BTreeSet::new();
    for &domain in HashDomain::ALL {
        assert!(seen.insert(domain.as_bytes()), "duplicate domain bytes: {domain}");
    }
}

#[test]
fn hash_domain_all_follow_naming_convention() {
    for &domain in HashDomain::ALL {
        let bytes = domain.as_bytes();
        assert!(bytes.starts_with(b"CERTMIN::"), "{domain} lacks the CERTMIN:: prefix");
        assert!(bytes.ends_with(b"::V1\0"), "{domain} does not end with ::V1\\0");
        assert_eq!(
            bytes.iter().filter(|&&b| b == 0).count(),
            1,
            "{domain} has an interior null"
        );
    }
}

#[test]
fn canonical_hash_is_domain_prefixed_sha256() {
    let data = b"{\"value\":4}";
    for &domain in HashDomain::ALL {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update(data);
        let expected = format!("sha256:{}", hex::encode(hasher.finalize()));
        assert_eq!(canonical_hash(domain, data).as_str(), expected, "{domain}");
    }
}

#[test]
fn same_bytes_under_different_domains_differ() {
    let a = canonical_hash(HashDomain::ProofLog, b"{}");
    let b = canonical_hash(HashDomain::OutcomeReport, b"{}");
    assert_ne!(a, b);
}

#[test]
fn no_raw_domain_literals_outside_authority() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let pattern = "b\"CERTMIN::";
    let mut violations = Vec::new();
    for crate_dir in ["kernel/src", "search/src", "harness/src"] {
        for path in rust_files(&root.join(crate_dir)) {
            if path.file_name().and_then(|n| n.to_str()) == Some("hash_domain.rs") {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            for (i, line) in content.lines().enumerate() {
                let trimmed = line.trim();
                if !trimmed.starts_with("//") && trimmed.contains(pattern) {
                    violations.push(format!("  {}:{}: {trimmed}", path.display(), i + 1));
                }
            }
        }
    }
    assert!(
        violations.is_empty(),
        "raw CERTMIN:: domain literals outside hash_domain.rs:\n{}",
        violations.join("\n")
    );
}

/// Recursive `.rs` file listing.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut results = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                results.extend(rust_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                results.push(path);
            }
        }
    }
    results
}
