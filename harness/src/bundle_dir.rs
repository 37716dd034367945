//! Bundle directory persistence: write, read and verify an
//! [`ArtifactBundleV1`] on disk.
//!
//! # Layout
//!
//! ```text
//! <dir>/
//!   bundle_manifest.json       canonical JSON, every artifact
//!   bundle_digest_basis.json   canonical JSON, normative artifacts only
//!   bundle_digest.txt          "sha256:..."
//!   fixture.json
//!   policy.json
//!   proof_log.json
//!   outcome.json
//! ```
//!
//! The directory path is never hashed. The manifest's list of artifacts is
//! the source of truth; reading fails closed on a missing declared file, an
//! undeclared extra file, or a digest that does not match.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use certmin_kernel::proof::hash::{canonical_hash, ContentHash};

use crate::bundle::{
    verify_bundle, ArtifactBundleV1, BundleArtifact, BundleVerifyError, DOMAIN_BUNDLE_DIGEST,
};

const MANIFEST_FILENAME: &str = "bundle_manifest.json";
const DIGEST_BASIS_FILENAME: &str = "bundle_digest_basis.json";
const DIGEST_FILENAME: &str = "bundle_digest.txt";

const METADATA_FILENAMES: [&str; 3] = [MANIFEST_FILENAME, DIGEST_BASIS_FILENAME, DIGEST_FILENAME];

/// Prefix of in-flight files written by [`write_atomic`].
const TEMP_PREFIX: &str = ".tmp_";

#[derive(Debug)]
pub enum BundleDirWriteError {
    Io { detail: String },
    /// An artifact name would escape the directory or collide with metadata.
    InvalidArtifactName { name: String },
}

impl fmt::Display for BundleDirWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { detail } => write!(f, "I/O error: {detail}"),
            Self::InvalidArtifactName { name } => write!(f, "invalid artifact name: {name}"),
        }
    }
}

impl std::error::Error for BundleDirWriteError {}

#[derive(Debug)]
pub enum BundleDirReadError {
    Io { detail: String },
    /// A required metadata file is missing.
    MissingMetadata { filename: String },
    /// A declared artifact file is missing from the directory.
    MissingArtifact { name: String },
    /// An undeclared file exists in the directory.
    ExtraFile { name: String },
    ManifestParseError { detail: String },
    /// Manifest `schema_version` is not `bundle.v1`.
    ManifestVersionMismatch { found: String },
    /// An artifact entry in the manifest is missing a field or malformed.
    ManifestEntryInvalid { detail: String },
    /// `bundle_digest.txt` does not match the digest of the stored basis.
    DigestMismatch { stored: String, recomputed: String },
}

impl fmt::Display for BundleDirReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { detail } => write!(f, "I/O error: {detail}"),
            Self::MissingMetadata { filename } => write!(f, "missing metadata file: {filename}"),
            Self::MissingArtifact { name } => write!(f, "missing artifact: {name}"),
            Self::ExtraFile { name } => write!(f, "undeclared extra file: {name}"),
            Self::ManifestParseError { detail } => write!(f, "manifest parse error: {detail}"),
            Self::ManifestVersionMismatch { found } => {
                write!(f, "manifest version mismatch: {found}")
            }
            Self::ManifestEntryInvalid { detail } => write!(f, "manifest entry invalid: {detail}"),
            Self::DigestMismatch { stored, recomputed } => {
                write!(f, "digest mismatch: stored={stored}, recomputed={recomputed}")
            }
        }
    }
}

impl std::error::Error for BundleDirReadError {}

#[derive(Debug)]
pub enum BundleDirVerifyError {
    ReadError(BundleDirReadError),
    VerifyError(BundleVerifyError),
}

impl fmt::Display for BundleDirVerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadError(e) => write!(f, "read error: {e}"),
            Self::VerifyError(e) => write!(f, "verify error: {e}"),
        }
    }
}

impl std::error::Error for BundleDirVerifyError {}

/// Write `bundle` into `dir`, creating it if needed.
///
/// # Errors
///
/// [`BundleDirWriteError`] on I/O failure or an artifact name that is not a
/// plain file name.
pub fn write_bundle_dir(bundle: &ArtifactBundleV1, dir: &Path) -> Result<(), BundleDirWriteError> {
    for name in bundle.artifacts.keys() {
        if !is_plain_artifact_name(name) {
            return Err(BundleDirWriteError::InvalidArtifactName { name: name.clone() });
        }
    }

    std::fs::create_dir_all(dir).map_err(|e| BundleDirWriteError::Io {
        detail: format!("create {}: {e}", dir.display()),
    })?;

    for artifact in bundle.artifacts.values() {
        write_atomic(dir, &artifact.name, &artifact.content)?;
    }
    write_atomic(dir, MANIFEST_FILENAME, &bundle.manifest)?;
    write_atomic(dir, DIGEST_BASIS_FILENAME, &bundle.digest_basis)?;
    write_atomic(dir, DIGEST_FILENAME, bundle.digest.as_str().as_bytes())?;
    Ok(())
}

/// Read a bundle directory back into memory.
///
/// Checks the directory's shape and the stored digest. Artifact content is
/// not re-hashed here; [`verify_bundle_dir`] does that.
///
/// # Errors
///
/// [`BundleDirReadError`] on any missing, extra or malformed file.
pub fn read_bundle_dir(dir: &Path) -> Result<ArtifactBundleV1, BundleDirReadError> {
    let manifest = read_required(dir, MANIFEST_FILENAME)?;
    let digest_basis = read_required(dir, DIGEST_BASIS_FILENAME)?;
    let stored_digest = read_required(dir, DIGEST_FILENAME)?;

    let manifest_value: serde_json::Value = serde_json::from_slice(&manifest)
        .map_err(|e| BundleDirReadError::ManifestParseError {
            detail: e.to_string(),
        })?;
    let version = manifest_value["schema_version"].as_str().unwrap_or_default();
    if version != "bundle.v1" {
        return Err(BundleDirReadError::ManifestVersionMismatch {
            found: version.to_string(),
        });
    }
    let entries = manifest_value["artifacts"].as_array().ok_or_else(|| {
        BundleDirReadError::ManifestParseError {
            detail: "\"artifacts\" is not an array".into(),
        }
    })?;

    let mut artifacts = BTreeMap::new();
    for entry in entries {
        let (name, content_hash, normative) = parse_entry(entry)?;
        let content = std::fs::read(dir.join(&name))
            .map_err(|_| BundleDirReadError::MissingArtifact { name: name.clone() })?;
        artifacts.insert(
            name.clone(),
            BundleArtifact {
                name,
                content,
                content_hash,
                normative,
            },
        );
    }

    for filename in list_files(dir)? {
        let is_metadata = METADATA_FILENAMES.contains(&filename.as_str());
        if !is_metadata && !artifacts.contains_key(&filename) {
            return Err(BundleDirReadError::ExtraFile { name: filename });
        }
    }

    let digest = canonical_hash(DOMAIN_BUNDLE_DIGEST, &digest_basis);
    let stored = String::from_utf8_lossy(&stored_digest).trim().to_string();
    if stored != digest.as_str() {
        return Err(BundleDirReadError::DigestMismatch {
            stored,
            recomputed: digest.as_str().to_string(),
        });
    }

    Ok(ArtifactBundleV1 {
        artifacts,
        manifest,
        digest_basis,
        digest,
    })
}

/// Read `dir` and run [`verify_bundle`] on the result. This is the offline
/// verification entry point.
///
/// # Errors
///
/// [`BundleDirVerifyError`] on read failure or integrity mismatch.
pub fn verify_bundle_dir(dir: &Path) -> Result<ArtifactBundleV1, BundleDirVerifyError> {
    let bundle = read_bundle_dir(dir).map_err(BundleDirVerifyError::ReadError)?;
    verify_bundle(&bundle).map_err(BundleDirVerifyError::VerifyError)?;
    Ok(bundle)
}

fn parse_entry(
    entry: &serde_json::Value,
) -> Result<(String, ContentHash, bool), BundleDirReadError> {
    let invalid = |detail: String| BundleDirReadError::ManifestEntryInvalid { detail };
    let name = entry["name"]
        .as_str()
        .ok_or_else(|| invalid("missing \"name\" field".into()))?;
    if !is_plain_artifact_name(name) {
        return Err(invalid(format!("artifact name {name:?} is not a plain file name")));
    }
    let hash = entry["content_hash"]
        .as_str()
        .ok_or_else(|| invalid(format!("missing \"content_hash\" for {name}")))?;
    let content_hash = ContentHash::parse(hash)
        .ok_or_else(|| invalid(format!("invalid content_hash for {name}: {hash}")))?;
    let normative = entry["normative"]
        .as_bool()
        .ok_or_else(|| invalid(format!("missing \"normative\" for {name}")))?;
    Ok((name.to_string(), content_hash, normative))
}

/// No separators, no dot-prefixed names, no metadata names.
fn is_plain_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !METADATA_FILENAMES.contains(&name)
}

/// Write via a temp file in the same directory, then rename.
fn write_atomic(dir: &Path, filename: &str, content: &[u8]) -> Result<(), BundleDirWriteError> {
    let temp_path = dir.join(format!("{TEMP_PREFIX}{filename}"));
    let path = dir.join(filename);
    std::fs::write(&temp_path, content).map_err(|e| BundleDirWriteError::Io {
        detail: format!("write {}: {e}", temp_path.display()),
    })?;
    std::fs::rename(&temp_path, &path).map_err(|e| BundleDirWriteError::Io {
        detail: format!("rename {} to {}: {e}", temp_path.display(), path.display()),
    })
}

fn read_required(dir: &Path, filename: &str) -> Result<Vec<u8>, BundleDirReadError> {
    std::fs::read(dir.join(filename)).map_err(|_| BundleDirReadError::MissingMetadata {
        filename: filename.to_string(),
    })
}

/// Regular files in `dir`, skipping leftovers of interrupted writes.
fn list_files(dir: &Path) -> Result<BTreeSet<String>, BundleDirReadError> {
    let io = |e: std::io::Error| BundleDirReadError::Io {
        detail: format!("list {}: {e}", dir.display()),
    };
    let mut files = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let entry = entry.map_err(io)?;
        if !entry.file_type().map_err(io)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with(TEMP_PREFIX) {
                files.insert(name.to_string());
            }
        }
    }
    Ok(files)
}
