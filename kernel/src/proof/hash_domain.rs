//! Domain separators for canonical hashing.
//!
//! Every digest in the workspace is computed over `domain || data`, where
//! `domain` is one of the byte strings below. Adding a domain is a single
//! entry in the macro invocation; the enum, `as_bytes()` and `ALL` follow.

macro_rules! hash_domains {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $bytes:expr
        ),+ $(,)?
    ) => {
        /// Typed domain separator for [`super::hash::canonical_hash`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HashDomain {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HashDomain {
            /// Null-terminated separator bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $( Self::$variant => $bytes, )+
                }
            }

            /// Every domain, in declaration order.
            pub const ALL: &[HashDomain] = &[
                $( Self::$variant, )+
            ];
        }

        impl core::fmt::Display for HashDomain {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $( Self::$variant => f.write_str(stringify!($variant)), )+
                }
            }
        }
    };
}

hash_domains! {
    // Search
    /// Per-round proof log (`ProofLogV1`).
    ProofLog => b"CERTMIN::PROOF_LOG::V1\0",

    /// Prover policy snapshot.
    PolicySnapshot => b"CERTMIN::POLICY_SNAPSHOT::V1\0",

    /// Certificate or inconclusive outcome report.
    OutcomeReport => b"CERTMIN::OUTCOME_REPORT::V1\0",

    // Harness
    /// Content hash of a single bundle artifact.
    BundleArtifact => b"CERTMIN::BUNDLE_ARTIFACT::V1\0",

    /// Bundle digest over the normative artifacts.
    BundleDigest => b"CERTMIN::BUNDLE_DIGEST::V1\0",

    /// Proof world fixture description.
    WorldFixture => b"CERTMIN::WORLD_FIXTURE::V1\0",
}
