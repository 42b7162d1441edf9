//! # certvault-core: Foundational Types for certvault
//!
//! Defines the type-system primitives shared by the API service and the CLI.
//! Every other crate in the workspace depends on `certvault-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated digest newtype.** A [`CertificateDigest`] can only be built
//!    by hashing bytes or by passing [`CertificateDigest::parse`]. No bare
//!    strings flow into the store as identity keys.
//!
//! 2. **Closed verification outcome.** [`VerificationOutcome`] enumerates
//!    exactly VERIFIED, TAMPERED, REVOKED and ERROR. Each variant carries only
//!    its own payload, and the `status` discriminator is always present on
//!    the wire.
//!
//! 3. **Append-only history.** Lifecycle events and verification log entries
//!    have constructors but no mutators.
//!
//! 4. **UTC-only timestamps** via `chrono::DateTime<Utc>`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `certvault-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod audit;
pub mod digest;
pub mod error;
pub mod link;
pub mod outcome;
pub mod record;
pub mod reputation;

// Re-export primary types for ergonomic imports.
pub use audit::{VerificationLogEntry, VerificationResult};
pub use digest::{compute_digest, digest_file, digest_reader, CertificateDigest, DIGEST_HEX_LEN};
pub use error::ValidationError;
pub use link::{clamp_ttl, generate_token, VerificationLink, DEFAULT_LINK_TTL_SECS};
pub use outcome::{VerificationOutcome, TAMPERED_MESSAGE};
pub use record::{
    CertificateMetadata, CertificateRecord, CertificateView, LifecycleEvent, LifecycleStatus,
};
pub use reputation::{trust_score, IssuerReputation, DEFAULT_TRUST_SCORE};
