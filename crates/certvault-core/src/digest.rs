//! # Certificate Digest: Content-Addressed Identity
//!
//! A certificate is identified by the SHA-256 digest of its file bytes,
//! rendered as 64 lowercase hexadecimal characters.
//!
//! ## Security Invariant
//!
//! A [`CertificateDigest`] is either computed from bytes ([`compute_digest`],
//! [`digest_reader`], [`digest_file`]) or validated from client input by
//! [`CertificateDigest::parse`]. There is no unchecked constructor, so every
//! digest reaching the store is well-formed and normalized to lowercase.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Read buffer size for streaming digests.
const READ_CHUNK: usize = 64 * 1024;

/// A validated, lowercase, 64-character hex SHA-256 digest.
///
/// Serializes as a plain string. Deserialization runs the same validation
/// as [`CertificateDigest::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct CertificateDigest(
    #[schema(example = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")] String,
);

impl CertificateDigest {
    /// Validate client input as a digest.
    ///
    /// Accepts exactly 64 hex characters in either case and normalizes to
    /// lowercase. Surrounding whitespace is not stripped.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.is_empty() {
            return Err(ValidationError::MissingDigest);
        }
        let actual = input.chars().count();
        if actual != DIGEST_HEX_LEN {
            return Err(ValidationError::InvalidDigestLength { actual });
        }
        if let Some((position, character)) = input
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii_hexdigit())
        {
            return Err(ValidationError::InvalidDigestCharacter {
                position,
                character,
            });
        }
        Ok(Self(input.to_ascii_lowercase()))
    }

    /// Validate an optional input, treating `None` as a missing digest.
    pub fn parse_optional(input: Option<&str>) -> Result<Self, ValidationError> {
        Self::parse(input.unwrap_or_default())
    }

    /// Build a digest from raw SHA-256 output.
    fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// The lowercase hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A shortened form for log lines and CLI output.
    pub fn short(&self) -> &str {
        &self.0[..16]
    }
}

impl std::fmt::Display for CertificateDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CertificateDigest {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CertificateDigest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CertificateDigest> for String {
    fn from(digest: CertificateDigest) -> Self {
        digest.0
    }
}

impl AsRef<str> for CertificateDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the SHA-256 digest of an in-memory byte slice.
pub fn compute_digest(bytes: &[u8]) -> CertificateDigest {
    CertificateDigest::from_bytes(&Sha256::digest(bytes))
}

/// Compute the SHA-256 digest of everything a reader yields.
///
/// Reads in fixed-size chunks so large certificate files are never held in
/// memory whole.
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<CertificateDigest> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(CertificateDigest::from_bytes(&hasher.finalize()))
}

/// Compute the SHA-256 digest of a file on disk.
pub fn digest_file(path: impl AsRef<Path>) -> std::io::Result<CertificateDigest> {
    let file = std::fs::File::open(path.as_ref())?;
    digest_reader(std::io::BufReader::new(file))
}
