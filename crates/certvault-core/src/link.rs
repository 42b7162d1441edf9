//! Shareable verification links.
//!
//! A link binds a random token to one certificate digest. It can be redeemed
//! once, before it expires.

use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::digest::CertificateDigest;

/// Random bytes per token. Tokens are hex encoded, so twice as many chars.
pub const TOKEN_BYTES: usize = 32;

/// Shortest accepted link lifetime.
pub const MIN_LINK_TTL_SECS: u64 = 60;

/// Longest accepted link lifetime (30 days).
pub const MAX_LINK_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Lifetime used when neither the request nor the config names one.
pub const DEFAULT_LINK_TTL_SECS: u64 = 24 * 60 * 60;

/// Generate a fresh link token from the OS random source.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Clamp a requested lifetime into the accepted range.
pub fn clamp_ttl(secs: u64) -> u64 {
    secs.clamp(MIN_LINK_TTL_SECS, MAX_LINK_TTL_SECS)
}

/// A single-use verification link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLink {
    pub token: String,
    pub certificate_hash: CertificateDigest,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VerificationLink {
    /// A new unused link expiring `ttl_secs` (clamped) after `now`.
    pub fn new(certificate_hash: CertificateDigest, ttl_secs: u64, now: DateTime<Utc>) -> Self {
        // clamp_ttl bounds the value well inside i64.
        let ttl = Duration::seconds(clamp_ttl(ttl_secs) as i64);
        Self {
            token: generate_token(),
            certificate_hash,
            expires_at: now + ttl,
            used: false,
            used_at: None,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True while the link is unused and unexpired.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }
}
