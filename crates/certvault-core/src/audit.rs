//! Verification audit trail.
//!
//! One [`VerificationLogEntry`] per verification attempt, whatever the
//! outcome. Entries are created once and never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Longest submitted hash kept in a log entry. Invalid submissions can be
/// arbitrarily long.
pub const MAX_LOGGED_HASH_LEN: usize = 128;

/// Longest user agent kept in a log entry.
pub const MAX_LOGGED_USER_AGENT_LEN: usize = 512;

/// Result recorded for a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationResult {
    Verified,
    Tampered,
    Revoked,
    Error,
}

impl VerificationResult {
    /// All results, in display order.
    pub const ALL: [VerificationResult; 4] = [
        Self::Verified,
        Self::Tampered,
        Self::Revoked,
        Self::Error,
    ];

    /// Return the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::Tampered => "TAMPERED",
            Self::Revoked => "REVOKED",
            Self::Error => "ERROR",
        }
    }

    /// Parse the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl std::fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationLogEntry {
    pub id: Uuid,
    /// The submitted hash, as received (possibly invalid), truncated.
    pub certificate_hash: String,
    pub result: VerificationResult,
    pub verifier_ip: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub is_fake_attempt: bool,
}

impl VerificationLogEntry {
    /// Build an entry. `is_fake_attempt` is derived from the result.
    pub fn new(
        submitted_hash: &str,
        result: VerificationResult,
        verifier_ip: Option<String>,
        user_agent: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            certificate_hash: truncate(submitted_hash, MAX_LOGGED_HASH_LEN),
            result,
            verifier_ip,
            user_agent: user_agent.map(|ua| truncate(&ua, MAX_LOGGED_USER_AGENT_LEN)),
            timestamp,
            is_fake_attempt: result == VerificationResult::Tampered,
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_attempt_only_for_tampered() {
        for result in VerificationResult::ALL {
            let entry = VerificationLogEntry::new("abc", result, None, None, Utc::now());
            assert_eq!(entry.is_fake_attempt, result == VerificationResult::Tampered);
        }
    }

    #[test]
    fn long_inputs_are_truncated() {
        let long = "z".repeat(10_000);
        let entry = VerificationLogEntry::new(
            &long,
            VerificationResult::Error,
            Some("10.0.0.1".into()),
            Some(long.clone()),
            Utc::now(),
        );
        assert_eq!(entry.certificate_hash.len(), MAX_LOGGED_HASH_LEN);
        assert_eq!(
            entry.user_agent.as_deref().map(str::len),
            Some(MAX_LOGGED_USER_AGENT_LEN)
        );
    }

    #[test]
    fn result_parse_round_trips() {
        for result in VerificationResult::ALL {
            assert_eq!(VerificationResult::parse(result.as_str()), Some(result));
        }
        assert_eq!(VerificationResult::parse("verified"), None);
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = VerificationLogEntry::new(
            "abc",
            VerificationResult::Tampered,
            None,
            Some("curl/8".into()),
            Utc::now(),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["certificateHash"], "abc");
        assert_eq!(json["result"], "TAMPERED");
        assert_eq!(json["isFakeAttempt"], true);
        assert_eq!(json["userAgent"], "curl/8");
    }
}
