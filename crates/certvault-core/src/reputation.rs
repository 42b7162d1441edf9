//! # Issuer Reputation
//!
//! One reputation row per institution. Issuance raises the issued count;
//! a failed verification attributed to the institution raises the tamper
//! count. The trust score is a pure function of the two counters so every
//! store backend computes the same value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Score of an institution with no recorded activity.
pub const DEFAULT_TRUST_SCORE: u8 = 100;

/// Trust score in `0..=100`: the share of issued certificates among all
/// recorded events, floored.
pub fn trust_score(issued: u64, tamper_attempts: u64) -> u8 {
    let total = u128::from(issued) + u128::from(tamper_attempts);
    if total == 0 {
        return DEFAULT_TRUST_SCORE;
    }
    // issued <= total, so the quotient is at most 100.
    (u128::from(issued) * 100 / total) as u8
}

/// Reputation record for one institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerReputation {
    pub institution_name: String,
    pub trust_score: u8,
    pub total_certificates_issued: u64,
    pub tamper_attempts: u64,
    pub last_audit_at: DateTime<Utc>,
}

impl IssuerReputation {
    /// A fresh record with default score and zero counters.
    pub fn new(institution_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            institution_name: institution_name.into(),
            trust_score: DEFAULT_TRUST_SCORE,
            total_certificates_issued: 0,
            tamper_attempts: 0,
            last_audit_at: now,
        }
    }

    /// Count one issued certificate.
    pub fn record_issuance(&mut self, now: DateTime<Utc>) {
        self.total_certificates_issued = self.total_certificates_issued.saturating_add(1);
        self.rescore(now);
    }

    /// Count one tamper attempt.
    pub fn record_tamper_attempt(&mut self, now: DateTime<Utc>) {
        self.tamper_attempts = self.tamper_attempts.saturating_add(1);
        self.rescore(now);
    }

    fn rescore(&mut self, now: DateTime<Utc>) {
        self.trust_score = trust_score(self.total_certificates_issued, self.tamper_attempts);
        self.last_audit_at = now;
    }
}
