//! # Verification Outcome
//!
//! The closed result of a verification request. Serialized with a `status`
//! discriminator so clients can branch without probing optional fields:
//!
//! ```json
//! {"status": "VERIFIED", "certificate": { ... }}
//! {"status": "TAMPERED", "message": "Certificate hash not found"}
//! {"status": "REVOKED", "certificate": { ... }, "revokedReason": "...", "revokedAt": "..."}
//! {"status": "ERROR", "message": "Hash is required"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::audit::VerificationResult;
use crate::record::{CertificateRecord, CertificateView};

/// Message carried by a TAMPERED outcome.
pub const TAMPERED_MESSAGE: &str = "Certificate hash not found";

/// Result of verifying a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    /// A live record matches the digest.
    Verified { certificate: CertificateView },
    /// No record matches the digest.
    Tampered { message: String },
    /// A record matches but has been revoked.
    Revoked {
        certificate: CertificateView,
        #[serde(rename = "revokedReason")]
        revoked_reason: Option<String>,
        #[serde(rename = "revokedAt")]
        revoked_at: Option<DateTime<Utc>>,
    },
    /// The request could not be evaluated.
    Error { message: String },
}

impl VerificationOutcome {
    /// Outcome for a stored record: VERIFIED or REVOKED.
    pub fn for_record(record: &CertificateRecord) -> Self {
        Self::for_view(record.view())
    }

    /// Outcome for a certificate view: VERIFIED or REVOKED.
    pub fn for_view(certificate: CertificateView) -> Self {
        if certificate.revoked {
            Self::Revoked {
                revoked_reason: certificate.revoked_reason.clone(),
                revoked_at: certificate.revoked_at,
                certificate,
            }
        } else {
            Self::Verified { certificate }
        }
    }

    pub fn tampered() -> Self {
        Self::Tampered {
            message: TAMPERED_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The audit classification of this outcome.
    pub fn result(&self) -> VerificationResult {
        match self {
            Self::Verified { .. } => VerificationResult::Verified,
            Self::Tampered { .. } => VerificationResult::Tampered,
            Self::Revoked { .. } => VerificationResult::Revoked,
            Self::Error { .. } => VerificationResult::Error,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Decode a response body, turning anything that is not a well-formed
    /// outcome into an ERROR outcome.
    pub fn decode_lenient(body: &[u8]) -> Self {
        match serde_json::from_slice::<Self>(body) {
            Ok(outcome) => outcome,
            Err(e) => Self::error(format!("Unrecognized verification response: {e}")),
        }
    }
}
