//! # API Route Modules
//!
//! - `certificates`: issuance, lookup, lifecycle log, revocation, reissue,
//!   and verification link creation.
//! - `verify`: digest verification and link redemption. Always answers
//!   200 with a [`VerificationOutcome`](certvault_core::VerificationOutcome).
//! - `issuers`: issuer reputation.
//! - `audit`: verification log and aggregate stats.

pub mod audit;
pub mod certificates;
pub mod issuers;
pub mod verify;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use certvault_core::CertificateDigest;

use crate::error::AppError;

/// Plain acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a digest taken from a URL path segment.
pub(crate) fn parse_path_hash(raw: &str) -> Result<CertificateDigest, AppError> {
    Ok(CertificateDigest::parse(raw)?)
}
