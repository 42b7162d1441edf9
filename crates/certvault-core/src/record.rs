//! # Certificate Records and Lifecycle Events
//!
//! A [`CertificateRecord`] is created exactly once per digest. Its identity
//! (`hash`) and `created_at` never change; revocation flips flags without
//! deleting anything, and the lifecycle log only grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::digest::CertificateDigest;

/// Maximum length of a revocation reason.
pub const MAX_REASON_LEN: usize = 512;

/// Status marker carried by a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    /// The record was created.
    Issued,
    /// A verification matched this record.
    Verified,
    /// The record was revoked.
    Revoked,
    /// The record was issued as the replacement of another.
    Reissued,
}

impl LifecycleStatus {
    /// Return the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "ISSUED",
            Self::Verified => "VERIFIED",
            Self::Revoked => "REVOKED",
            Self::Reissued => "REISSUED",
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, timestamped status marker on a certificate's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LifecycleEvent {
    pub status: LifecycleStatus,
    pub timestamp: DateTime<Utc>,
    /// Free-form context, e.g. the verifier IP or a superseded digest.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
}

impl LifecycleEvent {
    /// An event without metadata.
    pub fn new(status: LifecycleStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            status,
            timestamp,
            meta: serde_json::Value::Null,
        }
    }

    /// An event carrying metadata.
    pub fn with_meta(
        status: LifecycleStatus,
        timestamp: DateTime<Utc>,
        meta: serde_json::Value,
    ) -> Self {
        Self {
            status,
            timestamp,
            meta,
        }
    }
}

/// Free-text certificate metadata, stored exactly as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateMetadata {
    pub student_name: Option<String>,
    pub register_number: Option<String>,
    pub certificate_name: Option<String>,
    pub institution: Option<String>,
    pub issue_date: Option<String>,
}

impl CertificateMetadata {
    /// Fill every unset field from `base`.
    pub fn or(self, base: &CertificateMetadata) -> Self {
        Self {
            student_name: self.student_name.or_else(|| base.student_name.clone()),
            register_number: self.register_number.or_else(|| base.register_number.clone()),
            certificate_name: self
                .certificate_name
                .or_else(|| base.certificate_name.clone()),
            institution: self.institution.or_else(|| base.institution.clone()),
            issue_date: self.issue_date.or_else(|| base.issue_date.clone()),
        }
    }
}

/// A stored certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub hash: CertificateDigest,
    pub metadata: CertificateMetadata,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_reason: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub lifecycle_events: Vec<LifecycleEvent>,
}

impl CertificateRecord {
    /// Build a freshly issued record with its ISSUED event.
    pub fn issue(hash: CertificateDigest, metadata: CertificateMetadata, now: DateTime<Utc>) -> Self {
        Self {
            hash,
            metadata,
            created_at: now,
            revoked: false,
            revoked_reason: None,
            revoked_at: None,
            lifecycle_events: vec![LifecycleEvent::new(LifecycleStatus::Issued, now)],
        }
    }

    /// Public projection without the lifecycle log.
    pub fn view(&self) -> CertificateView {
        CertificateView {
            hash: self.hash.clone(),
            student_name: self.metadata.student_name.clone(),
            register_number: self.metadata.register_number.clone(),
            certificate_name: self.metadata.certificate_name.clone(),
            institution: self.metadata.institution.clone(),
            issue_date: self.metadata.issue_date.clone(),
            created_at: self.created_at,
            revoked: self.revoked,
            revoked_reason: self.revoked_reason.clone(),
            revoked_at: self.revoked_at,
        }
    }
}

/// Certificate fields returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateView {
    pub hash: CertificateDigest,
    pub student_name: Option<String>,
    pub register_number: Option<String>,
    pub certificate_name: Option<String>,
    pub institution: Option<String>,
    pub issue_date: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}
