//! # Certificate Store
//!
//! Persistence seam for every piece of certvault state: certificate records
//! and their lifecycle logs, issuer reputation, the verification audit log,
//! and verification links.
//!
//! ## Backends
//!
//! - [`PgStore`]: PostgreSQL via SQLx. Uniqueness of certificate digests is
//!   enforced by the table's primary key; a unique violation surfaces as
//!   [`StoreError::Duplicate`].
//! - [`MemoryStore`]: a single `RwLock` over plain maps. Used when
//!   `DATABASE_URL` is unset and throughout the test suite.
//!
//! Services hold an `Arc<dyn CertificateStore>` and never know which backend
//! they talk to.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use certvault_core::{
    CertificateDigest, CertificateRecord, CertificateView, IssuerReputation, LifecycleEvent,
    LifecycleStatus, VerificationLink, VerificationLogEntry,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A certificate with this digest already exists.
    #[error("certificate {0} already registered")]
    Duplicate(String),

    /// The addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The certificate is already revoked.
    #[error("certificate {0} is already revoked")]
    AlreadyRevoked(String),

    /// The backend cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// Stored data could not be decoded into domain types.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// Aggregate counters over the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_certificates: u64,
    pub revoked_certificates: u64,
    pub total_verifications: u64,
    pub fake_attempts: u64,
    /// Verification count keyed by result (`VERIFIED`, `TAMPERED`, ...).
    pub verifications_by_result: BTreeMap<String, u64>,
}

/// Storage operations required by the services.
///
/// Every mutating method is atomic with respect to concurrent callers on
/// the same backend.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Short backend label for logs and health output.
    fn backend(&self) -> &'static str;

    /// Whether state survives a process restart.
    fn is_persistent(&self) -> bool;

    /// Check backend connectivity.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new record. Fails with [`StoreError::Duplicate`] when the
    /// digest is already present; never overwrites.
    async fn insert_certificate(&self, record: &CertificateRecord) -> Result<(), StoreError>;

    async fn find_certificate(
        &self,
        hash: &CertificateDigest,
    ) -> Result<Option<CertificateRecord>, StoreError>;

    /// Look up the public view only, without loading the lifecycle log.
    async fn find_view(
        &self,
        hash: &CertificateDigest,
    ) -> Result<Option<CertificateView>, StoreError>;

    /// Append one event to a certificate's lifecycle log.
    async fn append_event(
        &self,
        hash: &CertificateDigest,
        event: &LifecycleEvent,
    ) -> Result<(), StoreError>;

    /// Mark a live certificate revoked and append a REVOKED event.
    async fn revoke(
        &self,
        hash: &CertificateDigest,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<CertificateRecord, StoreError>;

    /// Insert `replacement` and revoke `previous` as one unit. Nothing is
    /// written unless `previous` exists, is live, and `replacement` is new.
    async fn reissue(
        &self,
        previous: &CertificateDigest,
        replacement: &CertificateRecord,
        reason: &str,
    ) -> Result<(), StoreError>;

    /// Count one issued certificate, creating the issuer on first use.
    async fn record_issuance(
        &self,
        institution: &str,
        at: DateTime<Utc>,
    ) -> Result<IssuerReputation, StoreError>;

    /// Count one tamper attempt against an existing issuer. Returns `None`
    /// when the institution is unknown; no row is created.
    async fn record_tamper_attempt(
        &self,
        institution: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<IssuerReputation>, StoreError>;

    async fn get_issuer(&self, institution: &str) -> Result<Option<IssuerReputation>, StoreError>;

    /// All issuers, highest trust score first, then by name.
    async fn list_issuers(&self) -> Result<Vec<IssuerReputation>, StoreError>;

    async fn append_verification_log(&self, entry: &VerificationLogEntry) -> Result<(), StoreError>;

    /// Log entries newest first, optionally filtered by submitted hash.
    async fn list_verification_logs(
        &self,
        hash: Option<&str>,
        limit: usize,
    ) -> Result<Vec<VerificationLogEntry>, StoreError>;

    async fn insert_link(&self, link: &VerificationLink) -> Result<(), StoreError>;

    /// Mark a link used if it is unused and unexpired at `now`. Returns the
    /// updated link, or `None` when the token is unknown, used, or expired.
    async fn consume_link(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationLink>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// The event appended when a certificate is revoked.
pub(crate) fn revoked_event(reason: &str, at: DateTime<Utc>) -> LifecycleEvent {
    LifecycleEvent::with_meta(
        LifecycleStatus::Revoked,
        at,
        serde_json::json!({ "reason": reason }),
    )
}
