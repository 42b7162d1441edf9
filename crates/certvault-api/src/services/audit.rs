//! Read-side queries: verification log, issuer reputation, aggregate stats.

use std::sync::Arc;

use certvault_core::{CertificateDigest, IssuerReputation, VerificationLogEntry};

use crate::error::AppError;
use crate::store::{CertificateStore, StoreStats};

pub const DEFAULT_LOG_LIMIT: usize = 50;
pub const MAX_LOG_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn CertificateStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    /// Newest-first log entries. A `hash` filter must be a valid digest;
    /// `limit` must be in `1..=MAX_LOG_LIMIT`.
    pub async fn logs(
        &self,
        hash: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<VerificationLogEntry>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT);
        if limit == 0 || limit > MAX_LOG_LIMIT {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_LOG_LIMIT}"
            )));
        }
        let hash = hash.map(CertificateDigest::parse).transpose()?;
        Ok(self
            .store
            .list_verification_logs(hash.as_ref().map(CertificateDigest::as_str), limit)
            .await?)
    }

    pub async fn issuers(&self) -> Result<Vec<IssuerReputation>, AppError> {
        Ok(self.store.list_issuers().await?)
    }

    pub async fn issuer(&self, name: &str) -> Result<IssuerReputation, AppError> {
        self.store
            .get_issuer(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issuer not found: {name}")))
    }

    pub async fn stats(&self) -> Result<StoreStats, AppError> {
        Ok(self.store.stats().await?)
    }
}
