//! Certificate issuance.

use std::sync::Arc;

use chrono::Utc;

use certvault_core::{CertificateDigest, CertificateMetadata, CertificateRecord};

use crate::error::AppError;
use crate::store::CertificateStore;

/// Registers new certificate records.
#[derive(Clone)]
pub struct IssuanceService {
    store: Arc<dyn CertificateStore>,
}

impl IssuanceService {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    /// Store a new record with its ISSUED event.
    ///
    /// The store's uniqueness constraint decides duplicates; a second
    /// issuance of the same digest fails with [`AppError::Duplicate`].
    pub async fn issue(
        &self,
        hash: CertificateDigest,
        metadata: CertificateMetadata,
    ) -> Result<CertificateRecord, AppError> {
        let record = CertificateRecord::issue(hash, metadata, Utc::now());
        self.store.insert_certificate(&record).await?;

        if let Some(institution) = record
            .metadata
            .institution
            .as_deref()
            .filter(|name| !name.trim().is_empty())
        {
            if let Err(e) = self
                .store
                .record_issuance(institution, record.created_at)
                .await
            {
                tracing::warn!(
                    institution = %institution,
                    error = %e,
                    "failed to update issuer reputation after issuance"
                );
            }
        }

        tracing::info!(hash = %record.hash.short(), "certificate issued");
        Ok(record)
    }
}
