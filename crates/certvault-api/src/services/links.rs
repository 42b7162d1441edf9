//! Shareable verification links.

use std::sync::Arc;

use chrono::Utc;

use certvault_core::{clamp_ttl, CertificateDigest, VerificationLink, VerificationOutcome};

use crate::error::AppError;
use crate::extractors::ClientInfo;
use crate::services::verification::{VerificationService, STORE_FAILURE_MESSAGE};
use crate::store::CertificateStore;

/// Message for tokens that cannot be redeemed.
pub const INVALID_LINK_MESSAGE: &str = "Verification link is invalid, expired, or already used";

#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn CertificateStore>,
    verification: VerificationService,
    default_ttl_secs: u64,
}

impl LinkService {
    pub fn new(
        store: Arc<dyn CertificateStore>,
        verification: VerificationService,
        default_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            verification,
            default_ttl_secs,
        }
    }

    /// Create a link for an existing certificate.
    pub async fn create(
        &self,
        hash: CertificateDigest,
        ttl_secs: Option<u64>,
    ) -> Result<VerificationLink, AppError> {
        let ttl = clamp_ttl(ttl_secs.unwrap_or(self.default_ttl_secs));
        let link = VerificationLink::new(hash, ttl, Utc::now());
        self.store.insert_link(&link).await?;
        tracing::info!(
            hash = %link.certificate_hash.short(),
            expires_at = %link.expires_at,
            "verification link created"
        );
        Ok(link)
    }

    /// Consume a link and verify its certificate. Never fails: unusable
    /// tokens produce an ERROR outcome.
    pub async fn redeem(&self, token: &str, client: &ClientInfo) -> VerificationOutcome {
        match self.store.consume_link(token, Utc::now()).await {
            Ok(Some(link)) => {
                self.verification
                    .verify_digest(&link.certificate_hash, None, client)
                    .await
            }
            Ok(None) => {
                self.verification
                    .reject("", INVALID_LINK_MESSAGE.to_string(), client)
                    .await
            }
            Err(e) => {
                tracing::warn!(error = %e, "link redemption failed");
                self.verification
                    .reject("", STORE_FAILURE_MESSAGE.to_string(), client)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use certvault_core::{
        compute_digest, CertificateMetadata, CertificateRecord, VerificationResult,
    };

    async fn setup(default_ttl: u64) -> (LinkService, Arc<MemoryStore>, CertificateDigest) {
        let store = Arc::new(MemoryStore::new());
        let record = CertificateRecord::issue(
            compute_digest(b"linked"),
            CertificateMetadata::default(),
            Utc::now(),
        );
        store.insert_certificate(&record).await.unwrap();
        let verification = VerificationService::new(store.clone());
        (
            LinkService::new(store.clone(), verification, default_ttl),
            store,
            record.hash,
        )
    }

    #[tokio::test]
    async fn link_redeems_once() {
        let (svc, store, hash) = setup(3600).await;
        let link = svc.create(hash, None).await.unwrap();

        let first = svc.redeem(&link.token, &ClientInfo::default()).await;
        assert!(first.is_verified());
        let second = svc.redeem(&link.token, &ClientInfo::default()).await;
        assert_eq!(second, VerificationOutcome::error(INVALID_LINK_MESSAGE));

        // Both attempts land in the audit log.
        let logs = store.list_verification_logs(None, 10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].result, VerificationResult::Error);
        assert_eq!(logs[1].result, VerificationResult::Verified);
    }

    #[tokio::test]
    async fn ttl_defaults_and_clamps() {
        let (svc, _, hash) = setup(7200).await;
        let link = svc.create(hash.clone(), None).await.unwrap();
        assert_eq!((link.expires_at - link.created_at).num_seconds(), 7200);

        let short = svc.create(hash, Some(1)).await.unwrap();
        assert_eq!((short.expires_at - short.created_at).num_seconds(), 60);
    }

    #[tokio::test]
    async fn link_for_unknown_certificate_is_not_found() {
        let (svc, _, _) = setup(3600).await;
        let err = svc.create(compute_digest(b"ghost"), None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_token_is_error() {
        let (svc, _, _) = setup(3600).await;
        let outcome = svc.redeem("deadbeef", &ClientInfo::default()).await;
        assert_eq!(outcome.result(), VerificationResult::Error);
    }
}
