//! Certificate lifecycle: lookup, revocation, reissue.
//!
//! Records are never deleted. Revocation flips flags and appends an event;
//! reissue creates a new record and revokes the old one in one store call.

use std::sync::Arc;

use chrono::Utc;

use certvault_core::{
    CertificateDigest, CertificateMetadata, CertificateRecord, LifecycleEvent, LifecycleStatus,
};

use crate::error::AppError;
use crate::store::CertificateStore;

#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn CertificateStore>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    /// Fetch a record or fail with [`AppError::NotFound`].
    pub async fn get(&self, hash: &CertificateDigest) -> Result<CertificateRecord, AppError> {
        self.store
            .find_certificate(hash)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Certificate not found: {hash}")))
    }

    /// The ordered lifecycle log of a certificate.
    pub async fn events(&self, hash: &CertificateDigest) -> Result<Vec<LifecycleEvent>, AppError> {
        Ok(self.get(hash).await?.lifecycle_events)
    }

    pub async fn revoke(
        &self,
        hash: &CertificateDigest,
        reason: &str,
    ) -> Result<CertificateRecord, AppError> {
        let record = self.store.revoke(hash, reason, Utc::now()).await?;
        tracing::info!(hash = %hash.short(), reason, "certificate revoked");
        Ok(record)
    }

    /// Issue `replacement` in place of `previous`.
    ///
    /// Metadata is copied from the previous record; any field set in
    /// `overrides` wins. The previous record is revoked with reason
    /// `superseded by <replacement>`.
    pub async fn reissue(
        &self,
        previous: &CertificateDigest,
        replacement: CertificateDigest,
        overrides: CertificateMetadata,
    ) -> Result<CertificateRecord, AppError> {
        let old = self.get(previous).await?;
        if old.revoked {
            return Err(AppError::Conflict(format!(
                "Certificate {previous} is already revoked"
            )));
        }

        let now = Utc::now();
        let mut record = CertificateRecord::issue(replacement, overrides.or(&old.metadata), now);
        record.lifecycle_events.push(LifecycleEvent::with_meta(
            LifecycleStatus::Reissued,
            now,
            serde_json::json!({ "previousHash": previous.as_str() }),
        ));

        let reason = format!("superseded by {}", record.hash);
        self.store.reissue(previous, &record, &reason).await?;

        if let Some(institution) = record
            .metadata
            .institution
            .as_deref()
            .filter(|name| !name.trim().is_empty())
        {
            if let Err(e) = self.store.record_issuance(institution, now).await {
                tracing::warn!(
                    institution = %institution,
                    error = %e,
                    "failed to update issuer reputation after reissue"
                );
            }
        }

        tracing::info!(
            previous = %previous.short(),
            replacement = %record.hash.short(),
            "certificate reissued"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use certvault_core::compute_digest;

    async fn setup() -> (LifecycleService, Arc<MemoryStore>, CertificateRecord) {
        let store = Arc::new(MemoryStore::new());
        let record = CertificateRecord::issue(
            compute_digest(b"v1"),
            CertificateMetadata {
                student_name: Some("Alice".into()),
                certificate_name: Some("BSc Physics".into()),
                institution: Some("State University".into()),
                ..Default::default()
            },
            Utc::now(),
        );
        store.insert_certificate(&record).await.unwrap();
        (LifecycleService::new(store.clone()), store, record)
    }

    #[tokio::test]
    async fn revoke_sets_flags_and_event() {
        let (svc, _, record) = setup().await;
        let revoked = svc.revoke(&record.hash, "issued in error").await.unwrap();
        assert!(revoked.revoked);
        assert_eq!(revoked.revoked_reason.as_deref(), Some("issued in error"));
        assert!(revoked.revoked_at.is_some());
        let statuses: Vec<_> = revoked.lifecycle_events.iter().map(|e| e.status).collect();
        assert_eq!(statuses, [LifecycleStatus::Issued, LifecycleStatus::Revoked]);
    }

    #[tokio::test]
    async fn revoke_twice_is_conflict() {
        let (svc, _, record) = setup().await;
        svc.revoke(&record.hash, "x").await.unwrap();
        let err = svc.revoke(&record.hash, "y").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn revoke_unknown_is_not_found() {
        let (svc, _, _) = setup().await;
        let err = svc.revoke(&compute_digest(b"nope"), "x").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn reissue_copies_metadata_and_supersedes() {
        let (svc, store, record) = setup().await;
        let overrides = CertificateMetadata {
            student_name: Some("Alice Smith".into()),
            ..Default::default()
        };
        let new_hash = compute_digest(b"v2");
        let new = svc
            .reissue(&record.hash, new_hash.clone(), overrides)
            .await
            .unwrap();

        assert_eq!(new.metadata.student_name.as_deref(), Some("Alice Smith"));
        assert_eq!(new.metadata.certificate_name.as_deref(), Some("BSc Physics"));
        let statuses: Vec<_> = new.lifecycle_events.iter().map(|e| e.status).collect();
        assert_eq!(statuses, [LifecycleStatus::Issued, LifecycleStatus::Reissued]);
        assert_eq!(
            new.lifecycle_events[1].meta["previousHash"],
            record.hash.as_str()
        );

        let old = store.find_certificate(&record.hash).await.unwrap().unwrap();
        assert!(old.revoked);
        assert_eq!(
            old.revoked_reason,
            Some(format!("superseded by {new_hash}"))
        );
        assert!(store.find_certificate(&new_hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reissue_of_revoked_is_conflict() {
        let (svc, _, record) = setup().await;
        svc.revoke(&record.hash, "x").await.unwrap();
        let err = svc
            .reissue(&record.hash, compute_digest(b"v2"), CertificateMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn reissue_onto_same_digest_is_duplicate() {
        let (svc, store, record) = setup().await;
        let err = svc
            .reissue(&record.hash, record.hash.clone(), CertificateMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
        let old = store.find_certificate(&record.hash).await.unwrap().unwrap();
        assert!(!old.revoked);
    }

    #[tokio::test]
    async fn events_of_unknown_is_not_found() {
        let (svc, _, _) = setup().await;
        assert!(matches!(
            svc.events(&compute_digest(b"nope")).await,
            Err(AppError::NotFound(_))
        ));
    }
}
