//! In-memory store backend.
//!
//! All state sits behind one `parking_lot::RwLock`. Check-and-insert
//! sequences run under a single write guard, so uniqueness and single-use
//! guarantees match the Postgres backend. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use certvault_core::{
    CertificateDigest, CertificateRecord, CertificateView, IssuerReputation, LifecycleEvent,
    VerificationLink, VerificationLogEntry,
};

use super::{revoked_event, CertificateStore, StoreError, StoreStats};

#[derive(Default)]
struct Inner {
    certificates: HashMap<CertificateDigest, CertificateRecord>,
    issuers: HashMap<String, IssuerReputation>,
    logs: Vec<VerificationLogEntry>,
    links: HashMap<String, VerificationLink>,
}

/// Store backend holding everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryStore")
            .field("certificates", &inner.certificates.len())
            .field("issuers", &inner.issuers.len())
            .field("logs", &inner.logs.len())
            .field("links", &inner.links.len())
            .finish()
    }
}

fn revoke_in_place(
    record: &mut CertificateRecord,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    if record.revoked {
        return Err(StoreError::AlreadyRevoked(record.hash.to_string()));
    }
    record.revoked = true;
    record.revoked_reason = Some(reason.to_string());
    record.revoked_at = Some(at);
    record.lifecycle_events.push(revoked_event(reason, at));
    Ok(())
}

#[async_trait]
impl CertificateStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn is_persistent(&self) -> bool {
        false
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_certificate(&self, record: &CertificateRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.certificates.contains_key(&record.hash) {
            return Err(StoreError::Duplicate(record.hash.to_string()));
        }
        inner
            .certificates
            .insert(record.hash.clone(), record.clone());
        Ok(())
    }

    async fn find_certificate(
        &self,
        hash: &CertificateDigest,
    ) -> Result<Option<CertificateRecord>, StoreError> {
        Ok(self.inner.read().certificates.get(hash).cloned())
    }

    async fn find_view(
        &self,
        hash: &CertificateDigest,
    ) -> Result<Option<CertificateView>, StoreError> {
        Ok(self.inner.read().certificates.get(hash).map(CertificateRecord::view))
    }

    async fn append_event(
        &self,
        hash: &CertificateDigest,
        event: &LifecycleEvent,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let record = inner
            .certificates
            .get_mut(hash)
            .ok_or_else(|| StoreError::NotFound(hash.to_string()))?;
        record.lifecycle_events.push(event.clone());
        Ok(())
    }

    async fn revoke(
        &self,
        hash: &CertificateDigest,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<CertificateRecord, StoreError> {
        let mut inner = self.inner.write();
        let record = inner
            .certificates
            .get_mut(hash)
            .ok_or_else(|| StoreError::NotFound(hash.to_string()))?;
        revoke_in_place(record, reason, at)?;
        Ok(record.clone())
    }

    async fn reissue(
        &self,
        previous: &CertificateDigest,
        replacement: &CertificateRecord,
        reason: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        match inner.certificates.get(previous) {
            None => return Err(StoreError::NotFound(previous.to_string())),
            Some(old) if old.revoked => {
                return Err(StoreError::AlreadyRevoked(previous.to_string()))
            }
            Some(_) => {}
        }
        if inner.certificates.contains_key(&replacement.hash) {
            return Err(StoreError::Duplicate(replacement.hash.to_string()));
        }
        if let Some(old) = inner.certificates.get_mut(previous) {
            revoke_in_place(old, reason, replacement.created_at)?;
        }
        inner
            .certificates
            .insert(replacement.hash.clone(), replacement.clone());
        Ok(())
    }

    async fn record_issuance(
        &self,
        institution: &str,
        at: DateTime<Utc>,
    ) -> Result<IssuerReputation, StoreError> {
        let mut inner = self.inner.write();
        let issuer = inner
            .issuers
            .entry(institution.to_string())
            .or_insert_with(|| IssuerReputation::new(institution, at));
        issuer.record_issuance(at);
        Ok(issuer.clone())
    }

    async fn record_tamper_attempt(
        &self,
        institution: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<IssuerReputation>, StoreError> {
        let mut inner = self.inner.write();
        Ok(inner.issuers.get_mut(institution).map(|issuer| {
            issuer.record_tamper_attempt(at);
            issuer.clone()
        }))
    }

    async fn get_issuer(&self, institution: &str) -> Result<Option<IssuerReputation>, StoreError> {
        Ok(self.inner.read().issuers.get(institution).cloned())
    }

    async fn list_issuers(&self) -> Result<Vec<IssuerReputation>, StoreError> {
        let mut issuers: Vec<_> = self.inner.read().issuers.values().cloned().collect();
        issuers.sort_by(|a, b| {
            b.trust_score
                .cmp(&a.trust_score)
                .then_with(|| a.institution_name.cmp(&b.institution_name))
        });
        Ok(issuers)
    }

    async fn append_verification_log(&self, entry: &VerificationLogEntry) -> Result<(), StoreError> {
        self.inner.write().logs.push(entry.clone());
        Ok(())
    }

    async fn list_verification_logs(
        &self,
        hash: Option<&str>,
        limit: usize,
    ) -> Result<Vec<VerificationLogEntry>, StoreError> {
        let inner = self.inner.read();
        // Appended in time order, so reverse iteration is newest first.
        let entries = inner
            .logs
            .iter()
            .rev()
            .filter(|e| hash.map_or(true, |h| e.certificate_hash == h))
            .take(limit)
            .cloned()
            .collect();
        Ok(entries)
    }

    async fn insert_link(&self, link: &VerificationLink) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if !inner.certificates.contains_key(&link.certificate_hash) {
            return Err(StoreError::NotFound(link.certificate_hash.to_string()));
        }
        if inner.links.contains_key(&link.token) {
            return Err(StoreError::Backend("link token collision".into()));
        }
        inner.links.insert(link.token.clone(), link.clone());
        Ok(())
    }

    async fn consume_link(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationLink>, StoreError> {
        let mut inner = self.inner.write();
        match inner.links.get_mut(token) {
            Some(link) if link.is_redeemable(now) => {
                link.used = true;
                link.used_at = Some(now);
                Ok(Some(link.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let inner = self.inner.read();
        let mut by_result: BTreeMap<String, u64> = BTreeMap::new();
        for entry in &inner.logs {
            *by_result.entry(entry.result.as_str().to_string()).or_default() += 1;
        }
        Ok(StoreStats {
            total_certificates: inner.certificates.len() as u64,
            revoked_certificates: inner.certificates.values().filter(|c| c.revoked).count() as u64,
            total_verifications: inner.logs.len() as u64,
            fake_attempts: inner.logs.iter().filter(|e| e.is_fake_attempt).count() as u64,
            verifications_by_result: by_result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certvault_core::{compute_digest, CertificateMetadata, LifecycleStatus, VerificationResult};

    fn record(seed: &[u8]) -> CertificateRecord {
        CertificateRecord::issue(
            compute_digest(seed),
            CertificateMetadata::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_is_unique_per_digest() {
        let store = MemoryStore::new();
        let rec = record(b"a");
        store.insert_certificate(&rec).await.unwrap();
        let err = store.insert_certificate(&rec).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn concurrent_inserts_admit_exactly_one() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let rec = record(b"race");
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let rec = rec.clone();
                tokio::spawn(async move { store.insert_certificate(&rec).await.is_ok() })
            })
            .collect();
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn revoke_twice_conflicts() {
        let store = MemoryStore::new();
        let rec = record(b"r");
        store.insert_certificate(&rec).await.unwrap();
        let revoked = store.revoke(&rec.hash, "error", Utc::now()).await.unwrap();
        assert!(revoked.revoked);
        assert_eq!(
            revoked.lifecycle_events.last().map(|e| e.status),
            Some(LifecycleStatus::Revoked)
        );
        let err = store.revoke(&rec.hash, "again", Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyRevoked(_)));
    }

    #[tokio::test]
    async fn revoke_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .revoke(&compute_digest(b"absent"), "x", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn reissue_onto_existing_digest_writes_nothing() {
        let store = MemoryStore::new();
        let old = record(b"old");
        let taken = record(b"taken");
        store.insert_certificate(&old).await.unwrap();
        store.insert_certificate(&taken).await.unwrap();

        let err = store.reissue(&old.hash, &taken, "superseded").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        let still = store.find_certificate(&old.hash).await.unwrap().unwrap();
        assert!(!still.revoked);
    }

    #[tokio::test]
    async fn tamper_attempt_ignores_unknown_issuer() {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert!(store.record_tamper_attempt("Nowhere U", now).await.unwrap().is_none());
        assert!(store.get_issuer("Nowhere U").await.unwrap().is_none());

        store.record_issuance("MIT", now).await.unwrap();
        let rep = store.record_tamper_attempt("MIT", now).await.unwrap().unwrap();
        assert_eq!(rep.tamper_attempts, 1);
        assert_eq!(rep.trust_score, 50);
    }

    #[tokio::test]
    async fn issuers_sorted_by_score_then_name() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for name in ["B", "A", "C"] {
            store.record_issuance(name, now).await.unwrap();
        }
        store.record_tamper_attempt("A", now).await.unwrap();
        let names: Vec<_> = store
            .list_issuers()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.institution_name)
            .collect();
        assert_eq!(names, ["B", "C", "A"]);
    }

    #[tokio::test]
    async fn links_are_single_use() {
        let store = MemoryStore::new();
        let rec = record(b"linked");
        store.insert_certificate(&rec).await.unwrap();
        let now = Utc::now();
        let link = VerificationLink::new(rec.hash.clone(), 600, now);
        store.insert_link(&link).await.unwrap();

        let used = store.consume_link(&link.token, now).await.unwrap().unwrap();
        assert!(used.used);
        assert!(store.consume_link(&link.token, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_links_are_not_consumed() {
        let store = MemoryStore::new();
        let rec = record(b"expiring");
        store.insert_certificate(&rec).await.unwrap();
        let now = Utc::now();
        let link = VerificationLink::new(rec.hash.clone(), 60, now);
        store.insert_link(&link).await.unwrap();

        let at_expiry = link.expires_at;
        let later = link.expires_at + chrono::Duration::seconds(1);
        assert!(store.consume_link(&link.token, at_expiry).await.unwrap().is_none());
        assert!(store.consume_link(&link.token, later).await.unwrap().is_none());

        // The failed attempts left the link unused.
        let early = now + chrono::Duration::seconds(30);
        assert!(store.consume_link(&link.token, early).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn find_view_skips_lifecycle_log() {
        let store = MemoryStore::new();
        let rec = record(b"viewed");
        store.insert_certificate(&rec).await.unwrap();
        assert_eq!(
            store.find_view(&rec.hash).await.unwrap(),
            Some(rec.view())
        );
        assert!(store
            .find_view(&compute_digest(b"absent"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn logs_newest_first_with_filter_and_limit() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for (i, hash) in ["x", "y", "x", "x"].iter().enumerate() {
            let entry = VerificationLogEntry::new(
                hash,
                VerificationResult::Tampered,
                None,
                None,
                base + chrono::Duration::seconds(i as i64),
            );
            store.append_verification_log(&entry).await.unwrap();
        }
        let xs = store.list_verification_logs(Some("x"), 2).await.unwrap();
        assert_eq!(xs.len(), 2);
        assert!(xs[0].timestamp > xs[1].timestamp);
        assert_eq!(store.list_verification_logs(None, 50).await.unwrap().len(), 4);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_verifications, 4);
        assert_eq!(stats.fake_attempts, 4);
        assert_eq!(stats.verifications_by_result.get("TAMPERED"), Some(&4));
    }
}
