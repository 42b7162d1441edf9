//! # Verification
//!
//! Turns a submitted digest into a [`VerificationOutcome`] and records the
//! attempt. This path never fails: invalid input and store errors become
//! ERROR outcomes, and side-effect failures (lifecycle append, reputation,
//! audit log) are logged without changing the outcome.

use std::sync::Arc;

use chrono::Utc;

use certvault_core::{
    CertificateDigest, LifecycleEvent, LifecycleStatus, VerificationLogEntry, VerificationOutcome,
};

use crate::extractors::ClientInfo;
use crate::store::CertificateStore;

/// Message returned when the store fails during lookup.
pub const STORE_FAILURE_MESSAGE: &str = "Verification could not be completed, please retry";

/// Looks up digests and writes the verification audit trail.
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn CertificateStore>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    /// Verify a raw submitted hash. `claimed_institution` names the issuer
    /// the holder claims; it is charged a tamper attempt on a miss.
    pub async fn verify(
        &self,
        submitted: Option<&str>,
        claimed_institution: Option<&str>,
        client: &ClientInfo,
    ) -> VerificationOutcome {
        match CertificateDigest::parse_optional(submitted) {
            Ok(hash) => self.verify_digest(&hash, claimed_institution, client).await,
            Err(e) => {
                self.reject(submitted.unwrap_or_default(), e.to_string(), client)
                    .await
            }
        }
    }

    /// Verify an already validated digest.
    pub async fn verify_digest(
        &self,
        hash: &CertificateDigest,
        claimed_institution: Option<&str>,
        client: &ClientInfo,
    ) -> VerificationOutcome {
        let outcome = match self.store.find_view(hash).await {
            Ok(Some(view)) => {
                let outcome = VerificationOutcome::for_view(view);
                if outcome.is_verified() {
                    self.append_verified_event(hash, client).await;
                }
                outcome
            }
            Ok(None) => {
                if let Some(institution) = claimed_institution.filter(|s| !s.trim().is_empty()) {
                    self.charge_tamper_attempt(institution).await;
                }
                VerificationOutcome::tampered()
            }
            Err(e) => {
                tracing::warn!(hash = %hash.short(), error = %e, "certificate lookup failed");
                VerificationOutcome::error(STORE_FAILURE_MESSAGE)
            }
        };

        self.log_attempt(hash.as_str(), &outcome, client).await;
        tracing::info!(hash = %hash.short(), result = %outcome.result(), "verification");
        outcome
    }

    /// Record and return an ERROR outcome for a request that could not be
    /// evaluated.
    pub async fn reject(
        &self,
        submitted: &str,
        message: String,
        client: &ClientInfo,
    ) -> VerificationOutcome {
        let outcome = VerificationOutcome::error(message);
        self.log_attempt(submitted, &outcome, client).await;
        tracing::info!(result = %outcome.result(), "verification rejected");
        outcome
    }

    async fn append_verified_event(&self, hash: &CertificateDigest, client: &ClientInfo) {
        let meta = match &client.ip {
            Some(ip) => serde_json::json!({ "verifierIp": ip }),
            None => serde_json::Value::Null,
        };
        let event = LifecycleEvent::with_meta(LifecycleStatus::Verified, Utc::now(), meta);
        if let Err(e) = self.store.append_event(hash, &event).await {
            tracing::warn!(hash = %hash.short(), error = %e, "failed to append VERIFIED event");
        }
    }

    async fn charge_tamper_attempt(&self, institution: &str) {
        match self.store.record_tamper_attempt(institution, Utc::now()).await {
            Ok(Some(rep)) => tracing::warn!(
                institution = %institution,
                tamper_attempts = rep.tamper_attempts,
                trust_score = rep.trust_score,
                "tamper attempt recorded"
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                institution = %institution,
                error = %e,
                "failed to record tamper attempt"
            ),
        }
    }

    async fn log_attempt(&self, submitted: &str, outcome: &VerificationOutcome, client: &ClientInfo) {
        let entry = VerificationLogEntry::new(
            submitted,
            outcome.result(),
            client.ip.clone(),
            client.user_agent.clone(),
            Utc::now(),
        );
        if let Err(e) = self.store.append_verification_log(&entry).await {
            tracing::warn!(error = %e, "failed to write verification log entry");
        }
    }
}
