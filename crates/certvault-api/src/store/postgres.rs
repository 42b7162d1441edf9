//! PostgreSQL store backend.
//!
//! All functions operate on the tables created by `migrations/0001_init.sql`.
//! Digest uniqueness comes from the `certificates` primary key; the insert
//! path never checks for existence first.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use certvault_core::{
    CertificateDigest, CertificateMetadata, CertificateRecord, CertificateView, IssuerReputation,
    LifecycleEvent, VerificationLink, VerificationLogEntry, VerificationResult,
};

use super::{revoked_event, CertificateStore, StoreError, StoreStats};

const VIEW_COLUMNS: &str = "hash, student_name, register_number, certificate_name, \
     institution, issue_date, created_at, revoked, revoked_reason, revoked_at";

const CERTIFICATE_COLUMNS: &str = "hash, student_name, register_number, certificate_name, \
     institution, issue_date, created_at, revoked, revoked_reason, revoked_at, lifecycle_events";

const ISSUER_COLUMNS: &str =
    "institution_name, trust_score, total_certificates_issued, tamper_attempts, last_audit_at";

const LOG_COLUMNS: &str =
    "id, certificate_hash, result, verifier_ip, user_agent, \"timestamp\", is_fake_attempt";

const LINK_COLUMNS: &str = "token, certificate_hash, expires_at, used, used_at, created_at";

/// Connect to Postgres and apply embedded migrations.
pub async fn init_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Store backend over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            sqlx::Error::Tls(_) => Self::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Corrupt(err.to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn events_json(events: &[LifecycleEvent]) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(events).map_err(|e| StoreError::Backend(e.to_string()))
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

async fn insert_certificate_with<'e, E>(
    executor: E,
    record: &CertificateRecord,
) -> Result<(), StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let meta = &record.metadata;
    sqlx::query(
        "INSERT INTO certificates (hash, student_name, register_number, certificate_name,
         institution, issue_date, created_at, revoked, revoked_reason, revoked_at, lifecycle_events)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(record.hash.as_str())
    .bind(&meta.student_name)
    .bind(&meta.register_number)
    .bind(&meta.certificate_name)
    .bind(&meta.institution)
    .bind(&meta.issue_date)
    .bind(record.created_at)
    .bind(record.revoked)
    .bind(&record.revoked_reason)
    .bind(record.revoked_at)
    .bind(events_json(&record.lifecycle_events)?)
    .execute(executor)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Duplicate(record.hash.to_string())
        } else {
            StoreError::from(e)
        }
    })?;
    Ok(())
}

#[async_trait]
impl CertificateStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn is_persistent(&self) -> bool {
        true
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn insert_certificate(&self, record: &CertificateRecord) -> Result<(), StoreError> {
        insert_certificate_with(&self.pool, record).await
    }

    async fn find_certificate(
        &self,
        hash: &CertificateDigest,
    ) -> Result<Option<CertificateRecord>, StoreError> {
        let row = sqlx::query_as::<_, CertificateRow>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE hash = $1"
        ))
        .bind(hash.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CertificateRow::into_record).transpose()
    }

    async fn find_view(
        &self,
        hash: &CertificateDigest,
    ) -> Result<Option<CertificateView>, StoreError> {
        let row = sqlx::query_as::<_, ViewRow>(&format!(
            "SELECT {VIEW_COLUMNS} FROM certificates WHERE hash = $1"
        ))
        .bind(hash.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ViewRow::into_view).transpose()
    }

    async fn append_event(
        &self,
        hash: &CertificateDigest,
        event: &LifecycleEvent,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE certificates SET lifecycle_events = lifecycle_events || $2::jsonb
             WHERE hash = $1",
        )
        .bind(hash.as_str())
        .bind(events_json(std::slice::from_ref(event))?)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(hash.to_string()));
        }
        Ok(())
    }

    async fn revoke(
        &self,
        hash: &CertificateDigest,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<CertificateRecord, StoreError> {
        let row = sqlx::query_as::<_, CertificateRow>(&format!(
            "UPDATE certificates
             SET revoked = TRUE, revoked_reason = $2, revoked_at = $3,
                 lifecycle_events = lifecycle_events || $4::jsonb
             WHERE hash = $1 AND NOT revoked
             RETURNING {CERTIFICATE_COLUMNS}"
        ))
        .bind(hash.as_str())
        .bind(reason)
        .bind(at)
        .bind(events_json(&[revoked_event(reason, at)])?)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_record(),
            None => match self.find_certificate(hash).await? {
                Some(_) => Err(StoreError::AlreadyRevoked(hash.to_string())),
                None => Err(StoreError::NotFound(hash.to_string())),
            },
        }
    }

    async fn reissue(
        &self,
        previous: &CertificateDigest,
        replacement: &CertificateRecord,
        reason: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let revoked: Option<bool> =
            sqlx::query_scalar("SELECT revoked FROM certificates WHERE hash = $1 FOR UPDATE")
                .bind(previous.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        match revoked {
            None => return Err(StoreError::NotFound(previous.to_string())),
            Some(true) => return Err(StoreError::AlreadyRevoked(previous.to_string())),
            Some(false) => {}
        }

        insert_certificate_with(&mut *tx, replacement).await?;

        let at = replacement.created_at;
        sqlx::query(
            "UPDATE certificates
             SET revoked = TRUE, revoked_reason = $2, revoked_at = $3,
                 lifecycle_events = lifecycle_events || $4::jsonb
             WHERE hash = $1",
        )
        .bind(previous.as_str())
        .bind(reason)
        .bind(at)
        .bind(events_json(&[revoked_event(reason, at)])?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn record_issuance(
        &self,
        institution: &str,
        at: DateTime<Utc>,
    ) -> Result<IssuerReputation, StoreError> {
        // SET expressions see the pre-update row, so the score uses the
        // incremented count explicitly.
        let row = sqlx::query_as::<_, IssuerRow>(&format!(
            "INSERT INTO issuers ({ISSUER_COLUMNS}) VALUES ($1, 100, 1, 0, $2)
             ON CONFLICT (institution_name) DO UPDATE SET
                 total_certificates_issued = issuers.total_certificates_issued + 1,
                 trust_score = ((issuers.total_certificates_issued + 1) * 100
                     / (issuers.total_certificates_issued + 1 + issuers.tamper_attempts))::smallint,
                 last_audit_at = EXCLUDED.last_audit_at
             RETURNING {ISSUER_COLUMNS}"
        ))
        .bind(institution)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        row.into_record()
    }

    async fn record_tamper_attempt(
        &self,
        institution: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<IssuerReputation>, StoreError> {
        let row = sqlx::query_as::<_, IssuerRow>(&format!(
            "UPDATE issuers SET
                 tamper_attempts = tamper_attempts + 1,
                 trust_score = (total_certificates_issued * 100
                     / (total_certificates_issued + tamper_attempts + 1))::smallint,
                 last_audit_at = $2
             WHERE institution_name = $1
             RETURNING {ISSUER_COLUMNS}"
        ))
        .bind(institution)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(IssuerRow::into_record).transpose()
    }

    async fn get_issuer(&self, institution: &str) -> Result<Option<IssuerReputation>, StoreError> {
        let row = sqlx::query_as::<_, IssuerRow>(&format!(
            "SELECT {ISSUER_COLUMNS} FROM issuers WHERE institution_name = $1"
        ))
        .bind(institution)
        .fetch_optional(&self.pool)
        .await?;
        row.map(IssuerRow::into_record).transpose()
    }

    async fn list_issuers(&self) -> Result<Vec<IssuerReputation>, StoreError> {
        let rows = sqlx::query_as::<_, IssuerRow>(&format!(
            "SELECT {ISSUER_COLUMNS} FROM issuers ORDER BY trust_score DESC, institution_name"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(IssuerRow::into_record).collect()
    }

    async fn append_verification_log(&self, entry: &VerificationLogEntry) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO verification_logs ({LOG_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(entry.id)
        .bind(&entry.certificate_hash)
        .bind(entry.result.as_str())
        .bind(&entry.verifier_ip)
        .bind(&entry.user_agent)
        .bind(entry.timestamp)
        .bind(entry.is_fake_attempt)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_verification_logs(
        &self,
        hash: Option<&str>,
        limit: usize,
    ) -> Result<Vec<VerificationLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, LogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM verification_logs
             WHERE ($1::text IS NULL OR certificate_hash = $1)
             ORDER BY \"timestamp\" DESC LIMIT $2"
        ))
        .bind(hash)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LogRow::into_record).collect()
    }

    async fn insert_link(&self, link: &VerificationLink) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO verification_links ({LINK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(&link.token)
        .bind(link.certificate_hash.as_str())
        .bind(link.expires_at)
        .bind(link.used)
        .bind(link.used_at)
        .bind(link.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                StoreError::NotFound(link.certificate_hash.to_string())
            }
            _ => StoreError::from(e),
        })?;
        Ok(())
    }

    async fn consume_link(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationLink>, StoreError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "UPDATE verification_links SET used = TRUE, used_at = $2
             WHERE token = $1 AND NOT used AND expires_at > $2
             RETURNING {LINK_COLUMNS}"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(LinkRow::into_record).transpose()
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let (total_certificates, revoked_certificates, total_verifications, fake_attempts): (
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            "SELECT
                 (SELECT COUNT(*) FROM certificates),
                 (SELECT COUNT(*) FROM certificates WHERE revoked),
                 (SELECT COUNT(*) FROM verification_logs),
                 (SELECT COUNT(*) FROM verification_logs WHERE is_fake_attempt)",
        )
        .fetch_one(&self.pool)
        .await?;

        let per_result: Vec<(String, i64)> =
            sqlx::query_as("SELECT result, COUNT(*) FROM verification_logs GROUP BY result")
                .fetch_all(&self.pool)
                .await?;

        Ok(StoreStats {
            total_certificates: count(total_certificates),
            revoked_certificates: count(revoked_certificates),
            total_verifications: count(total_verifications),
            fake_attempts: count(fake_attempts),
            verifications_by_result: per_result
                .into_iter()
                .map(|(result, n)| (result, count(n)))
                .collect::<BTreeMap<_, _>>(),
        })
    }
}

// -- Row types ----------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct CertificateRow {
    hash: String,
    student_name: Option<String>,
    register_number: Option<String>,
    certificate_name: Option<String>,
    institution: Option<String>,
    issue_date: Option<String>,
    created_at: DateTime<Utc>,
    revoked: bool,
    revoked_reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    lifecycle_events: serde_json::Value,
}

impl CertificateRow {
    fn into_record(self) -> Result<CertificateRecord, StoreError> {
        let hash = CertificateDigest::parse(&self.hash)
            .map_err(|e| StoreError::Corrupt(format!("certificate hash {:?}: {e}", self.hash)))?;
        let lifecycle_events: Vec<LifecycleEvent> = serde_json::from_value(self.lifecycle_events)
            .map_err(|e| StoreError::Corrupt(format!("lifecycle events of {hash}: {e}")))?;
        Ok(CertificateRecord {
            hash,
            metadata: CertificateMetadata {
                student_name: self.student_name,
                register_number: self.register_number,
                certificate_name: self.certificate_name,
                institution: self.institution,
                issue_date: self.issue_date,
            },
            created_at: self.created_at,
            revoked: self.revoked,
            revoked_reason: self.revoked_reason,
            revoked_at: self.revoked_at,
            lifecycle_events,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ViewRow {
    hash: String,
    student_name: Option<String>,
    register_number: Option<String>,
    certificate_name: Option<String>,
    institution: Option<String>,
    issue_date: Option<String>,
    created_at: DateTime<Utc>,
    revoked: bool,
    revoked_reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
}

impl ViewRow {
    fn into_view(self) -> Result<CertificateView, StoreError> {
        let hash = CertificateDigest::parse(&self.hash)
            .map_err(|e| StoreError::Corrupt(format!("certificate hash {:?}: {e}", self.hash)))?;
        Ok(CertificateView {
            hash,
            student_name: self.student_name,
            register_number: self.register_number,
            certificate_name: self.certificate_name,
            institution: self.institution,
            issue_date: self.issue_date,
            created_at: self.created_at,
            revoked: self.revoked,
            revoked_reason: self.revoked_reason,
            revoked_at: self.revoked_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IssuerRow {
    institution_name: String,
    trust_score: i16,
    total_certificates_issued: i64,
    tamper_attempts: i64,
    last_audit_at: DateTime<Utc>,
}

impl IssuerRow {
    fn into_record(self) -> Result<IssuerReputation, StoreError> {
        let trust_score = u8::try_from(self.trust_score).map_err(|_| {
            StoreError::Corrupt(format!(
                "trust score {} of {}",
                self.trust_score, self.institution_name
            ))
        })?;
        Ok(IssuerReputation {
            institution_name: self.institution_name,
            trust_score,
            total_certificates_issued: count(self.total_certificates_issued),
            tamper_attempts: count(self.tamper_attempts),
            last_audit_at: self.last_audit_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: uuid::Uuid,
    certificate_hash: String,
    result: String,
    verifier_ip: Option<String>,
    user_agent: Option<String>,
    timestamp: DateTime<Utc>,
    is_fake_attempt: bool,
}

impl LogRow {
    fn into_record(self) -> Result<VerificationLogEntry, StoreError> {
        let result = VerificationResult::parse(&self.result)
            .ok_or_else(|| StoreError::Corrupt(format!("verification result {:?}", self.result)))?;
        Ok(VerificationLogEntry {
            id: self.id,
            certificate_hash: self.certificate_hash,
            result,
            verifier_ip: self.verifier_ip,
            user_agent: self.user_agent,
            timestamp: self.timestamp,
            is_fake_attempt: self.is_fake_attempt,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    token: String,
    certificate_hash: String,
    expires_at: DateTime<Utc>,
    used: bool,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl LinkRow {
    fn into_record(self) -> Result<VerificationLink, StoreError> {
        let certificate_hash = CertificateDigest::parse(&self.certificate_hash)
            .map_err(|e| StoreError::Corrupt(format!("link certificate hash: {e}")))?;
        Ok(VerificationLink {
            token: self.token,
            certificate_hash,
            expires_at: self.expires_at,
            used: self.used,
            used_at: self.used_at,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn row_not_found_maps_to_backend() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn corrupt_hash_row_is_rejected() {
        let row = CertificateRow {
            hash: "not-a-digest".into(),
            student_name: None,
            register_number: None,
            certificate_name: None,
            institution: None,
            issue_date: None,
            created_at: Utc::now(),
            revoked: false,
            revoked_reason: None,
            revoked_at: None,
            lifecycle_events: serde_json::json!([]),
        };
        assert!(matches!(row.into_record(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn view_row_carries_revocation() {
        let at = Utc::now();
        let row = ViewRow {
            hash: "AB".repeat(32),
            student_name: Some("  Alice ".into()),
            register_number: None,
            certificate_name: None,
            institution: None,
            issue_date: None,
            created_at: at,
            revoked: true,
            revoked_reason: Some("superseded".into()),
            revoked_at: Some(at),
        };
        let view = row.into_view().unwrap();
        assert_eq!(view.hash.as_str(), "ab".repeat(32));
        assert_eq!(view.student_name.as_deref(), Some("  Alice "));
        assert!(view.revoked);
        assert_eq!(view.revoked_reason.as_deref(), Some("superseded"));
    }

    #[test]
    fn negative_trust_score_is_corrupt() {
        let row = IssuerRow {
            institution_name: "X".into(),
            trust_score: -1,
            total_certificates_issued: 0,
            tamper_attempts: 0,
            last_audit_at: Utc::now(),
        };
        assert!(matches!(row.into_record(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn log_row_round_trips_result() {
        let row = LogRow {
            id: uuid::Uuid::new_v4(),
            certificate_hash: "abc".into(),
            result: "REVOKED".into(),
            verifier_ip: None,
            user_agent: None,
            timestamp: Utc::now(),
            is_fake_attempt: false,
        };
        assert_eq!(row.into_record().unwrap().result, VerificationResult::Revoked);
    }
}
