//! # Certificate Routes
//!
//! Write routes ([`write_router`]) sit behind bearer auth; read routes
//! ([`read_router`]) are public.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use certvault_core::{
    CertificateDigest, CertificateMetadata, CertificateView, LifecycleEvent, ValidationError,
    record::MAX_REASON_LEN,
};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::middleware::metrics::IssuanceOutcome;
use crate::routes::{parse_path_hash, MessageResponse};
use crate::state::AppState;

pub const ISSUED_MESSAGE: &str = "Certificate recorded successfully";
pub const REISSUED_MESSAGE: &str = "Certificate reissued successfully";
pub const REVOKED_MESSAGE: &str = "Certificate revoked";

/// Largest accepted body on write routes. Metadata fields themselves are
/// stored as submitted, without per-field limits.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Issuance body. Every field is optional on the wire so a missing
/// `fileHash` reports as a validation error rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCertificateRequest {
    /// SHA-256 of the certificate file, 64 hex characters.
    #[serde(default)]
    pub file_hash: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub register_id: Option<String>,
    #[serde(default)]
    pub cert_name: Option<String>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub issuer_name: Option<String>,
}

impl IssueCertificateRequest {
    fn into_parts(self) -> Result<(CertificateDigest, CertificateMetadata), AppError> {
        let hash = CertificateDigest::parse_optional(self.file_hash.as_deref())?;
        let metadata = CertificateMetadata {
            student_name: self.student_name,
            register_number: self.register_id,
            certificate_name: self.cert_name,
            institution: self.issuer_name,
            issue_date: self.issue_date,
        };
        Ok((hash, metadata))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RevokeRequest {
    pub reason: String,
}

impl Validate for RevokeRequest {
    fn validate(&self) -> Result<(), AppError> {
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingField { field: "reason" }.into());
        }
        if reason.chars().count() > MAX_REASON_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "reason",
                max: MAX_REASON_LEN,
            }
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    /// Link lifetime; clamped to 60 seconds .. 30 days.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub token: String,
    pub certificate_hash: CertificateDigest,
    pub expires_at: DateTime<Utc>,
    /// Relative URL that redeems the link.
    pub url: String,
}

/// Routes that modify state.
pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/certificates", post(issue_certificate))
        .route("/certificates/:hash/revoke", post(revoke_certificate))
        .route("/certificates/:hash/reissue", post(reissue_certificate))
        .route("/certificates/:hash/links", post(create_link))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
}

/// Public lookups.
pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/certificates/:hash", get(get_certificate))
        .route("/certificates/:hash/events", get(get_events))
}

fn issuance_outcome(err: &AppError) -> IssuanceOutcome {
    match err {
        AppError::Validation(_) | AppError::BadRequest(_) => IssuanceOutcome::Invalid,
        AppError::Duplicate(_) => IssuanceOutcome::Duplicate,
        _ => IssuanceOutcome::Failed,
    }
}

/// POST /certificates: Register a new certificate digest.
#[utoipa::path(
    post,
    path = "/certificates",
    request_body = IssueCertificateRequest,
    responses(
        (status = 201, description = "Certificate recorded", body = MessageResponse),
        (status = 400, description = "Invalid input or duplicate digest", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = crate::error::ErrorBody),
        (status = 503, description = "Storage unavailable", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn issue_certificate(
    State(state): State<AppState>,
    body: Result<Json<IssueCertificateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let result = async {
        let (hash, metadata) = extract_json(body)?.into_parts()?;
        state.issuance.issue(hash, metadata).await
    }
    .await;

    if let Some(metrics) = &state.metrics {
        metrics.record_issuance(match &result {
            Ok(_) => IssuanceOutcome::Issued,
            Err(e) => issuance_outcome(e),
        });
    }

    result?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new(ISSUED_MESSAGE))))
}

/// GET /certificates/:hash: Public view of a certificate.
#[utoipa::path(
    get,
    path = "/certificates/{hash}",
    params(("hash" = String, Path, description = "Certificate SHA-256 digest")),
    responses(
        (status = 200, description = "Certificate found", body = CertificateView),
        (status = 400, description = "Invalid digest", body = crate::error::ErrorBody),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn get_certificate(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<CertificateView>, AppError> {
    let hash = parse_path_hash(&hash)?;
    let record = state.lifecycle.get(&hash).await?;
    Ok(Json(record.view()))
}

/// GET /certificates/:hash/events: Ordered lifecycle log.
#[utoipa::path(
    get,
    path = "/certificates/{hash}/events",
    params(("hash" = String, Path, description = "Certificate SHA-256 digest")),
    responses(
        (status = 200, description = "Lifecycle events, oldest first", body = [LifecycleEvent]),
        (status = 400, description = "Invalid digest", body = crate::error::ErrorBody),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn get_events(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Vec<LifecycleEvent>>, AppError> {
    let hash = parse_path_hash(&hash)?;
    Ok(Json(state.lifecycle.events(&hash).await?))
}

/// POST /certificates/:hash/revoke: Revoke a live certificate.
#[utoipa::path(
    post,
    path = "/certificates/{hash}/revoke",
    params(("hash" = String, Path, description = "Certificate SHA-256 digest")),
    request_body = RevokeRequest,
    responses(
        (status = 200, description = "Certificate revoked", body = MessageResponse),
        (status = 400, description = "Invalid digest or reason", body = crate::error::ErrorBody),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already revoked", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn revoke_certificate(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    body: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let hash = parse_path_hash(&hash)?;
    let req = extract_validated_json(body)?;
    state.lifecycle.revoke(&hash, req.reason.trim()).await?;
    Ok(Json(MessageResponse::new(REVOKED_MESSAGE)))
}

/// POST /certificates/:hash/reissue: Replace a certificate with a new digest.
#[utoipa::path(
    post,
    path = "/certificates/{hash}/reissue",
    params(("hash" = String, Path, description = "Digest of the certificate being replaced")),
    request_body = IssueCertificateRequest,
    responses(
        (status = 201, description = "Replacement recorded", body = MessageResponse),
        (status = 400, description = "Invalid input or duplicate digest", body = crate::error::ErrorBody),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
        (status = 409, description = "Certificate already revoked", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn reissue_certificate(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    body: Result<Json<IssueCertificateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let result = async {
        let previous = parse_path_hash(&hash)?;
        let (replacement, overrides) = extract_json(body)?.into_parts()?;
        state
            .lifecycle
            .reissue(&previous, replacement, overrides)
            .await
    }
    .await;

    if let Some(metrics) = &state.metrics {
        metrics.record_issuance(match &result {
            Ok(_) => IssuanceOutcome::Reissued,
            Err(e) => issuance_outcome(e),
        });
    }

    result?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new(REISSUED_MESSAGE))))
}

/// POST /certificates/:hash/links: Create a single-use verification link.
#[utoipa::path(
    post,
    path = "/certificates/{hash}/links",
    params(("hash" = String, Path, description = "Certificate SHA-256 digest")),
    request_body(content = CreateLinkRequest, description = "Optional; an empty body uses the default TTL"),
    responses(
        (status = 201, description = "Link created", body = LinkResponse),
        (status = 400, description = "Invalid digest or body", body = crate::error::ErrorBody),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
    ),
    tag = "links"
)]
pub async fn create_link(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    body: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    let hash = parse_path_hash(&hash)?;
    let req = match body {
        Err(JsonRejection::MissingJsonContentType(_)) => CreateLinkRequest::default(),
        other => extract_json(other)?,
    };
    let link = state.links.create(hash, req.ttl_seconds).await?;
    let url = format!("/verify/links/{}", link.token);
    Ok((
        StatusCode::CREATED,
        Json(LinkResponse {
            token: link.token,
            certificate_hash: link.certificate_hash,
            expires_at: link.expires_at,
            url,
        }),
    ))
}
