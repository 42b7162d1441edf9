//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one spec served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "certvault API",
        version = "0.1.0",
        description = "Certificate issuance and tamper verification by SHA-256 digest.",
        license(name = "Apache-2.0")
    ),
    paths(
        crate::routes::certificates::issue_certificate,
        crate::routes::certificates::get_certificate,
        crate::routes::certificates::get_events,
        crate::routes::certificates::revoke_certificate,
        crate::routes::certificates::reissue_certificate,
        crate::routes::certificates::create_link,
        crate::routes::verify::verify_certificate,
        crate::routes::verify::redeem_link,
        crate::routes::issuers::list_issuers,
        crate::routes::issuers::get_issuer,
        crate::routes::audit::list_logs,
        crate::routes::audit::stats,
    ),
    components(schemas(
        certvault_core::CertificateView,
        certvault_core::LifecycleEvent,
        certvault_core::LifecycleStatus,
        certvault_core::VerificationOutcome,
        certvault_core::VerificationResult,
        certvault_core::VerificationLogEntry,
        certvault_core::IssuerReputation,
        certvault_core::CertificateDigest,
        crate::routes::MessageResponse,
        crate::routes::certificates::IssueCertificateRequest,
        crate::routes::certificates::RevokeRequest,
        crate::routes::certificates::CreateLinkRequest,
        crate::routes::certificates::LinkResponse,
        crate::routes::verify::VerifyRequest,
        crate::store::StoreStats,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "certificates", description = "Issuance, lookup, revocation and reissue"),
        (name = "verification", description = "Digest verification"),
        (name = "links", description = "Single-use verification links"),
        (name = "issuers", description = "Issuer reputation"),
        (name = "audit", description = "Verification log and statistics"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
