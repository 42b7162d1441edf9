//! # Verification Routes
//!
//! Both endpoints always answer 200 with a [`VerificationOutcome`]. Bad
//! input, including a body that is not JSON, becomes an ERROR outcome and
//! is still written to the verification log.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use certvault_core::VerificationOutcome;

use crate::extractors::ClientInfo;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct VerifyRequest {
    /// Submitted SHA-256 digest.
    #[serde(default)]
    pub hash: Option<String>,
    /// Institution the holder claims issued the certificate.
    #[serde(default)]
    pub institution: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify", post(verify_certificate))
        .route("/verify/links/:token", get(redeem_link))
}

fn record(state: &AppState, outcome: &VerificationOutcome) {
    if let Some(metrics) = &state.metrics {
        metrics.record_verification(outcome.result());
    }
}

/// POST /verify: Verify a certificate digest.
#[utoipa::path(
    post,
    path = "/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification outcome, discriminated by `status`", body = VerificationOutcome),
    ),
    tag = "verification"
)]
pub async fn verify_certificate(
    State(state): State<AppState>,
    client: ClientInfo,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Json<VerificationOutcome> {
    let outcome = match body {
        Ok(Json(req)) => {
            state
                .verification
                .verify(req.hash.as_deref(), req.institution.as_deref(), &client)
                .await
        }
        Err(rejection) => {
            state
                .verification
                .reject("", rejection.body_text(), &client)
                .await
        }
    };
    record(&state, &outcome);
    Json(outcome)
}

/// GET /verify/links/:token: Redeem a single-use verification link.
#[utoipa::path(
    get,
    path = "/verify/links/{token}",
    params(("token" = String, Path, description = "Link token")),
    responses(
        (status = 200, description = "Verification outcome; ERROR for unusable links", body = VerificationOutcome),
    ),
    tag = "links"
)]
pub async fn redeem_link(
    State(state): State<AppState>,
    client: ClientInfo,
    Path(token): Path<String>,
) -> Json<VerificationOutcome> {
    let outcome = state.links.redeem(&token, &client).await;
    record(&state, &outcome);
    Json(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use certvault_core::VerificationResult;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(state: AppState) -> Router<()> {
        Router::new()
            .merge(router())
            .merge(crate::routes::certificates::write_router())
            .with_state(state)
    }

    async fn outcome_of(resp: axum::response::Response) -> VerificationOutcome {
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_raw(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("user-agent", "verifier-test")
            .header("x-forwarded-for", "203.0.113.50")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn never_issued_is_tampered() {
        let app = test_app(AppState::new());
        let body = serde_json::json!({"hash": "b".repeat(64)}).to_string();
        let outcome = outcome_of(app.oneshot(post_raw("/verify", &body)).await.unwrap()).await;
        assert_eq!(outcome, VerificationOutcome::tampered());
    }

    #[tokio::test]
    async fn malformed_body_is_error_outcome_and_logged() {
        let state = AppState::new();
        let app = test_app(state.clone());
        let outcome = outcome_of(app.oneshot(post_raw("/verify", "{{{")).await.unwrap()).await;
        assert_eq!(outcome.result(), VerificationResult::Error);

        let logs = state.audit.logs(None, None).await.unwrap();
        assert_eq!(logs.len(), 1);
        // No peer address in oneshot tests, and the forwarded header is untrusted.
        assert_eq!(logs[0].verifier_ip, None);
        assert_eq!(logs[0].user_agent.as_deref(), Some("verifier-test"));
    }

    #[tokio::test]
    async fn forwarded_address_logged_only_when_trusted() {
        let config = crate::state::AppConfig {
            trust_proxy_headers: true,
            ..Default::default()
        };
        let state = AppState::with_config(
            config,
            std::sync::Arc::new(crate::store::MemoryStore::new()),
        );
        let app = test_app(state.clone());
        let body = serde_json::json!({"hash": "c".repeat(64)}).to_string();
        outcome_of(app.oneshot(post_raw("/verify", &body)).await.unwrap()).await;

        let logs = state.audit.logs(None, None).await.unwrap();
        assert_eq!(logs[0].verifier_ip.as_deref(), Some("203.0.113.50"));
    }

    #[tokio::test]
    async fn missing_hash_is_error_with_message() {
        let app = test_app(AppState::new());
        let outcome = outcome_of(app.oneshot(post_raw("/verify", "{}")).await.unwrap()).await;
        assert_eq!(outcome, VerificationOutcome::error("Hash is required"));
    }

    #[tokio::test]
    async fn link_redemption_round_trip() {
        let state = AppState::new();
        let app = test_app(state.clone());
        let hash = "9".repeat(64);
        app.clone()
            .oneshot(post_raw(
                "/certificates",
                &serde_json::json!({"fileHash": hash}).to_string(),
            ))
            .await
            .unwrap();
        let link = state
            .links
            .create(certvault_core::CertificateDigest::parse(&hash).unwrap(), None)
            .await
            .unwrap();

        let get = |uri: String| Request::builder().uri(uri).body(Body::empty()).unwrap();
        let first = outcome_of(
            app.clone()
                .oneshot(get(format!("/verify/links/{}", link.token)))
                .await
                .unwrap(),
        )
        .await;
        assert!(first.is_verified());

        let second = outcome_of(
            app.oneshot(get(format!("/verify/links/{}", link.token)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(second.result(), VerificationResult::Error);

        let metrics = state.metrics.unwrap();
        assert_eq!(metrics.verifications(VerificationResult::Verified), 1);
        assert_eq!(metrics.verifications(VerificationResult::Error), 1);
    }
}
