//! Issuer reputation routes.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use certvault_core::IssuerReputation;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/issuers", get(list_issuers))
        .route("/issuers/:name", get(get_issuer))
}

/// GET /issuers: All issuers, highest trust score first.
#[utoipa::path(
    get,
    path = "/issuers",
    responses((status = 200, description = "Issuer reputations", body = [IssuerReputation])),
    tag = "issuers"
)]
pub async fn list_issuers(
    State(state): State<AppState>,
) -> Result<Json<Vec<IssuerReputation>>, AppError> {
    Ok(Json(state.audit.issuers().await?))
}

/// GET /issuers/:name
#[utoipa::path(
    get,
    path = "/issuers/{name}",
    params(("name" = String, Path, description = "Institution name")),
    responses(
        (status = 200, description = "Issuer reputation", body = IssuerReputation),
        (status = 404, description = "Unknown issuer", body = crate::error::ErrorBody),
    ),
    tag = "issuers"
)]
pub async fn get_issuer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<IssuerReputation>, AppError> {
    Ok(Json(state.audit.issuer(&name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use certvault_core::{compute_digest, CertificateMetadata};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn issuer_appears_after_issuance() {
        let state = AppState::new();
        state
            .issuance
            .issue(
                compute_digest(b"x"),
                CertificateMetadata {
                    institution: Some("State University".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let app = router().with_state(state);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/issuers/State%20University")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let rep: IssuerReputation = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rep.total_certificates_issued, 1);
        assert_eq!(rep.trust_score, 100);

        let resp = app
            .oneshot(Request::builder().uri("/issuers/Unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
