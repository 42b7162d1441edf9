//! Verification log and aggregate statistics.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;

use certvault_core::VerificationLogEntry;

use crate::error::AppError;
use crate::store::StoreStats;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Only entries for this digest.
    pub hash: Option<String>,
    /// Maximum entries, 1..=500 (default 50).
    pub limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verification-logs", get(list_logs))
        .route("/stats", get(stats))
}

/// GET /verification-logs: Newest-first verification attempts.
#[utoipa::path(
    get,
    path = "/verification-logs",
    params(LogQuery),
    responses(
        (status = 200, description = "Log entries, newest first", body = [VerificationLogEntry]),
        (status = 400, description = "Invalid filter or limit", body = crate::error::ErrorBody),
    ),
    tag = "audit"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<Vec<VerificationLogEntry>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let entries = state
        .audit
        .logs(query.hash.as_deref(), query.limit)
        .await?;
    Ok(Json(entries))
}

/// GET /stats: Aggregate certificate and verification counts.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Aggregate counts", body = StoreStats)),
    tag = "audit"
)]
pub async fn stats(State(state): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(state.audit.stats().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::extractors::ClientInfo;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn logs_filter_and_stats() {
        let state = AppState::new();
        let known = "a".repeat(64);
        let other = "b".repeat(64);
        for hash in [&known, &other, &known] {
            state
                .verification
                .verify(Some(hash.as_str()), None, &ClientInfo::default())
                .await;
        }
        let app = router().with_state(state);

        let resp = app
            .clone()
            .oneshot(get(&format!("/verification-logs?hash={known}&limit=1")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let entries: Vec<VerificationLogEntry> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].certificate_hash, known);

        let resp = app.clone().oneshot(get("/stats")).await.unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let stats: StoreStats = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(stats.total_verifications, 3);
        assert_eq!(stats.fake_attempts, 3);
        assert_eq!(stats.total_certificates, 0);
    }

    #[tokio::test]
    async fn bad_limit_is_400() {
        let app = router().with_state(AppState::new());
        let resp = app
            .clone()
            .oneshot(get("/verification-logs?limit=lots"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app.oneshot(get("/verification-logs?limit=501")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
