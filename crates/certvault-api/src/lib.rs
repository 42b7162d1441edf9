//! # certvault-api: Certificate Issuance & Verification Service
//!
//! Issuers register the SHA-256 digest of a certificate file together with
//! its metadata. Anyone can later submit a digest and learn whether it
//! matches an issued, revoked, or unknown certificate.
//!
//! ## API Surface
//!
//! | Path                         | Module                   | Auth   |
//! |------------------------------|--------------------------|--------|
//! | `POST /certificates[/..]`    | [`routes::certificates`] | bearer |
//! | `GET /certificates/:hash[/events]` | [`routes::certificates`] | public |
//! | `/verify`, `/verify/links/*` | [`routes::verify`]       | public |
//! | `/issuers/*`                 | [`routes::issuers`]      | public |
//! | `/verification-logs`, `/stats` | [`routes::audit`]      | public |
//! | `/health`, `/metrics`, `/openapi.json` | this module    | public |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware (write routes only) → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let protected = Router::new()
        .merge(routes::certificates::write_router())
        .layer(from_fn(auth::auth_middleware));

    let public = Router::new()
        .merge(routes::certificates::read_router())
        .merge(routes::verify::router())
        .merge(routes::issuers::router())
        .merge(routes::audit::router())
        .merge(openapi::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    let mut router = Router::new()
        .merge(protected)
        .merge(public)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config));

    if let Some(m) = state.metrics.clone() {
        router = router.layer(axum::Extension(m));
    }

    router.with_state(state)
}

/// Health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// `CONNECTED`, `DISCONNECTED`, or `IN_MEMORY`.
    pub database: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if !state.store.is_persistent() {
        "IN_MEMORY"
    } else {
        match state.store.ping().await {
            Ok(()) => "CONNECTED",
            Err(e) => {
                tracing::warn!(backend = state.store.backend(), error = %e, "health check ping failed");
                "DISCONNECTED"
            }
        }
    };
    Json(HealthResponse {
        status: "OK".into(),
        database: database.into(),
    })
}

async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let Some(metrics) = &state.metrics else {
        return Err(AppError::NotFound("metrics are disabled".into()));
    };
    let body = metrics.gather_and_encode().map_err(AppError::Internal)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
