//! # Middleware
//!
//! Prometheus request metrics. Tracing comes from `tower_http::trace` and
//! bearer-token auth lives in [`crate::auth`].

pub mod metrics;
