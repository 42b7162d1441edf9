//! # Services
//!
//! Business operations over an injected [`CertificateStore`]. Handlers in
//! [`crate::routes`] parse requests and shape responses; everything else
//! happens here.
//!
//! [`CertificateStore`]: crate::store::CertificateStore

pub mod audit;
pub mod issuance;
pub mod lifecycle;
pub mod links;
pub mod verification;

pub use audit::{AuditService, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT};
pub use issuance::IssuanceService;
pub use lifecycle::LifecycleService;
pub use links::LinkService;
pub use verification::VerificationService;
