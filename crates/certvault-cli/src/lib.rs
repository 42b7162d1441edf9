//! # certvault-cli: certvault Command-Line Interface
//!
//! Computes certificate digests locally and drives a running certvault API.
//!
//! ## Subcommands
//!
//! - `digest`: SHA-256 digest of a file, printed as 64 lowercase hex chars
//! - `issue`: register a file's digest and metadata
//! - `verify`: verify a file or digest; exits 2 unless VERIFIED
//!
//! Argument parsing lives in each subcommand module next to its handler;
//! digest and outcome logic come from `certvault-core`.

pub mod client;
pub mod digest;
pub mod issue;
pub mod verify;

pub use client::{CertvaultClient, ClientConfig, ClientError};
