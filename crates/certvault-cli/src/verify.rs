//! # Verify Subcommand
//!
//! Hashes a certificate file (or takes a digest) and asks the server
//! whether it matches an issued certificate.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use certvault_core::VerificationOutcome;

use crate::client::CertvaultClient;

/// Arguments for the verify subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Certificate file to verify.
    #[arg(required_unless_present = "hash")]
    pub file: Option<PathBuf>,

    /// Verify this digest instead of hashing a file.
    #[arg(long, conflicts_with = "file")]
    pub hash: Option<String>,

    /// Institution the certificate claims to come from. A TAMPERED result
    /// counts against that issuer's reputation.
    #[arg(long)]
    pub institution: Option<String>,

    /// Print the full outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Verify and print the outcome. Returns the outcome so the caller can pick
/// the exit code.
pub async fn run(
    client: &CertvaultClient,
    args: VerifyArgs,
    out: &mut dyn Write,
) -> anyhow::Result<VerificationOutcome> {
    let digest = crate::digest::resolve(args.file.as_deref(), args.hash.as_deref())?;

    let outcome = client
        .verify(&digest, args.institution.as_deref())
        .await
        .with_context(|| format!("failed to verify certificate {}", digest.short()))?;

    tracing::info!(digest = digest.short(), result = %outcome.result(), "verification complete");

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &outcome)?;
        writeln!(out)?;
    } else {
        write_summary(&outcome, out)?;
    }
    Ok(outcome)
}

fn write_summary(outcome: &VerificationOutcome, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "{}", outcome.result())?;
    match outcome {
        VerificationOutcome::Verified { certificate } => {
            write_field(out, "Certificate", Some(certificate.hash.as_str()))?;
            write_field(out, "Student", certificate.student_name.as_deref())?;
            write_field(out, "Register number", certificate.register_number.as_deref())?;
            write_field(out, "Name", certificate.certificate_name.as_deref())?;
            write_field(out, "Institution", certificate.institution.as_deref())?;
            write_field(out, "Issue date", certificate.issue_date.as_deref())?;
        }
        VerificationOutcome::Revoked {
            certificate,
            revoked_reason,
            revoked_at,
        } => {
            write_field(out, "Certificate", Some(certificate.hash.as_str()))?;
            write_field(out, "Reason", revoked_reason.as_deref())?;
            let at = revoked_at.map(|t| t.to_rfc3339());
            write_field(out, "Revoked at", at.as_deref())?;
        }
        VerificationOutcome::Tampered { message } | VerificationOutcome::Error { message } => {
            writeln!(out, "  {message}")?;
        }
    }
    Ok(())
}

fn write_field(out: &mut dyn Write, label: &str, value: Option<&str>) -> std::io::Result<()> {
    match value {
        Some(v) => writeln!(out, "  {label}: {v}"),
        None => Ok(()),
    }
}
