//! # Issue Subcommand
//!
//! Hashes a certificate file and registers it with the server.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::client::{CertvaultClient, IssueRequest};

/// Arguments for the issue subcommand.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Certificate file to register.
    #[arg(required_unless_present = "hash")]
    pub file: Option<PathBuf>,

    /// Register this digest instead of hashing a file.
    #[arg(long, conflicts_with = "file")]
    pub hash: Option<String>,

    #[arg(long)]
    pub student_name: Option<String>,

    #[arg(long)]
    pub register_id: Option<String>,

    #[arg(long)]
    pub cert_name: Option<String>,

    #[arg(long)]
    pub issue_date: Option<String>,

    /// Issuing institution.
    #[arg(long)]
    pub issuer_name: Option<String>,
}

pub async fn run(
    client: &CertvaultClient,
    args: IssueArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let digest = crate::digest::resolve(args.file.as_deref(), args.hash.as_deref())?;
    let req = IssueRequest {
        file_hash: digest.to_string(),
        student_name: args.student_name,
        register_id: args.register_id,
        cert_name: args.cert_name,
        issue_date: args.issue_date,
        issuer_name: args.issuer_name,
    };

    let resp = client
        .issue(&req)
        .await
        .with_context(|| format!("failed to issue certificate {}", digest.short()))?;

    tracing::info!(digest = digest.short(), "certificate issued");
    writeln!(out, "{}: {digest}", resp.message)?;
    Ok(())
}
