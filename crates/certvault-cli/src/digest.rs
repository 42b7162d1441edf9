//! # Digest Subcommand
//!
//! Local SHA-256 computation; no server involved.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use certvault_core::{digest_file, CertificateDigest};

/// Arguments for the digest subcommand.
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Certificate file to hash.
    pub file: PathBuf,
}

pub fn run(args: &DigestArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let digest = hash_file(&args.file)?;
    writeln!(out, "{digest}")?;
    Ok(())
}

/// Digest of a file, with the path in the error context.
pub fn hash_file(path: &Path) -> anyhow::Result<CertificateDigest> {
    let digest = digest_file(path)
        .with_context(|| format!("failed to read certificate file {}", path.display()))?;
    tracing::debug!(path = %path.display(), digest = digest.short(), "computed digest");
    Ok(digest)
}

/// Digest from either a file or an explicit `--hash`.
pub fn resolve(file: Option<&Path>, hash: Option<&str>) -> anyhow::Result<CertificateDigest> {
    match (file, hash) {
        (_, Some(hash)) => CertificateDigest::parse(hash).context("invalid --hash"),
        (Some(path), None) => hash_file(path),
        (None, None) => anyhow::bail!("either a FILE or --hash is required"),
    }
}
