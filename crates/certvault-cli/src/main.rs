//! # certvault CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::process::ExitCode;

use clap::{ArgAction, Parser};

use certvault_cli::client::DEFAULT_SERVER;
use certvault_cli::{CertvaultClient, ClientConfig};

/// Exit code for a verification that did not come back VERIFIED.
const EXIT_NOT_VERIFIED: u8 = 2;

/// certvault: certificate digests, issuance and verification.
#[derive(Parser, Debug)]
#[command(name = "certvault", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Base URL of the certvault API.
    #[arg(long, env = "CERTVAULT_URL", default_value = DEFAULT_SERVER, global = true)]
    server: String,

    /// Bearer token for write operations.
    #[arg(long, env = "CERTVAULT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the SHA-256 digest of a certificate file.
    Digest(certvault_cli::digest::DigestArgs),
    /// Register a certificate with the server.
    Issue(certvault_cli::issue::IssueArgs),
    /// Verify a certificate against the server.
    Verify(certvault_cli::verify::VerifyArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut out = std::io::stdout().lock();

    let config = ClientConfig {
        server: cli.server,
        token: cli.token,
        timeout_secs: cli.timeout,
    };
    tracing::debug!(?config, "client configuration");

    match cli.command {
        Commands::Digest(args) => {
            certvault_cli::digest::run(&args, &mut out)?;
        }
        Commands::Issue(args) => {
            let client = CertvaultClient::new(&config)?;
            certvault_cli::issue::run(&client, args, &mut out).await?;
        }
        Commands::Verify(args) => {
            let client = CertvaultClient::new(&config)?;
            let outcome = certvault_cli::verify::run(&client, args, &mut out).await?;
            if !outcome.is_verified() {
                return Ok(ExitCode::from(EXIT_NOT_VERIFIED));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verify_accepts_hash_without_file() {
        let cli = Cli::try_parse_from([
            "certvault",
            "verify",
            "--hash",
            &"a".repeat(64),
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Verify(_)));
    }

    #[test]
    fn issue_requires_file_or_hash() {
        assert!(Cli::try_parse_from(["certvault", "issue"]).is_err());
    }
}
