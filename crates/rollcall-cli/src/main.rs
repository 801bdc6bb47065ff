//! Rollcall CLI - operator tools
//!
//! Usage:
//!   rollcall hash-password [PASSWORD] [--cost N]
//!   rollcall issue-token --subject <ID> [--ttl SECS]
//!   rollcall verify-token <TOKEN>
//!
//! Signing settings come from the same configuration as the API server
//! (`ROLLCALL_CONFIG` file plus environment overrides).

use anyhow::Context;
use clap::{Parser, Subcommand};
use rollcall_api::auth::{hash_password, TokenCodec};
use rollcall_core::config::AppConfig;
use std::io::BufRead;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Rollcall authentication operator tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce a bcrypt digest for seeding credentials
    HashPassword {
        /// Password to hash; read from stdin when omitted
        password: Option<String>,
        /// bcrypt cost factor (defaults to the configured cost)
        #[arg(long)]
        cost: Option<u32>,
    },
    /// Mint a token for a subject with the configured secret
    IssueToken {
        /// Subject identifier placed in the token
        #[arg(long)]
        subject: String,
        /// Lifetime in seconds (defaults to the configured TTL)
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Check a token's signature and expiry
    VerifyToken {
        /// Token to check
        token: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    match cli.command {
        Commands::HashPassword { password, cost } => {
            let password = match password {
                Some(password) => password,
                None => read_password(std::io::stdin().lock())?,
            };
            let cost = cost.unwrap_or(config.auth.bcrypt_cost);
            let digest = hash_password(&password, cost)?;
            println!("{digest}");
        }
        Commands::IssueToken { subject, ttl } => {
            let codec = TokenCodec::from_config(&config.auth);
            let ttl = Duration::from_secs(ttl.unwrap_or(config.auth.token_ttl_secs));
            let issued = codec.issue(&subject, ttl)?;
            tracing::debug!(jti = %issued.claims.jti, "Token issued");
            println!("{}", issued.token);
        }
        Commands::VerifyToken { token } => {
            let codec = TokenCodec::from_config(&config.auth);
            let verified = codec.verify(token.trim())?;
            let report = serde_json::json!({
                "subject": verified.subject,
                "tokenId": verified.token_id,
                "issuedAt": verified.issued_at,
                "expiresAt": verified.expires_at,
                "remainingSecs": verified.remaining_lifetime().as_secs(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// First line of `input` without its line terminator
fn read_password(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    anyhow::ensure!(!password.is_empty(), "password must not be empty");
    Ok(password)
}
