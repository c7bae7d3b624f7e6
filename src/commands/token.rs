//! Access token commands.

use anyhow::Context;
use clap::{Args, Subcommand};
use uuid::Uuid;

use authkeep_auth::{Claims, TokenSigner};
use authkeep_core::config::AppConfig;
use authkeep_core::types::UserId;

use crate::output::{self, Field, OutputFormat};

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Mint an access token with the configured signer
    Issue {
        /// Subject user id; a random one is used when omitted
        #[arg(long)]
        user_id: Option<Uuid>,
        /// Email claim
        #[arg(long)]
        email: String,
        /// Mark the email as verified
        #[arg(long)]
        verified: bool,
    },
    /// Validate an access token and print its claims
    Inspect {
        /// Encoded token
        token: String,
    },
}

/// Execute token commands
pub fn execute(args: &TokenArgs, config: &AppConfig, format: OutputFormat) -> anyhow::Result<()> {
    let signer = TokenSigner::from_config(&config.jwt).context("signer configuration")?;

    match &args.command {
        TokenCommand::Issue {
            user_id,
            email,
            verified,
        } => {
            let user_id = user_id.map(UserId::from_uuid).unwrap_or_default();
            let token = signer.issue(user_id, email, *verified)?;
            let claims = signer.validate(&token)?;

            match format {
                OutputFormat::Table => println!("{}", token),
                OutputFormat::Json => {
                    let body = serde_json::json!({ "access_token": token, "claims": claims });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
            }
        }
        TokenCommand::Inspect { token } => match signer.validate(token) {
            Ok(claims) => output::print_record(&claims, &claim_fields(&claims), format),
            Err(e) => anyhow::bail!("token rejected: {} ({})", e, e.code()),
        },
    }

    Ok(())
}

fn claim_fields(claims: &Claims) -> Vec<Field> {
    let time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    };

    vec![
        Field::new("sub", &claims.sub),
        Field::new("iss", &claims.iss),
        Field::new("user_id", claims.user_id),
        Field::new("email", &claims.email),
        Field::new("email_verified", claims.email_verified),
        Field::new("issued_at", time(claims.issued_at())),
        Field::new("expires_at", time(claims.expires_at())),
        Field::new(
            "remaining_seconds",
            claims.remaining_ttl_seconds(chrono::Utc::now().timestamp()),
        ),
    ]
}
