//! Key material helpers.

use anyhow::Context;
use clap::{Args, Subcommand};

use authkeep_auth::{RandomTokenGenerator, SecureTokenGenerator, TokenSigner};
use authkeep_core::config::AppConfig;

use crate::output::{self, OutputFormat};

/// Arguments for key commands
#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Keys subcommand
    #[command(subcommand)]
    pub command: KeysCommand,
}

/// Keys subcommands
#[derive(Debug, Subcommand)]
pub enum KeysCommand {
    /// Print a random URL-safe secret suitable for `jwt.secret`
    GenerateSecret {
        /// Number of random bytes
        #[arg(long, default_value_t = 64)]
        bytes: usize,
    },
    /// Print the configured RSA verification key as PEM
    PublicKey,
    /// Print the JSON Web Key Set for the configured RSA verification key
    Jwks,
}

/// Execute key commands
pub fn execute(args: &KeysArgs, config: &AppConfig, format: OutputFormat) -> anyhow::Result<()> {
    match &args.command {
        KeysCommand::GenerateSecret { bytes } => {
            if *bytes < 32 {
                output::print_warning("HMAC secrets shorter than 32 bytes are not recommended");
            }
            let secret = RandomTokenGenerator::new().generate(*bytes)?;
            match format {
                OutputFormat::Table => println!("{}", secret),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "secret": secret, "bytes": bytes }))
                }
            }
        }
        KeysCommand::PublicKey => {
            let signer = signer(config)?;
            let Some(pem) = signer.public_key_pem() else {
                return Err(no_public_key(&signer));
            };
            match format {
                OutputFormat::Table => print!("{}", pem),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "algorithm": signer.algorithm().to_string(), "pem": pem })
                ),
            }
        }
        KeysCommand::Jwks => {
            let signer = signer(config)?;
            let Some(jwks) = signer.jwks() else {
                return Err(no_public_key(&signer));
            };
            println!(
                "{}",
                serde_json::to_string_pretty(jwks).context("serialize key set")?
            );
        }
    }

    Ok(())
}

fn signer(config: &AppConfig) -> anyhow::Result<TokenSigner> {
    TokenSigner::from_config(&config.jwt).context("failed to build token signer")
}

fn no_public_key(signer: &TokenSigner) -> anyhow::Error {
    anyhow::anyhow!(
        "{} uses a shared secret; there is no public key to export",
        signer.algorithm()
    )
}
