//! Configuration inspection commands.

use anyhow::Context;
use clap::{Args, Subcommand};
use serde_json::Value;

use authkeep_auth::TokenSigner;
use authkeep_core::config::AppConfig;

use crate::output::{self, Field, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration with secrets masked
    Show,
    /// Validate the configuration, including signer key material
    Validate,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommand::Show => {
            let redacted = config.redacted();
            let value = serde_json::to_value(&redacted).context("serialize configuration")?;
            output::print_record(&redacted, &flatten(&value), format);
        }
        ConfigCommand::Validate => {
            config
                .validate()
                .with_context(|| format!("configuration '{}' is invalid", config_path))?;
            let signer = TokenSigner::from_config(&config.jwt)
                .with_context(|| format!("configuration '{}' is invalid", config_path))?;

            output::print_success(&format!("Configuration '{}' is valid", config_path));
            output::print_kv("Algorithm", &signer.algorithm().to_string());
            output::print_kv("Issuer", signer.issuer());
            output::print_kv("Access token TTL", &format!("{}s", signer.ttl_seconds()));
            output::print_kv(
                "Refresh token TTL",
                &format!("{}s", config.session.refresh_token_ttl_seconds),
            );
            output::print_kv(
                "Public key export",
                if signer.jwks().is_some() { "available" } else { "none (shared secret)" },
            );
            output::print_kv("Workers", &config.worker.workers.to_string());
            if config.jwt.leeway_seconds == 0 {
                output::print_warning("No clock-skew leeway configured for access tokens");
            }
        }
    }

    Ok(())
}

/// Flatten nested sections into `section.key` rows.
fn flatten(value: &Value) -> Vec<Field> {
    let mut rows = Vec::new();
    flatten_into("", value, &mut rows);
    rows
}

fn flatten_into(prefix: &str, value: &Value, rows: &mut Vec<Field>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(&name, inner, rows);
            }
        }
        Value::String(s) => rows.push(Field::new(prefix, s)),
        other => rows.push(Field::new(prefix, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_masks_secret() {
        let mut config = AppConfig::default();
        config.jwt.secret = "super-secret".to_string();
        let value = serde_json::to_value(config.redacted()).unwrap();

        let rows = flatten(&value);
        let secret = rows.iter().find(|r| r.name == "jwt.secret").unwrap();
        assert_eq!(secret.value, "********");
        assert!(rows.iter().any(|r| r.name == "worker.queue_size" && r.value == "100"));
    }
}
