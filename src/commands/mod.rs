//! CLI command definitions and dispatch.

pub mod config;
pub mod demo;
pub mod keys;
pub mod token;

use clap::{Parser, Subcommand};

use authkeep_core::config::AppConfig;

use crate::output::OutputFormat;

/// Authkeep: token and session lifecycle toolkit
#[derive(Debug, Parser)]
#[command(name = "authkeep", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay loaded from the config directory
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Configuration inspection
    Config(config::ConfigArgs),
    /// Access token tools
    Token(token::TokenArgs),
    /// Key material helpers
    Keys(keys::KeysArgs),
    /// Run the full session lifecycle against in-memory stores
    Demo(demo::DemoArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> anyhow::Result<()> {
        match &self.command {
            Commands::Config(args) => config::execute(args, &config, &self.config, self.format),
            Commands::Token(args) => token::execute(args, &config, self.format),
            Commands::Keys(args) => keys::execute(args, &config, self.format),
            Commands::Demo(args) => demo::execute(args, config, self.format).await,
        }
    }
}
