//! Application configuration schemas.
//!
//! Configuration is merged from a base TOML file, an optional
//! environment-specific overlay next to it, and `AUTHKEEP__*` environment
//! variables. Every field has a default so an empty source still yields a
//! usable development configuration.

pub mod jwt;
pub mod logging;
pub mod notification;
pub mod session;
pub mod worker;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::jwt::JwtConfig;
pub use self::logging::LoggingConfig;
pub use self::notification::NotificationConfig;
pub use self::session::SessionConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Access-token signer settings.
    #[serde(default)]
    pub jwt: JwtConfig,
    /// Refresh-token and credential policy settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Notification toggles.
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Background worker pool settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `path`, the `{env}` overlay in the same
    /// directory, and environment variables prefixed with `AUTHKEEP`.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let overlay = Path::new(path)
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(env);

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&overlay.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix("AUTHKEEP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that deserialization cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        self.session.validate()
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Copy of this configuration with secret values masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.jwt.secret.is_empty() {
            copy.jwt.secret = "********".to_string();
        }
        copy
    }
}
