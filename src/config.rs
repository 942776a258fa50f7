use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::registration::policy::RegistrationPolicy;

/// Main configuration structure for the registration service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Validation and identifier rules
    pub policy: RegistrationPolicy,
    /// Local record store settings
    pub store: StoreConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON-lines file registrations are appended to
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: ".golf-registration/players.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit JSON log lines instead of human readable ones
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl RegistrationConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (golf-registration.toml, .golf-registration-rc)
    /// 3. Environment variables (prefixed with GOLF_REGISTRATION_)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("golf-registration.toml").exists() {
            builder = builder.add_source(File::with_name("golf-registration"));
        }

        if Path::new(".golf-registration-rc").exists() {
            builder = builder.add_source(
                File::with_name(".golf-registration-rc").format(config::FileFormat::Toml),
            );
        }

        Self::finish(builder)
    }

    /// Load from an explicit file, still honouring environment overrides
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()).format(config::FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config = builder
            .add_source(
                Environment::with_prefix("GOLF_REGISTRATION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
