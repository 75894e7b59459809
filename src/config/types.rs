//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::admin::AdminConfig;
use super::listen::ListenConfig;
use super::mail::MailConfig;
use super::security::SecurityConfig;

/// Database file used when no `[database]` block is present.
const DEFAULT_DATABASE_PATH: &str = "bazaar.db";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and deployment mode.
    pub server: ServerConfig,
    /// HTTP listen configuration.
    pub listen: ListenConfig,
    /// Database configuration.
    pub database: Option<DatabaseConfig>,
    /// Capability-token configuration.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Moderator login configuration.
    pub admin: AdminConfig,
    /// Outbound mail configuration.
    #[serde(default)]
    pub mail: MailConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path of the SQLite database, falling back to `bazaar.db`.
    pub fn database_path(&self) -> &str {
        self.database
            .as_ref()
            .map(|d| d.path.as_str())
            .unwrap_or(DEFAULT_DATABASE_PATH)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Marketplace name, used in email subjects.
    pub name: String,
    /// Deployment mode. Anything but `development` is treated as production.
    #[serde(default)]
    pub environment: Environment,
    /// Public base URL that capability links point at (e.g., "https://bazaar.example").
    pub public_url: String,
    /// Prometheus metrics HTTP port (default: 9090, 0 disables).
    pub metrics_port: Option<u16>,
}

impl ServerConfig {
    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Insecure secrets are fatal.
    #[default]
    Production,
    /// Insecure secrets only warn; missing ones are generated per process.
    Development,
}

impl Environment {
    /// Returns `true` unless explicitly running in development mode.
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file (":memory:" for an ephemeral database).
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[server]
name = "Bazaar"
public_url = "https://bazaar.example/"

[listen]
address = "127.0.0.1:8080"

[admin]
password = "hunter2-but-longer"
"#;

    #[test]
    fn environment_defaults_to_production() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.environment, Environment::Production);
        assert!(config.server.environment.is_production());
    }

    #[test]
    fn development_environment_parses() {
        let toml = MINIMAL.replace(
            "name = \"Bazaar\"",
            "name = \"Bazaar\"\nenvironment = \"development\"",
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.server.environment, Environment::Development);
        assert!(!config.server.environment.is_production());
    }

    #[test]
    fn base_url_trims_trailing_slash() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.base_url(), "https://bazaar.example");
    }

    #[test]
    fn database_path_falls_back() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.database_path(), "bazaar.db");
    }

    #[test]
    fn optional_sections_take_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert!(config.security.token_secret.is_none());
        assert!(!config.security.legacy_deletion_requests);
        assert_eq!(config.mail.transport, crate::config::MailTransport::Log);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/bazaar.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
