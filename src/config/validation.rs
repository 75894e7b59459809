//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, MailTransport};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.public_url must start with http:// or https://, got '{0}'")]
    InvalidPublicUrl(String),
    #[error("server.metrics_port must differ from the listen port ({0})")]
    MetricsPortClash(u16),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("admin.password is required")]
    MissingAdminPassword,
    #[error("admin.session_ttl_secs must be greater than zero")]
    ZeroSessionTtl,
    #[error("mail.relay_url is required when mail.transport = \"http\"")]
    MissingRelayUrl,
    #[error("mail.from must be an email address, got '{0}'")]
    InvalidSender(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Required fields
    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let url = &config.server.public_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ValidationError::InvalidPublicUrl(url.clone()));
    }

    if let Some(port) = config.server.metrics_port
        && port != 0
        && port == config.listen.address.port()
    {
        errors.push(ValidationError::MetricsPortClash(port));
    }

    // Database path validation
    if let Some(ref db) = config.database {
        let db_path = Path::new(&db.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(db.path.clone()));
        }
    }

    // Admin
    if config.admin.password.is_empty() {
        errors.push(ValidationError::MissingAdminPassword);
    }
    if config.admin.session_ttl_secs == 0 {
        errors.push(ValidationError::ZeroSessionTtl);
    }

    // Mail
    if config.mail.transport == MailTransport::Http && config.mail.relay_url.is_none() {
        errors.push(ValidationError::MissingRelayUrl);
    }
    if !config.mail.from.contains('@') {
        errors.push(ValidationError::InvalidSender(config.mail.from.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
