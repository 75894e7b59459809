//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, DatabaseConfig)
//! - [`listen`]: HTTP listener configuration (ListenConfig)
//! - [`security`]: Capability-token configuration (SecurityConfig)
//! - [`admin`]: Moderator credentials and sessions (AdminConfig)
//! - [`mail`]: Outbound notification settings (MailConfig, MailTransport)
//! - [`validation`]: Startup checks run before anything binds

mod admin;
mod listen;
mod mail;
mod security;
mod types;
pub mod validation;

pub use admin::AdminConfig;
pub use listen::ListenConfig;
pub use mail::{MailConfig, MailTransport};
pub use security::SecurityConfig;
pub use types::{Config, ConfigError, DatabaseConfig, Environment, ServerConfig};
