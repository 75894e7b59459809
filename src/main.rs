//! bazaard - classifieds marketplace daemon.
//!
//! Serves the public catalog, the moderation API and the capability-link
//! endpoints that let anonymous sellers confirm a sale or ask for removal.

mod config;
mod db;
mod error;
mod http;
mod mail;
mod metrics;
mod moderation;
mod security;

use crate::config::Config;
use crate::db::Database;
use crate::mail::{Links, Notifier};
use crate::moderation::Moderation;
use crate::security::{SessionSigner, resolve_secret};
use bazaar_token::TokenCodec;
use std::io::BufRead;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let first_arg = std::env::args().nth(1);
    if first_arg.as_deref() == Some("hash-password") {
        return hash_password_command();
    }

    // Load configuration
    let config_path = first_arg.unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {}",
            errors.len(),
            config_path
        ));
    }

    let environment = config.server.environment;
    info!(
        server = %config.server.name,
        environment = ?environment,
        public_url = %config.server.base_url(),
        "Starting bazaard"
    );

    // SECURITY: Refuse to start in production with absent or placeholder keys.
    // Capability links stay valid for 30 days, so a guessable key lets anyone
    // confirm sales or request deletions for any listing.
    let token_secret = resolve_secret(
        "security.token_secret",
        config.security.token_secret.as_deref(),
        environment,
    );
    let session_secret = resolve_secret(
        "admin.session_secret",
        config.admin.session_secret.as_deref(),
        environment,
    );
    let (token_secret, session_secret) = match (token_secret, session_secret) {
        (Ok(t), Ok(s)) => (t, s),
        (t, s) => {
            for e in [t.err(), s.err()].into_iter().flatten() {
                error!("FATAL: {}", e);
            }
            error!("  Set strong secrets in the config file:");
            error!("    [security]");
            error!("    token_secret = \"<random-64-char-string>\"");
            error!("    [admin]");
            error!("    session_secret = \"<different-random-64-char-string>\"");
            error!("");
            error!("  Generate one with:");
            error!("    openssl rand -hex 32");
            error!("");
            error!("  For local testing only, set [server] environment = \"development\".");
            return Err(anyhow::anyhow!(
                "Refusing to start with insecure secrets. See error messages above."
            ));
        }
    };

    if config.admin.is_plaintext() {
        warn!("admin.password is stored in plaintext; generate a hash with `bazaard hash-password`");
    }
    config.security.warn_deprecated();

    // Initialize database
    let db = Database::new(config.database_path()).await?;

    let codec = Arc::new(
        TokenCodec::new(token_secret).with_clock_skew(config.security.max_clock_skew()),
    );
    let sessions = SessionSigner::new(session_secret, config.admin.session_ttl());

    let mailer = mail::from_config(&config.mail)?;
    info!(transport = mailer.transport(), "Mail transport ready");
    let notifier = Notifier::new(mailer, &config.mail, Links::new(config.server.base_url()))
        .with_site_name(config.server.name.clone());

    let moderation = Moderation::new(db.clone(), codec, notifier)
        .with_legacy_deletion_requests(config.security.legacy_deletion_requests);
    if moderation.legacy_deletion_requests() {
        info!("Legacy email-based deletion requests accepted");
    }

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    metrics::init();
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port == 0 {
        info!("Prometheus HTTP server disabled (metrics_port = 0)");
    } else {
        let ip = config.listen.address.ip();
        tokio::spawn(async move {
            http::run_metrics_server(ip, metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let state = http::AppState::new(db, moderation, sessions, &config.admin.password);
    let listener = tokio::net::TcpListener::bind(config.listen.address).await?;
    info!(address = %listener.local_addr()?, "HTTP API listening");

    http::serve(listener, state, shutdown_signal()).await?;

    info!("bazaard stopped");
    Ok(())
}

/// `bazaard hash-password [password]`: print an Argon2 hash for `admin.password`.
///
/// Reads the password from stdin when it is not given as an argument.
fn hash_password_command() -> anyhow::Result<()> {
    let password = match std::env::args().nth(2) {
        Some(p) => p,
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        return Err(anyhow::anyhow!("password must not be empty"));
    }

    let hash = security::password::hash_password(&password)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
    println!("{hash}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
