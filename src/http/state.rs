//! Shared handler state.

use crate::db::Database;
use crate::moderation::Moderation;
use crate::security::SessionSigner;
use std::sync::Arc;

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub moderation: Moderation,
    pub sessions: Arc<SessionSigner>,
    /// Stored moderator password (hash or plaintext).
    pub admin_password: Arc<str>,
}

impl AppState {
    pub fn new(
        db: Database,
        moderation: Moderation,
        sessions: SessionSigner,
        admin_password: &str,
    ) -> Self {
        Self {
            db,
            moderation,
            sessions: Arc::new(sessions),
            admin_password: Arc::from(admin_password),
        }
    }
}
