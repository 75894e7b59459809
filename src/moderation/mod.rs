//! Listing lifecycle and capability-link workflows.
//!
//! [`Moderation`] owns every state transition a listing goes through:
//!
//! ```text
//! submitted --approve--> live --confirm_sale--> live + sold_verified
//!     |                   |
//!     +--reject--> rejected  +--request_deletion--> pending request
//!                                 |--approve_deletion--> deleted
//!                                 +--reject_deletion---> live
//! ```
//!
//! Approval mints a capability token and mails it to the seller. The
//! redemption side ([`redemption`]) trusts nothing from the request except the
//! token itself: the product id is always taken from the validated token.

mod intake;
mod issuance;
mod redemption;

pub use intake::SubmissionError;

use crate::db::{Database, DbError, ProductStatus};
use crate::mail::Notifier;
use bazaar_token::{TokenCodec, TokenError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors from moderation workflows.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The capability token failed validation. Display text is the same for
    /// every cause.
    #[error("{0}")]
    InvalidLink(TokenError),
    /// The token is valid but the listing no longer exists.
    #[error("listing no longer exists")]
    AlreadyHandled,
    /// Legacy deletion request whose product/email pair did not match.
    #[error("ownership could not be verified")]
    OwnershipNotVerified,
    /// Legacy deletion requests are switched off.
    #[error("a deletion link is required")]
    LegacyDisabled,
    #[error("product not found: {0}")]
    ProductNotFound(i64),
    #[error("deletion request not found: {0}")]
    RequestNotFound(i64),
    /// The target exists but is not in a state that allows the transition.
    #[error("{0}")]
    Conflict(&'static str),
    #[error("invalid submission: {0}")]
    InvalidSubmission(#[from] SubmissionError),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result of approving a submission.
#[derive(Debug, Clone)]
pub struct ApprovedListing {
    pub product_id: i64,
    pub title: String,
    /// Epoch seconds.
    pub approved_at: i64,
}

/// Result of a sale confirmation.
#[derive(Debug, Clone, Copy)]
pub struct SaleConfirmation {
    pub product_id: i64,
    /// Epoch seconds of the first confirmation.
    pub sold_at: i64,
    /// `true` if an earlier confirmation already marked the sale.
    pub already_verified: bool,
}

/// Result of a deletion request.
#[derive(Debug, Clone, Copy)]
pub struct DeletionOutcome {
    pub request_id: i64,
    pub product_id: i64,
    /// `true` if a request was already pending; nothing new was recorded.
    pub already_requested: bool,
}

/// What a token currently grants, for the link landing pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenInspection {
    Valid { product_id: i64, title: String },
    /// Signature and age are fine but the listing is gone.
    NotFound,
    Invalid,
}

/// Moderation service shared by the HTTP handlers.
#[derive(Clone)]
pub struct Moderation {
    db: Database,
    codec: Arc<TokenCodec>,
    notifier: Notifier,
    legacy_deletion_requests: bool,
}

impl Moderation {
    pub fn new(db: Database, codec: Arc<TokenCodec>, notifier: Notifier) -> Self {
        Self {
            db,
            codec,
            notifier,
            legacy_deletion_requests: false,
        }
    }

    /// Accept deletion requests proven by product id and email.
    pub fn with_legacy_deletion_requests(mut self, enabled: bool) -> Self {
        self.legacy_deletion_requests = enabled;
        self
    }

    pub fn legacy_deletion_requests(&self) -> bool {
        self.legacy_deletion_requests
    }

    /// Report what `token` would act on, without acting.
    pub async fn inspect(&self, token: &str) -> Result<TokenInspection, ModerationError> {
        let product_id = match self.validate(token, "inspect") {
            Ok(id) => id,
            Err(_) => return Ok(TokenInspection::Invalid),
        };

        match self.db.products().find(product_id).await? {
            Some(product) if product.status == ProductStatus::Live => Ok(TokenInspection::Valid {
                product_id,
                title: product.title,
            }),
            _ => {
                debug!(product_id, "Valid token for a listing that no longer exists");
                Ok(TokenInspection::NotFound)
            }
        }
    }

    /// Validate a token, recording why it failed.
    fn validate(&self, token: &str, action: &'static str) -> Result<i64, ModerationError> {
        self.codec.validate(token).map_err(|e| {
            debug!(action, reason = e.reason(), "Capability token rejected");
            crate::metrics::record_token_rejection(e.reason());
            crate::metrics::record_redemption(action, "rejected");
            ModerationError::InvalidLink(e)
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::MailConfig;
    use crate::db::{NewSubmission, Product};
    use crate::mail::{Links, RecordingMailer};
    use bazaar_token::SigningSecret;

    pub const TEST_SECRET: &str = "test-signing-key-0123456789abcdef";

    pub struct Harness {
        pub moderation: Moderation,
        pub db: Database,
        pub mailer: Arc<RecordingMailer>,
        pub codec: Arc<TokenCodec>,
    }

    pub async fn harness() -> Harness {
        let db = Database::new(":memory:").await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let codec = Arc::new(TokenCodec::new(SigningSecret::new(TEST_SECRET)));
        let config = MailConfig {
            moderation_address: Some("mods@bazaar.test".to_string()),
            ..MailConfig::default()
        };
        let notifier = Notifier::new(mailer.clone(), &config, Links::new("https://bazaar.test"));
        let moderation = Moderation::new(db.clone(), codec.clone(), notifier);
        Harness {
            moderation,
            db,
            mailer,
            codec,
        }
    }

    pub fn submission(title: &str) -> NewSubmission {
        NewSubmission {
            title: title.to_string(),
            description: "In good condition".to_string(),
            price_cents: 2_500,
            location: None,
            submitter_email: "Seller@Example.com".to_string(),
        }
    }

    /// Submit and approve a listing, returning it with its live token.
    pub async fn live_listing(h: &Harness, title: &str) -> (Product, String) {
        let product = h.moderation.submit(submission(title)).await.unwrap();
        h.moderation.approve_submission(product.id).await.unwrap();
        let token = h.codec.mint(product.id);
        let product = h.db.products().find(product.id).await.unwrap().unwrap();
        (product, token)
    }
}
