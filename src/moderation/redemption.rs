//! Seller-side redemption of capability links.
//!
//! Tokens are bearer capabilities: presenting one twice is allowed, and the
//! second presentation finds the conditional write already applied and
//! reports that instead of acting again.

use super::{DeletionOutcome, Moderation, ModerationError, SaleConfirmation};
use crate::db::{Product, ProductStatus, RequestOrigin, SaleStatus};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

const CONFIRM_SALE: &str = "confirm_sale";
const REQUEST_DELETION: &str = "request_deletion";
const REQUEST_DELETION_LEGACY: &str = "request_deletion_legacy";

/// Longest seller comment or deletion reason kept.
const NOTE_MAX_CHARS: usize = 1000;

fn clean_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| n.chars().take(NOTE_MAX_CHARS).collect())
}

impl Moderation {
    /// Mark the token's listing as sold.
    pub async fn confirm_sale(
        &self,
        token: &str,
        comment: Option<&str>,
    ) -> Result<SaleConfirmation, ModerationError> {
        let product_id = self.validate(token, CONFIRM_SALE)?;
        let product = self.redeemable(product_id, CONFIRM_SALE).await?;
        let comment = clean_note(comment);
        let now = chrono::Utc::now().timestamp();

        if self
            .db
            .products()
            .mark_sold(product_id, comment.as_deref(), now)
            .await?
        {
            info!(product_id, "Sale confirmed by seller");
            crate::metrics::record_redemption(CONFIRM_SALE, "applied");
            self.notifier
                .sale_confirmed(&product.submitter_email, &product.title)
                .await;
            return Ok(SaleConfirmation {
                product_id,
                sold_at: now,
                already_verified: false,
            });
        }

        // Nothing changed: either an earlier confirmation won, or the
        // listing vanished in between.
        let current = self.redeemable(product_id, CONFIRM_SALE).await?;
        if current.sale_status == SaleStatus::SoldVerified {
            debug!(product_id, "Sale already confirmed");
            crate::metrics::record_redemption(CONFIRM_SALE, "already_applied");
            return Ok(SaleConfirmation {
                product_id,
                sold_at: current.sold_at.unwrap_or(now),
                already_verified: true,
            });
        }

        Err(ModerationError::Conflict("listing is not live"))
    }

    /// Open a deletion request for the token's listing.
    pub async fn request_deletion(
        &self,
        token: &str,
        reason: Option<&str>,
    ) -> Result<DeletionOutcome, ModerationError> {
        let product_id = self.validate(token, REQUEST_DELETION)?;
        let product = self.redeemable(product_id, REQUEST_DELETION).await?;
        self.open_deletion(&product, reason, RequestOrigin::Token, REQUEST_DELETION)
            .await
    }

    /// Open a deletion request proven by product id and submitter email.
    ///
    /// Unknown products and wrong emails are indistinguishable to the caller.
    pub async fn request_deletion_legacy(
        &self,
        product_id: i64,
        submitter_email: &str,
        reason: Option<&str>,
    ) -> Result<DeletionOutcome, ModerationError> {
        if !self.legacy_deletion_requests {
            return Err(ModerationError::LegacyDisabled);
        }

        let product = self.db.products().find(product_id).await?;
        let claimed = submitter_email.trim().to_lowercase();
        let stored = product
            .as_ref()
            .map(|p| p.submitter_email.trim().to_lowercase())
            .unwrap_or_default();
        let matches: bool = claimed.as_bytes().ct_eq(stored.as_bytes()).into();

        let product = match product {
            Some(p) if matches && !claimed.is_empty() && p.status == ProductStatus::Live => p,
            _ => {
                info!(product_id, "Legacy deletion request failed ownership check");
                crate::metrics::record_redemption(REQUEST_DELETION_LEGACY, "rejected");
                return Err(ModerationError::OwnershipNotVerified);
            }
        };

        self.open_deletion(
            &product,
            reason,
            RequestOrigin::Legacy,
            REQUEST_DELETION_LEGACY,
        )
        .await
    }

    async fn open_deletion(
        &self,
        product: &Product,
        reason: Option<&str>,
        origin: RequestOrigin,
        action: &'static str,
    ) -> Result<DeletionOutcome, ModerationError> {
        let reason = clean_note(reason);
        let requests = self.db.deletion_requests();

        if let Some(request) = requests.open(product, reason.as_deref(), origin).await? {
            info!(
                product_id = product.id,
                request_id = request.id,
                origin = origin.as_str(),
                "Deletion requested"
            );
            crate::metrics::record_redemption(action, "applied");
            self.notifier
                .deletion_request_received(&product.submitter_email, &product.title)
                .await;
            return Ok(DeletionOutcome {
                request_id: request.id,
                product_id: product.id,
                already_requested: false,
            });
        }

        match requests.find_pending(product.id).await? {
            Some(existing) => {
                debug!(product_id = product.id, request_id = existing.id, "Deletion already requested");
                crate::metrics::record_redemption(action, "already_applied");
                Ok(DeletionOutcome {
                    request_id: existing.id,
                    product_id: product.id,
                    already_requested: true,
                })
            }
            // Resolved between our insert and this read
            None => Err(ModerationError::AlreadyHandled),
        }
    }

    /// Load the product a valid token points at.
    async fn redeemable(
        &self,
        product_id: i64,
        action: &'static str,
    ) -> Result<Product, ModerationError> {
        match self.db.products().find(product_id).await? {
            Some(product) if product.status == ProductStatus::Live => Ok(product),
            _ => {
                info!(product_id, action, "Capability link for a listing that no longer exists");
                crate::metrics::record_redemption(action, "gone");
                Err(ModerationError::AlreadyHandled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewSubmission;
    use crate::mail::MailKind;
    use crate::moderation::test_support::*;
    use bazaar_token::{SigningSecret, TokenCodec, TokenError};

    #[tokio::test]
    async fn test_confirm_sale_twice() {
        let h = harness().await;
        let (product, token) = live_listing(&h, "Piano").await;

        let first = h
            .moderation
            .confirm_sale(&token, Some("collected today"))
            .await
            .unwrap();
        assert!(!first.already_verified);
        assert_eq!(first.product_id, product.id);

        let second = h.moderation.confirm_sale(&token, Some("again")).await.unwrap();
        assert!(second.already_verified);
        assert_eq!(second.sold_at, first.sold_at);

        let stored = h.db.products().find(product.id).await.unwrap().unwrap();
        assert_eq!(stored.sale_status, SaleStatus::SoldVerified);
        assert_eq!(stored.sale_comment.as_deref(), Some("collected today"));
        assert_eq!(h.mailer.of_kind(MailKind::SaleConfirmed).len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_sale_acts_on_token_listing_only() {
        let h = harness().await;
        let (a, token_a) = live_listing(&h, "Listing A").await;
        let (b, _) = live_listing(&h, "Listing B").await;

        let outcome = h.moderation.confirm_sale(&token_a, None).await.unwrap();
        assert_eq!(outcome.product_id, a.id);

        let b = h.db.products().find(b.id).await.unwrap().unwrap();
        assert_eq!(b.sale_status, SaleStatus::Available);
    }

    #[tokio::test]
    async fn test_rejected_tokens_change_nothing() {
        let h = harness().await;
        let (product, token) = live_listing(&h, "Drone").await;

        let forged = TokenCodec::new(SigningSecret::new("some-other-secret-entirely-xyz"))
            .mint(product.id);
        let expired = h.codec.mint_at(product.id, 1_000);

        let err = h.moderation.confirm_sale(&forged, None).await.unwrap_err();
        assert!(matches!(err, ModerationError::InvalidLink(TokenError::BadSignature)));
        let err = h.moderation.request_deletion(&expired, None).await.unwrap_err();
        assert!(matches!(err, ModerationError::InvalidLink(TokenError::Expired)));

        let mut tampered = token.clone();
        tampered.push('A');
        assert!(matches!(
            h.moderation.confirm_sale(&tampered, None).await,
            Err(ModerationError::InvalidLink(_))
        ));

        let stored = h.db.products().find(product.id).await.unwrap().unwrap();
        assert_eq!(stored.sale_status, SaleStatus::Available);
        assert!(h.db.deletion_requests().list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_deletion_request() {
        let h = harness().await;
        let (product, token) = live_listing(&h, "Sofa").await;

        let first = h
            .moderation
            .request_deletion(&token, Some("moving abroad"))
            .await
            .unwrap();
        let second = h.moderation.request_deletion(&token, None).await.unwrap();

        assert!(!first.already_requested);
        assert!(second.already_requested);
        assert_eq!(first.request_id, second.request_id);
        assert_eq!(second.product_id, product.id);

        let pending = h.db.deletion_requests().list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reason.as_deref(), Some("moving abroad"));

        // Seller and moderators hear about it once
        assert_eq!(h.mailer.of_kind(MailKind::DeletionRequestReceived).len(), 2);
    }

    #[tokio::test]
    async fn test_redeem_after_deletion() {
        let h = harness().await;
        let (product, token) = live_listing(&h, "Mirror").await;
        let outcome = h.moderation.request_deletion(&token, None).await.unwrap();
        h.moderation.approve_deletion(outcome.request_id).await.unwrap();

        assert!(matches!(
            h.moderation.confirm_sale(&token, None).await,
            Err(ModerationError::AlreadyHandled)
        ));
        assert!(matches!(
            h.moderation.request_deletion(&token, None).await,
            Err(ModerationError::AlreadyHandled)
        ));
        assert!(h.db.products().find(product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deletion_racing_moderator_removal() {
        let h = harness().await;
        let (product, _) = live_listing(&h, "Wardrobe").await;

        // The moderator removes the listing after the redemption loaded it
        h.moderation.delete_product(product.id).await.unwrap();
        let result = h
            .moderation
            .open_deletion(&product, Some("moving"), RequestOrigin::Token, REQUEST_DELETION)
            .await;

        assert!(matches!(result, Err(ModerationError::AlreadyHandled)));
        assert!(h.db.deletion_requests().list_pending().await.unwrap().is_empty());
        assert!(h.mailer.of_kind(MailKind::DeletionRequestReceived).is_empty());
    }

    #[tokio::test]
    async fn test_legacy_path_disabled_by_default() {
        let h = harness().await;
        let (product, _) = live_listing(&h, "Clock").await;
        let err = h
            .moderation
            .request_deletion_legacy(product.id, "seller@example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::LegacyDisabled));
    }

    #[tokio::test]
    async fn test_legacy_path_hides_existence() {
        let mut h = harness().await;
        h.moderation = h.moderation.clone().with_legacy_deletion_requests(true);
        let (product, _) = live_listing(&h, "Clock").await;

        let wrong_email = h
            .moderation
            .request_deletion_legacy(product.id, "someone@else.com", None)
            .await
            .unwrap_err();
        let unknown = h
            .moderation
            .request_deletion_legacy(9_999, "seller@example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(wrong_email, ModerationError::OwnershipNotVerified));
        assert!(matches!(unknown, ModerationError::OwnershipNotVerified));

        // Case and surrounding space do not matter
        let outcome = h
            .moderation
            .request_deletion_legacy(product.id, "  SELLER@example.COM ", Some("sold"))
            .await
            .unwrap();
        assert!(!outcome.already_requested);

        let request = h
            .db
            .deletion_requests()
            .find(outcome.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.origin, RequestOrigin::Legacy);
    }

    #[tokio::test]
    async fn test_unapproved_listing_not_redeemable() {
        let h = harness().await;
        let product = h
            .moderation
            .submit(NewSubmission {
                title: "Unreviewed".to_string(),
                description: String::new(),
                price_cents: 0,
                location: None,
                submitter_email: "seller@example.com".to_string(),
            })
            .await
            .unwrap();
        let token = h.codec.mint(product.id);

        assert!(matches!(
            h.moderation.confirm_sale(&token, None).await,
            Err(ModerationError::AlreadyHandled)
        ));
    }

    #[test]
    fn test_clean_note() {
        assert_eq!(clean_note(None), None);
        assert_eq!(clean_note(Some("   ")), None);
        assert_eq!(clean_note(Some(" ok ")).as_deref(), Some("ok"));
        assert_eq!(clean_note(Some(&"x".repeat(2000))).map(|n| n.len()), Some(1000));
    }
}
