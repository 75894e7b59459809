//! Moderator-side transitions: approval mints the seller's capability token.

use super::{ApprovedListing, Moderation, ModerationError};
use crate::db::{DeletionRequest, Product};
use tracing::info;

impl Moderation {
    /// Approve a submission, mint its token and mail the seller both links.
    pub async fn approve_submission(
        &self,
        product_id: i64,
    ) -> Result<ApprovedListing, ModerationError> {
        let product = self.submitted(product_id).await?;

        if !self.db.products().approve(product_id).await? {
            return Err(ModerationError::Conflict("listing is not awaiting moderation"));
        }

        let token = self.codec.mint(product_id);
        crate::metrics::record_token_minted();
        info!(product_id, title = %product.title, "Listing approved, capability token issued");

        self.notifier
            .listing_approved(&product.submitter_email, product_id, &product.title, &token)
            .await;

        Ok(ApprovedListing {
            product_id,
            title: product.title,
            approved_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Turn a submission down and tell the seller why.
    pub async fn reject_submission(
        &self,
        product_id: i64,
        reason: Option<&str>,
    ) -> Result<(), ModerationError> {
        let product = self.submitted(product_id).await?;
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        if !self.db.products().reject(product_id, reason).await? {
            return Err(ModerationError::Conflict("listing is not awaiting moderation"));
        }

        info!(product_id, title = %product.title, "Listing rejected");
        self.notifier
            .listing_rejected(&product.submitter_email, &product.title, reason)
            .await;
        Ok(())
    }

    /// Approve a pending deletion request; the listing is removed.
    pub async fn approve_deletion(
        &self,
        request_id: i64,
    ) -> Result<DeletionRequest, ModerationError> {
        let Some(request) = self.db.deletion_requests().approve(request_id).await? else {
            return Err(self.unresolvable(request_id).await?);
        };

        info!(
            request_id,
            product_id = request.product_id,
            "Deletion request approved, listing removed"
        );
        self.notifier
            .deletion_resolved(&request.submitter_email, &request.product_title, true)
            .await;
        Ok(request)
    }

    /// Reject a pending deletion request; the listing stays live.
    pub async fn reject_deletion(
        &self,
        request_id: i64,
    ) -> Result<DeletionRequest, ModerationError> {
        let Some(request) = self.db.deletion_requests().reject(request_id).await? else {
            return Err(self.unresolvable(request_id).await?);
        };

        info!(request_id, product_id = request.product_id, "Deletion request rejected");
        self.notifier
            .deletion_resolved(&request.submitter_email, &request.product_title, false)
            .await;
        Ok(request)
    }

    /// Remove a listing directly. A pending deletion request for it is
    /// resolved as approved so the seller hears back.
    pub async fn delete_product(&self, product_id: i64) -> Result<(), ModerationError> {
        if let Some(pending) = self.db.deletion_requests().find_pending(product_id).await?
            && self.db.deletion_requests().approve(pending.id).await?.is_some()
        {
            info!(product_id, request_id = pending.id, "Listing removed by moderator");
            self.notifier
                .deletion_resolved(&pending.submitter_email, &pending.product_title, true)
                .await;
            return Ok(());
        }

        if !self.db.products().delete(product_id).await? {
            return Err(ModerationError::ProductNotFound(product_id));
        }
        info!(product_id, "Listing removed by moderator");
        Ok(())
    }

    async fn submitted(&self, product_id: i64) -> Result<Product, ModerationError> {
        self.db
            .products()
            .find(product_id)
            .await?
            .ok_or(ModerationError::ProductNotFound(product_id))
    }

    /// Error for a request that could not be resolved.
    async fn unresolvable(&self, request_id: i64) -> Result<ModerationError, ModerationError> {
        Ok(match self.db.deletion_requests().find(request_id).await? {
            Some(_) => ModerationError::Conflict("deletion request was already resolved"),
            None => ModerationError::RequestNotFound(request_id),
        })
    }
}
