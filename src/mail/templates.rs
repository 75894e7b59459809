//! Notification text.

use super::{MailKind, OutboundMail};

/// Builds the public URLs embedded in seller emails.
#[derive(Debug, Clone)]
pub struct Links {
    base_url: String,
}

impl Links {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Page where the seller confirms the item sold.
    pub fn verify_sale(&self, token: &str) -> String {
        format!("{}/verify-sale?token={}", self.base_url, token)
    }

    /// Page where the seller asks for the listing to be removed.
    pub fn delete_request(&self, token: &str) -> String {
        format!("{}/delete-request?token={}", self.base_url, token)
    }

    pub fn listing(&self, product_id: i64) -> String {
        format!("{}/products/{}", self.base_url, product_id)
    }
}

pub(super) fn listing_approved(
    to: &str,
    product_id: i64,
    title: &str,
    links: &Links,
    token: &str,
) -> OutboundMail {
    OutboundMail {
        kind: MailKind::ListingApproved,
        to: to.to_string(),
        subject: format!("Your listing \"{}\" is live", title),
        body: format!(
            "Good news: \"{title}\" has been approved and is now visible in the catalog:\n\
             {listing}\n\
             \n\
             When the item sells, let buyers know by confirming the sale:\n\
             {verify}\n\
             \n\
             To have the listing removed, use this link:\n\
             {delete}\n\
             \n\
             Both links are personal and stay valid for 30 days. Anyone holding \
             them can act on your listing, so do not share them.\n",
            listing = links.listing(product_id),
            verify = links.verify_sale(token),
            delete = links.delete_request(token),
        ),
    }
}

pub(super) fn listing_rejected(to: &str, title: &str, reason: Option<&str>) -> OutboundMail {
    let reason = match reason {
        Some(r) if !r.trim().is_empty() => format!("Reason given by the moderator: {}\n", r.trim()),
        _ => String::new(),
    };
    OutboundMail {
        kind: MailKind::ListingRejected,
        to: to.to_string(),
        subject: format!("Your listing \"{}\" was not approved", title),
        body: format!(
            "Unfortunately \"{title}\" was not approved for the catalog.\n{reason}\
             You are welcome to submit a corrected listing.\n"
        ),
    }
}

pub(super) fn deletion_request_received(to: &str, title: &str) -> OutboundMail {
    OutboundMail {
        kind: MailKind::DeletionRequestReceived,
        to: to.to_string(),
        subject: format!("Deletion request for \"{}\" received", title),
        body: format!(
            "We received your request to remove \"{title}\". A moderator will \
             review it shortly and you will hear from us once it is handled.\n"
        ),
    }
}

pub(super) fn deletion_request_queued(to: &str, title: &str) -> OutboundMail {
    OutboundMail {
        kind: MailKind::DeletionRequestReceived,
        to: to.to_string(),
        subject: format!("Deletion requested: \"{}\"", title),
        body: format!("The seller of \"{title}\" asked for it to be removed.\n"),
    }
}

pub(super) fn deletion_resolved(to: &str, title: &str, approved: bool) -> OutboundMail {
    if approved {
        OutboundMail {
            kind: MailKind::DeletionApproved,
            to: to.to_string(),
            subject: format!("\"{}\" has been removed", title),
            body: format!("Your listing \"{title}\" has been removed from the catalog.\n"),
        }
    } else {
        OutboundMail {
            kind: MailKind::DeletionRejected,
            to: to.to_string(),
            subject: format!("Deletion request for \"{}\" declined", title),
            body: format!(
                "A moderator declined the request to remove \"{title}\". The \
                 listing stays in the catalog. Reply to this message if you \
                 think this is a mistake.\n"
            ),
        }
    }
}

pub(super) fn sale_confirmed(to: &str, title: &str) -> OutboundMail {
    OutboundMail {
        kind: MailKind::SaleConfirmed,
        to: to.to_string(),
        subject: format!("Sale of \"{}\" confirmed", title),
        body: format!(
            "Thanks for letting us know \"{title}\" sold. The listing is now \
             marked as sold.\n"
        ),
    }
}

pub(super) fn new_submission(to: &str, product_id: i64, title: &str) -> OutboundMail {
    OutboundMail {
        kind: MailKind::NewSubmission,
        to: to.to_string(),
        subject: format!("New submission #{}: \"{}\"", product_id, title),
        body: format!("\"{title}\" (#{product_id}) is waiting for moderation.\n"),
    }
}
