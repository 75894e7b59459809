//! Submission intake.

use super::{Moderation, ModerationError};
use crate::db::{NewSubmission, Product};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

const TITLE_MIN_CHARS: usize = 3;
const TITLE_MAX_CHARS: usize = 120;
const DESCRIPTION_MAX_CHARS: usize = 5000;
const LOCATION_MAX_CHARS: usize = 120;
const EMAIL_MAX_LEN: usize = 254;

/// Why a submission was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("title must be between 3 and 120 characters")]
    Title,
    #[error("description must be at most 5000 characters")]
    Description,
    #[error("price must not be negative")]
    Price,
    #[error("location must be at most 120 characters")]
    Location,
    #[error("a valid contact email is required")]
    Email,
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
}

fn is_plausible_email(email: &str) -> bool {
    email.len() <= EMAIL_MAX_LEN && email_regex().is_some_and(|re| re.is_match(email))
}

/// Trim fields and check them against the listing rules.
pub(super) fn normalize(mut submission: NewSubmission) -> Result<NewSubmission, SubmissionError> {
    submission.title = submission.title.trim().to_string();
    submission.description = submission.description.trim().to_string();
    submission.submitter_email = submission.submitter_email.trim().to_string();
    submission.location = submission
        .location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let title_len = submission.title.chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&title_len) {
        return Err(SubmissionError::Title);
    }
    if submission.description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(SubmissionError::Description);
    }
    if submission.price_cents < 0 {
        return Err(SubmissionError::Price);
    }
    if submission
        .location
        .as_ref()
        .is_some_and(|l| l.chars().count() > LOCATION_MAX_CHARS)
    {
        return Err(SubmissionError::Location);
    }
    if !is_plausible_email(&submission.submitter_email) {
        return Err(SubmissionError::Email);
    }

    Ok(submission)
}

impl Moderation {
    /// Store a new listing for moderation and tell the moderators.
    pub async fn submit(&self, submission: NewSubmission) -> Result<Product, ModerationError> {
        let submission = normalize(submission)?;
        let product = self.db.products().create_submission(&submission).await?;

        info!(product_id = product.id, title = %product.title, "Listing submitted");
        self.notifier
            .new_submission(product.id, &product.title)
            .await;

        Ok(product)
    }
}
