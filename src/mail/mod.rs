//! Outbound email notifications.
//!
//! A [`Mailer`] moves a rendered [`OutboundMail`] out of the process. The
//! [`Notifier`] sits in front of it: it renders messages, records metrics and
//! swallows delivery failures, since a notification is never allowed to undo
//! a state change that has already been committed.

mod templates;

pub use templates::Links;

use crate::config::{MailConfig, MailTransport};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Relay request timeout.
const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Mail delivery errors.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("relay request failed: {0}")]
    Relay(#[from] reqwest::Error),
    #[error("relay rejected message with status {0}")]
    RelayStatus(u16),
    #[error("mail transport misconfigured: {0}")]
    Misconfigured(&'static str),
}

/// Which notification a message is, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    ListingApproved,
    ListingRejected,
    DeletionRequestReceived,
    DeletionApproved,
    DeletionRejected,
    SaleConfirmed,
    NewSubmission,
}

impl MailKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListingApproved => "listing_approved",
            Self::ListingRejected => "listing_rejected",
            Self::DeletionRequestReceived => "deletion_request_received",
            Self::DeletionApproved => "deletion_approved",
            Self::DeletionRejected => "deletion_rejected",
            Self::SaleConfirmed => "sale_confirmed",
            Self::NewSubmission => "new_submission",
        }
    }
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct OutboundMail {
    pub kind: MailKind,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport name for logs.
    fn transport(&self) -> &'static str;

    /// Deliver one message from `from`.
    async fn send(&self, from: &str, mail: &OutboundMail) -> Result<(), MailError>;
}

/// Writes each message to the log instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn transport(&self) -> &'static str {
        "log"
    }

    async fn send(&self, from: &str, mail: &OutboundMail) -> Result<(), MailError> {
        info!(
            kind = mail.kind.as_str(),
            from = %from,
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "Outbound mail"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// POSTs each message as JSON to an HTTP mail relay.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpRelayMailer {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .user_agent(concat!("bazaard/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    fn transport(&self) -> &'static str {
        "http"
    }

    async fn send(&self, from: &str, mail: &OutboundMail) -> Result<(), MailError> {
        let payload = RelayPayload {
            from,
            to: &mail.to,
            subject: &mail.subject,
            text: &mail.body,
        };

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MailError::RelayStatus(status.as_u16()));
        }
        Ok(())
    }
}

/// Build the transport selected in configuration.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer)),
        MailTransport::Http => {
            let url = config
                .relay_url
                .as_deref()
                .ok_or(MailError::Misconfigured("mail.relay_url is required for the http transport"))?;
            Ok(Arc::new(HttpRelayMailer::new(url, config.relay_api_key.clone())))
        }
    }
}

/// Renders and delivers notifications. Delivery failures are logged, never returned.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from: String,
    moderation_address: Option<String>,
    links: Links,
    site_name: Option<String>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, config: &MailConfig, links: Links) -> Self {
        Self {
            mailer,
            from: config.from.clone(),
            moderation_address: config.moderation_address.clone(),
            links,
            site_name: None,
        }
    }

    /// Prefix every subject with `[name]`.
    pub fn with_site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = Some(name.into());
        self
    }

    /// Tell moderators about a new submission, if a moderation address is set.
    pub async fn new_submission(&self, product_id: i64, title: &str) {
        let Some(to) = self.moderation_address.as_deref() else {
            return;
        };
        self.deliver(templates::new_submission(to, product_id, title)).await;
    }

    /// Send the seller their two capability links.
    pub async fn listing_approved(&self, to: &str, product_id: i64, title: &str, token: &str) {
        self.deliver(templates::listing_approved(
            to,
            product_id,
            title,
            &self.links,
            token,
        ))
        .await;
    }

    pub async fn listing_rejected(&self, to: &str, title: &str, reason: Option<&str>) {
        self.deliver(templates::listing_rejected(to, title, reason))
            .await;
    }

    pub async fn deletion_request_received(&self, to: &str, title: &str) {
        self.deliver(templates::deletion_request_received(to, title))
            .await;
        if let Some(mods) = self.moderation_address.as_deref() {
            self.deliver(templates::deletion_request_queued(mods, title))
                .await;
        }
    }

    pub async fn deletion_resolved(&self, to: &str, title: &str, approved: bool) {
        self.deliver(templates::deletion_resolved(to, title, approved))
            .await;
    }

    pub async fn sale_confirmed(&self, to: &str, title: &str) {
        self.deliver(templates::sale_confirmed(to, title)).await;
    }

    async fn deliver(&self, mut mail: OutboundMail) {
        if let Some(name) = &self.site_name {
            mail.subject = format!("[{}] {}", name, mail.subject);
        }
        let kind = mail.kind.as_str();
        match self.mailer.send(&self.from, &mail).await {
            Ok(()) => crate::metrics::record_email(kind, "sent"),
            Err(e) => {
                crate::metrics::record_email(kind, "failed");
                error!(
                    kind,
                    transport = self.mailer.transport(),
                    to = %mail.to,
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        }
    }
}

/// Captures messages in memory.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    sent: parking_lot::Mutex<Vec<OutboundMail>>,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutboundMail> {
        self.sent.lock().clone()
    }

    pub fn of_kind(&self, kind: MailKind) -> Vec<OutboundMail> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.kind == kind)
            .cloned()
            .collect()
    }

    /// Make every later send fail.
    pub fn fail_all(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    fn transport(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, _from: &str, mail: &OutboundMail) -> Result<(), MailError> {
        if self.fail.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(MailError::RelayStatus(503));
        }
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}
