//! Outbound notification configuration.

use serde::Deserialize;

/// How notifications leave the process.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Write messages to the log (development, or an external log shipper).
    #[default]
    Log,
    /// POST messages as JSON to an HTTP mail relay.
    Http,
}

/// Outbound mail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Delivery transport (default: log).
    #[serde(default)]
    pub transport: MailTransport,
    /// Sender address.
    #[serde(default = "default_from")]
    pub from: String,
    /// Where new submissions and deletion requests are announced.
    pub moderation_address: Option<String>,
    /// Relay endpoint for the `http` transport.
    pub relay_url: Option<String>,
    /// Bearer key sent to the relay, if it wants one.
    pub relay_api_key: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::default(),
            from: default_from(),
            moderation_address: None,
            relay_url: None,
            relay_api_key: None,
        }
    }
}

fn default_from() -> String {
    "noreply@localhost".to_string()
}
