//! Prometheus metrics collection for bazaard.
//!
//! Exposed on a separate HTTP listener (see [`crate::http::run_metrics_server`]).
//!
//! - `bazaar_tokens_minted_total` - capability tokens issued on approval
//! - `bazaar_token_rejections_total{reason}` - tokens that failed validation
//! - `bazaar_redemptions_total{action,outcome}` - capability link redemptions
//! - `bazaar_api_errors_total{code}` - error responses by [`crate::error::ApiError::error_code`]
//! - `bazaar_emails_total{kind,outcome}` - outbound notifications

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Capability tokens minted.
pub static TOKENS_MINTED: OnceLock<IntCounter> = OnceLock::new();

/// Token validation failures by reason.
pub static TOKEN_REJECTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Redemptions by action and outcome.
pub static REDEMPTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// API error responses by code.
pub static API_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Outbound emails by kind and outcome.
pub static EMAILS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded. Repeated
/// calls are harmless.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(TOKENS_MINTED, IntCounter::new("bazaar_tokens_minted_total", "Capability tokens minted"));
    register!(TOKEN_REJECTIONS, IntCounterVec::new(Opts::new("bazaar_token_rejections_total", "Capability tokens rejected by reason"), &["reason"]));
    register!(REDEMPTIONS, IntCounterVec::new(Opts::new("bazaar_redemptions_total", "Capability link redemptions"), &["action", "outcome"]));
    register!(API_ERRORS, IntCounterVec::new(Opts::new("bazaar_api_errors_total", "API error responses by code"), &["code"]));
    register!(EMAILS, IntCounterVec::new(Opts::new("bazaar_emails_total", "Outbound emails by kind and outcome"), &["kind", "outcome"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

fn get_counter_vec(metric: &OnceLock<IntCounterVec>) -> Option<&IntCounterVec> {
    metric.get()
}

#[inline]
pub fn record_token_minted() {
    if let Some(c) = TOKENS_MINTED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_token_rejection(reason: &str) {
    if let Some(c) = get_counter_vec(&TOKEN_REJECTIONS) {
        c.with_label_values(&[reason]).inc();
    }
}

/// Record a redemption, e.g. `("confirm_sale", "applied")`.
#[inline]
pub fn record_redemption(action: &str, outcome: &str) {
    if let Some(c) = get_counter_vec(&REDEMPTIONS) {
        c.with_label_values(&[action, outcome]).inc();
    }
}

#[inline]
pub fn record_api_error(code: &str) {
    if let Some(c) = get_counter_vec(&API_ERRORS) {
        c.with_label_values(&[code]).inc();
    }
}

#[inline]
pub fn record_email(kind: &str, outcome: &str) {
    if let Some(c) = get_counter_vec(&EMAILS) {
        c.with_label_values(&[kind, outcome]).inc();
    }
}
