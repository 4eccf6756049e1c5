//! Prometheus metrics collection for nestboard.
//!
//! Tracks forum activity (channels, invites, posts), API error rates by
//! code, and notification fan-out size. Exposed in text format on the
//! `/metrics` route of the main listener.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Total channels created through the API.
pub static CHANNELS_CREATED: OnceLock<IntCounter> = OnceLock::new();

/// Total invites created (rows written, not already-member no-ops).
pub static INVITES_CREATED: OnceLock<IntCounter> = OnceLock::new();

/// Invites reaching a terminal or reviewed state, by action.
pub static INVITES_RESOLVED: OnceLock<IntCounterVec> = OnceLock::new();

/// Total posts accepted.
pub static POSTS_CREATED: OnceLock<IntCounter> = OnceLock::new();

/// API errors by machine-readable code.
pub static API_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// Notification fan-out: rows written per accepted post.
pub static NOTIFICATION_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(CHANNELS_CREATED, IntCounter::new("nestboard_channels_created_total", "Channels created"));
    register!(INVITES_CREATED, IntCounter::new("nestboard_invites_created_total", "Invites created"));
    register!(INVITES_RESOLVED, IntCounterVec::new(Opts::new("nestboard_invites_resolved_total", "Invite reviews and responses by action"), &["action"]));
    register!(POSTS_CREATED, IntCounter::new("nestboard_posts_created_total", "Posts accepted"));
    register!(API_ERRORS, IntCounterVec::new(Opts::new("nestboard_api_errors_total", "API errors by code"), &["code"]));
    register!(NOTIFICATION_FANOUT, Histogram::with_opts(
        HistogramOpts::new("nestboard_notification_fanout", "Notification rows written per post")
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0])));
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

// ============================================================================
// Helper functions for metric updates
// ============================================================================

/// Record a created channel.
#[inline]
pub fn record_channel_created() {
    if let Some(c) = CHANNELS_CREATED.get() {
        c.inc();
    }
}

/// Record a created invite.
#[inline]
pub fn record_invite_created() {
    if let Some(c) = INVITES_CREATED.get() {
        c.inc();
    }
}

/// Record an invite review or response ("approved", "accepted", "declined").
#[inline]
pub fn record_invite_resolved(action: &str) {
    if let Some(c) = INVITES_RESOLVED.get() {
        c.with_label_values(&[action]).inc();
    }
}

/// Record an accepted post.
#[inline]
pub fn record_post_created() {
    if let Some(c) = POSTS_CREATED.get() {
        c.inc();
    }
}

/// Record an API error by code.
#[inline]
pub fn record_api_error(code: &str) {
    if let Some(c) = API_ERRORS.get() {
        c.with_label_values(&[code]).inc();
    }
}

/// Record notification fan-out (rows written for one post).
#[inline]
pub fn record_fanout(recipients: usize) {
    if let Some(h) = NOTIFICATION_FANOUT.get() {
        h.observe(recipients as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        record_post_created();
        record_fanout(3);
        record_api_error("channel_not_found");

        let output = gather_metrics();
        assert!(output.contains("nestboard_posts_created_total"));
        assert!(output.contains("nestboard_notification_fanout"));
    }
}
