//! Prometheus metrics collection for verlihub-rs.
//!
//! Exposed over HTTP on the `/metrics` route (see `main.rs`'s axum router).
//! Tracks connection lifecycle, message throughput, policy enforcement, and
//! per-message-kind handler latency.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry for all metrics.
    pub static ref REGISTRY: Registry = Registry::new();

    // ========================================================================
    // Counters (monotonic increasing)
    // ========================================================================

    /// Total frames broadcast to at least one recipient.
    pub static ref MESSAGES_SENT: IntCounter = IntCounter::new(
        "nmdc_messages_sent_total",
        "Total frames sent to clients"
    ).unwrap();

    /// Total connections rejected or dropped due to an active ban.
    pub static ref BANS_TRIGGERED: IntCounter = IntCounter::new(
        "nmdc_bans_triggered_total",
        "Ban enforcement events"
    ).unwrap();

    /// Total flood-guard enforcement actions (warn/kick/ban), by kind.
    pub static ref FLOOD_ACTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("nmdc_flood_actions_total", "Flood guard actions taken"),
        &["kind", "action"],
    ).unwrap();

    /// Total clone-guard rejections.
    pub static ref CLONES_REJECTED: IntCounter = IntCounter::new(
        "nmdc_clones_rejected_total",
        "Logins rejected by the clone guard"
    ).unwrap();

    /// Per-handler-error-kind counter, labeled by message kind and error code.
    pub static ref COMMAND_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("nmdc_command_errors_total", "Handler errors by message kind"),
        &["kind", "error"],
    ).unwrap();

    // ========================================================================
    // Gauges (can increase/decrease)
    // ========================================================================

    /// Currently `InList` users.
    pub static ref CONNECTED_USERS: IntGauge = IntGauge::new(
        "nmdc_connected_users",
        "Currently InList users"
    ).unwrap();

    /// Total declared share across all InList users, in bytes.
    pub static ref TOTAL_SHARE_BYTES: IntGauge = IntGauge::new(
        "nmdc_total_share_bytes",
        "Sum of InList users' declared share"
    ).unwrap();

    // ========================================================================
    // Histograms
    // ========================================================================

    /// Handler latency per message kind, seconds.
    pub static ref COMMAND_LATENCY: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "nmdc_command_latency_seconds",
            "Handler latency by message kind"
        ),
        &["kind"],
    ).unwrap();

    /// Broadcast fan-out size (number of recipients per broadcast).
    pub static ref BROADCAST_FANOUT: prometheus::Histogram = prometheus::Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "nmdc_broadcast_fanout",
            "Recipients per broadcast"
        ).buckets(vec![1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]),
    ).unwrap();
}

/// Initialize the Prometheus metrics registry. Must be called once at
/// startup before any metrics are recorded.
pub fn init() {
    REGISTRY.register(Box::new(MESSAGES_SENT.clone())).unwrap();
    REGISTRY.register(Box::new(BANS_TRIGGERED.clone())).unwrap();
    REGISTRY.register(Box::new(FLOOD_ACTIONS.clone())).unwrap();
    REGISTRY.register(Box::new(CLONES_REJECTED.clone())).unwrap();
    REGISTRY.register(Box::new(COMMAND_ERRORS.clone())).unwrap();
    REGISTRY.register(Box::new(CONNECTED_USERS.clone())).unwrap();
    REGISTRY.register(Box::new(TOTAL_SHARE_BYTES.clone())).unwrap();
    REGISTRY.register(Box::new(COMMAND_LATENCY.clone())).unwrap();
    REGISTRY.register(Box::new(BROADCAST_FANOUT.clone())).unwrap();
}

/// Record a successfully handled message's latency.
pub fn record_command(kind: &str, duration_secs: f64) {
    COMMAND_LATENCY.with_label_values(&[kind]).observe(duration_secs);
}

/// Record a handler error, labeled by message kind and error code.
pub fn record_command_error(kind: &str, error_code: &str) {
    COMMAND_ERRORS.with_label_values(&[kind, error_code]).inc();
}

/// Record a flood guard action.
pub fn record_flood_action(kind: &str, action: &str) {
    FLOOD_ACTIONS.with_label_values(&[kind, action]).inc();
}

/// Record the recipient count of a broadcast.
pub fn record_fanout(recipients: usize) {
    BROADCAST_FANOUT.observe(recipients as f64);
}

/// Gather all metrics and encode them in Prometheus text format, suitable
/// for an HTTP response on the `/metrics` endpoint.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_metrics_includes_registered_families() {
        init();
        record_command("MyINFO", 0.002);
        let text = gather_metrics();
        assert!(text.contains("nmdc_command_latency_seconds"));
    }
}
