//! Prometheus metrics collection for capgate.
//!
//! Exposed in text format on `GET /metrics`.
//!
//! - `capgate_tokens_issued_total{kind}` - pairs issued by login or refresh
//! - `capgate_refresh_reuse_detected_total` - sessions revoked on replay
//! - `capgate_auth_failures_total{stage,error}` - rejected requests
//! - `capgate_verify_duration_seconds` - access token verification latency
//! - `capgate_request_duration_seconds{route}` - handler latency

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Token pairs issued, by `login` or `refresh`.
pub static TOKENS_ISSUED: OnceLock<IntCounterVec> = OnceLock::new();

/// Refresh tokens presented after they were rotated away.
pub static REUSE_DETECTED: OnceLock<IntCounter> = OnceLock::new();

/// Authentication and authorization failures by stage and error code.
pub static AUTH_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Latency
// ========================================================================

/// Access token verification latency.
pub static VERIFY_LATENCY: OnceLock<Histogram> = OnceLock::new();

/// Request handling latency by route.
pub static REQUEST_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Recording before `init` is a no-op.
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

    register!(TOKENS_ISSUED, IntCounterVec::new(Opts::new("capgate_tokens_issued_total", "Token pairs issued"), &["kind"]));
    register!(REUSE_DETECTED, IntCounter::new("capgate_refresh_reuse_detected_total", "Refresh token reuse detections"));
    register!(AUTH_FAILURES, IntCounterVec::new(Opts::new("capgate_auth_failures_total", "Authentication failures by stage and error"), &["stage", "error"]));
    register!(VERIFY_LATENCY, Histogram::with_opts(
        HistogramOpts::new("capgate_verify_duration_seconds", "Access token verification latency")
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01])));
    register!(REQUEST_LATENCY, HistogramVec::new(
        HistogramOpts::new("capgate_request_duration_seconds", "Request latency by route")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["route"]));
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
// Recording helpers
// ============================================================================

#[inline]
pub fn record_tokens_issued(kind: &str) {
    if let Some(c) = TOKENS_ISSUED.get() {
        c.with_label_values(&[kind]).inc();
    }
}

#[inline]
pub fn record_reuse_detected() {
    if let Some(c) = REUSE_DETECTED.get() {
        c.inc();
    }
}

/// Record a rejected request. `stage` is `credential`, `token` or `refresh`.
#[inline]
pub fn record_auth_failure(stage: &str, error: &str) {
    if let Some(c) = AUTH_FAILURES.get() {
        c.with_label_values(&[stage, error]).inc();
    }
}

#[inline]
pub fn observe_verify(duration_secs: f64) {
    if let Some(h) = VERIFY_LATENCY.get() {
        h.observe(duration_secs);
    }
}

#[inline]
pub fn observe_request(route: &str, duration_secs: f64) {
    if let Some(h) = REQUEST_LATENCY.get() {
        h.with_label_values(&[route]).observe(duration_secs);
    }
}
