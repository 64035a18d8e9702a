// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the claim metrics sink using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram, register_int_counter_vec, register_int_gauge_vec,
    Histogram, IntCounterVec, IntGaugeVec,
};

// --- Metric Statics ---
// Collectors are initialized exactly once by `install`.

static REFRESHES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SNAPSHOT_REWARDS: OnceCell<IntGaugeVec> = OnceCell::new();
static BATCHES_SUBMITTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ITEM_OUTCOMES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ESTIMATES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CONFIRMATION_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Skips the observation when `install()` has not run, e.g. when a test
/// drives the sink without registering collectors.
macro_rules! with_metric {
    ($metric:ident, |$m:ident| $body:expr) => {
        if let Some($m) = $metric.get() {
            $body;
        }
    };
}

impl ClaimMetricsSink for PrometheusSink {
    fn inc_refreshes(&self, outcome: &'static str) {
        with_metric!(REFRESHES_TOTAL, |m| m.with_label_values(&[outcome]).inc());
    }
    fn set_snapshot_rewards(&self, source: &str, state: &str, count: u64) {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        with_metric!(SNAPSHOT_REWARDS, |m| m
            .with_label_values(&[source, state])
            .set(count));
    }
    fn inc_batches_submitted(&self, source: &str) {
        with_metric!(BATCHES_SUBMITTED_TOTAL, |m| m
            .with_label_values(&[source])
            .inc());
    }
    fn inc_item_outcomes(&self, source: &str, outcome: &'static str, count: u64) {
        with_metric!(ITEM_OUTCOMES_TOTAL, |m| m
            .with_label_values(&[source, outcome])
            .inc_by(count));
    }
    fn inc_estimates(&self, kind: &'static str) {
        with_metric!(ESTIMATES_TOTAL, |m| m.with_label_values(&[kind]).inc());
    }
    fn observe_confirmation_duration(&self, duration_secs: f64) {
        with_metric!(CONFIRMATION_DURATION_SECONDS, |m| m.observe(duration_secs));
    }
    fn inc_error(&self, code: &'static str) {
        with_metric!(ERRORS_TOTAL, |m| m.with_label_values(&[code]).inc());
    }
}

static PROMETHEUS_SINK: PrometheusSink = PrometheusSink;

/// Initializes all Prometheus collectors and installs the sink globally.
/// Calling it a second time is a no-op returning the installed sink.
pub fn install() -> Result<&'static dyn ClaimMetricsSink, prometheus::Error> {
    if let Some(sink) = SINK.get() {
        return Ok(*sink);
    }
    let _ = REFRESHES_TOTAL.set(register_int_counter_vec!(
        "claimkit_refreshes_total",
        "Aggregation passes over both reward authorities.",
        &["outcome"]
    )?);
    let _ = SNAPSHOT_REWARDS.set(register_int_gauge_vec!(
        "claimkit_snapshot_rewards",
        "Rewards in the latest snapshot by source and state.",
        &["source", "state"]
    )?);
    let _ = BATCHES_SUBMITTED_TOTAL.set(register_int_counter_vec!(
        "claimkit_batches_submitted_total",
        "Claim batches submitted by claim path.",
        &["source"]
    )?);
    let _ = ITEM_OUTCOMES_TOTAL.set(register_int_counter_vec!(
        "claimkit_item_outcomes_total",
        "Per-item claim outcomes reported by the router.",
        &["source", "outcome"]
    )?);
    let _ = ESTIMATES_TOTAL.set(register_int_counter_vec!(
        "claimkit_gas_estimates_total",
        "Batch cost estimates by gas source.",
        &["kind"]
    )?);
    let _ = CONFIRMATION_DURATION_SECONDS.set(register_histogram!(
        "claimkit_confirmation_duration_seconds",
        "Time from transaction submission to receipt.",
        exponential_buckets(0.5, 2.0, 12)?
    )?);
    let _ = ERRORS_TOTAL.set(register_int_counter_vec!(
        "claimkit_errors_total",
        "Claim errors by stable code.",
        &["code"]
    )?);

    let sink: &'static dyn ClaimMetricsSink = &PROMETHEUS_SINK;
    let _ = SINK.set(sink);
    Ok(sink)
}
