// Path: crates/telemetry/src/sinks.rs
//! Defines the abstract trait for claim metrics, decoupling the engine from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `ClaimMetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn ClaimMetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured claim metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn claim_metrics() -> &'static dyn ClaimMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definition ---

/// A sink for metrics produced by the reward reconciliation engine.
pub trait ClaimMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of aggregation passes, labeled by outcome (`ok`/`error`).
    fn inc_refreshes(&self, outcome: &'static str);
    /// Sets the gauge of rewards in the latest snapshot, labeled by source and state.
    fn set_snapshot_rewards(&self, source: &str, state: &str, count: u64);
    /// Increments the counter of submitted batches, labeled by source.
    fn inc_batches_submitted(&self, source: &str);
    /// Increments the counter of per-item outcomes, labeled by source and outcome.
    fn inc_item_outcomes(&self, source: &str, outcome: &'static str, count: u64);
    /// Increments the counter of gas estimates, labeled by kind (`simulated`/`fallback`).
    fn inc_estimates(&self, kind: &'static str);
    /// Observes how long an on-chain batch took from submission to receipt.
    fn observe_confirmation_duration(&self, duration_secs: f64);
    /// Increments a counter for a specific error, categorized by its stable code.
    fn inc_error(&self, code: &'static str);
}

impl ClaimMetricsSink for NopSink {
    fn inc_refreshes(&self, _outcome: &'static str) {}
    fn set_snapshot_rewards(&self, _source: &str, _state: &str, _count: u64) {}
    fn inc_batches_submitted(&self, _source: &str) {}
    fn inc_item_outcomes(&self, _source: &str, _outcome: &'static str, _count: u64) {}
    fn inc_estimates(&self, _kind: &'static str) {}
    fn observe_confirmation_duration(&self, _duration_secs: f64) {}
    fn inc_error(&self, _code: &'static str) {}
}
