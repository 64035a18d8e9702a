// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # claimkit Telemetry
//!
//! Structured logging initialization, claim metrics sinks with a Prometheus
//! backend, and a small HTTP endpoint exposing them.

/// The watch HTTP server: `/metrics` and refresh health on `/healthz`.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of the metrics sink using the `prometheus` crate.
pub mod prometheus;
/// Abstract trait (`ClaimMetricsSink`) that defines the contract for metrics reporting.
pub mod sinks;
/// A simple RAII timer for measuring the duration of a scope.
pub mod time;

pub use sinks::claim_metrics;
