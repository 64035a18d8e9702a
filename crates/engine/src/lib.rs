// Path: crates/engine/src/lib.rs
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

//! # claimkit Engine
//!
//! Reconciles user rewards across an on-chain Merkle distributor and the
//! rewards ledger. The engine never infers a claim outcome: after every
//! attempt it re-queries both authorities and diffs.

/// Aggregation of both authorities into one snapshot.
pub mod aggregate;
/// The caller-facing `RewardEngine`.
pub mod engine;
/// Gas estimation and estimate staleness tracking.
pub mod estimate;
/// Post-attempt reconciliation.
pub mod reconcile;
/// Claim path routing and the in-flight guard.
pub mod router;

pub use aggregate::{aggregate, SourceAggregator};
pub use engine::RewardEngine;
pub use estimate::{EstimateTicket, EstimateTracker, GasEstimator};
pub use reconcile::reconcile;
pub use router::{ClaimRouter, PreparedClaim};
