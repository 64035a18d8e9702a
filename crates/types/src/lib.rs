// Path: crates/types/src/lib.rs
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

//! # claimkit Types
//!
//! Core data structures, configuration and error types shared by every
//! claimkit crate. This crate has minimal dependencies to remain stable.

/// Claim batches and per-item outcomes.
pub mod batch;
/// Engine and adapter configuration.
pub mod config;
/// The `ClaimError` taxonomy and the `ErrorCode` trait.
pub mod error;
/// Cost estimates and exact unit formatting.
pub mod estimate;
/// Rewards, ids, proofs and campaign records.
pub mod reward;
/// The wallet/auth session passed into every call.
pub mod session;
/// Aggregated snapshots and reconciliation diffs.
pub mod snapshot;

pub use alloy_primitives::{Address, B256, U256};

/// A curated set of the most commonly used types.
pub mod prelude {
    pub use crate::batch::{BatchOutcome, BatchStatus, ClaimBatch, ItemOutcome};
    pub use crate::error::{ClaimError, ErrorCode};
    pub use crate::estimate::{CostEstimate, EstimateOutcome, GasSource};
    pub use crate::reward::{
        CampaignInfo, ClaimPath, ClaimProof, ClaimableReward, Entitlement, LedgerTerms,
        OnChainTerms, RewardId, RewardSource, RewardState, Timestamp,
    };
    pub use crate::session::ClaimSession;
    pub use crate::snapshot::{
        ClaimableSnapshot, ReconcileDiff, ReconciledState, Transition, UnavailableReward,
    };
    pub use alloy_primitives::{Address, B256, U256};
}
