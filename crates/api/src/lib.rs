// Path: crates/api/src/lib.rs

//! # claimkit API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure panic-free code.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
//! # claimkit API
//!
//! The stable contract between the engine and the reward authorities: the
//! distributor and ledger adapter traits, the clock, and the chain registry.

/// Chain id to distributor adapter resolution.
pub mod registry;
/// The `CampaignSource` and `LedgerSource` adapter traits.
pub mod source;

pub use registry::ChainRegistry;
pub use source::{
    CampaignSource, ClaimCall, Clock, Confirmation, LedgerListing, LedgerSource, SystemClock,
};
