// Path: crates/ledger/src/lib.rs
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

//! # claimkit Ledger
//!
//! The rewards ledger adapter: bearer-authenticated reads of the claimable
//! listing and one-shot claims of individual ledger rewards.

pub mod client;
pub mod wire;

pub use client::HttpLedgerClient;
