// Path: crates/test_utils/src/lib.rs
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

//! # claimkit Test Utilities
//!
//! In-memory reward authorities, fixtures and assertion macros shared by the
//! engine, adapter and CLI tests.

pub mod assertions;
pub mod fixtures;
pub mod mocks;
