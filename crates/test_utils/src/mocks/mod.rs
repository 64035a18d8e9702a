//! In-memory implementations of the adapter traits.

pub mod distributor;
pub mod ledger;

pub use distributor::{MockDistributor, SubmitBehavior};
pub use ledger::MockLedger;

use claimkit_api::Clock;
use claimkit_types::reward::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    /// A clock reading `now`.
    pub fn new(now: Timestamp) -> Self {
        Self(AtomicU64::new(now))
    }

    /// Moves the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.load(Ordering::SeqCst)
    }
}
