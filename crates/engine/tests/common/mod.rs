// Path: crates/engine/tests/common/mod.rs
#![allow(dead_code)]

use claimkit_api::ChainRegistry;
use claimkit_engine::RewardEngine;
use claimkit_test_utils::fixtures::{self, CHAIN_ID, NOW};
use claimkit_test_utils::mocks::{ManualClock, MockDistributor, MockLedger};
use claimkit_types::config::{ConfirmationConfig, GasConfig, RefreshConfig};
use claimkit_types::prelude::*;
use std::sync::Arc;

/// An engine wired to one mock distributor on [`CHAIN_ID`] and a mock ledger.
pub struct Harness {
    pub engine: Arc<RewardEngine>,
    pub distributor: Arc<MockDistributor>,
    pub ledger: Arc<MockLedger>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_confirmation(ConfirmationConfig::default())
    }

    pub fn with_confirmation(confirmation: ConfirmationConfig) -> Self {
        let distributor = Arc::new(MockDistributor::new(CHAIN_ID));
        let ledger = Arc::new(MockLedger::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let engine = RewardEngine::from_parts(
            ChainRegistry::new().with(distributor.clone()),
            ledger.clone(),
            clock.clone(),
            &GasConfig::default(),
            confirmation,
            RefreshConfig {
                interval_secs: 1,
                max_polls: 3,
            },
        );
        Self {
            engine: Arc::new(engine),
            distributor,
            ledger,
            clock,
        }
    }

    /// Publishes an on-chain entitlement backed by an active campaign.
    pub fn with_campaign(self, campaign_id: u64, amount: u64) -> Self {
        self.distributor
            .add_campaign(campaign_id, fixtures::campaign(campaign_id, NOW + 86_400));
        self.ledger
            .add_entitlement(fixtures::entitlement(campaign_id, amount));
        self
    }

    pub fn with_ledger_reward(self, id: &str, amount: u64) -> Self {
        self.ledger.add_reward(fixtures::ledger_reward(id, amount));
        self
    }

    pub async fn snapshot(&self) -> ClaimableSnapshot {
        self.engine
            .fetch_claimable_rewards(&fixtures::session())
            .await
            .expect("fetch claimable rewards")
    }
}

/// The claimable rewards of `snapshot` whose ids are in `ids`, in `ids` order.
pub fn select(snapshot: &ClaimableSnapshot, ids: &[RewardId]) -> Vec<ClaimableReward> {
    ids.iter()
        .map(|id| snapshot.get(id).cloned().expect("selected id in snapshot"))
        .collect()
}
