// Path: crates/types/src/snapshot.rs
//! Aggregated claimable views and the diff between two of them.

use crate::error::ClaimError;
use crate::reward::{ClaimableReward, RewardId, RewardState, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An on-chain entitlement that could not be surfaced as a claimable reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableReward {
    /// The id the reward would have had.
    pub id: RewardId,
    /// Human-readable cause.
    pub reason: String,
}

/// One aggregation pass over both authorities.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimableSnapshot {
    /// Rewards backed by a distributor contract.
    pub blockchain: Vec<ClaimableReward>,
    /// Rewards issued by the ledger.
    pub database: Vec<ClaimableReward>,
    /// On-chain entitlements whose chain or campaign is unavailable.
    #[serde(default)]
    pub unavailable: Vec<UnavailableReward>,
    /// `blockchain.len() + database.len()`.
    pub total: usize,
    /// When the pass ran (unix seconds).
    pub taken_at: Timestamp,
}

impl ClaimableSnapshot {
    /// Every reward of both partitions.
    pub fn iter(&self) -> impl Iterator<Item = &ClaimableReward> {
        self.blockchain.iter().chain(self.database.iter())
    }

    /// Looks up a reward by id in the partition its source implies.
    pub fn get(&self, id: &RewardId) -> Option<&ClaimableReward> {
        let partition = match id.source() {
            crate::reward::RewardSource::OnChain => &self.blockchain,
            crate::reward::RewardSource::Ledger => &self.database,
        };
        partition.iter().find(|r| &r.id() == id)
    }

    /// Rewards that may currently enter a batch.
    pub fn claimable(&self) -> impl Iterator<Item = &ClaimableReward> {
        self.iter().filter(|r| r.is_claimable())
    }

    /// True when the snapshot observed `id` as claimed.
    pub fn is_claimed(&self, id: &RewardId) -> bool {
        self.get(id)
            .is_some_and(|r| r.state == RewardState::Claimed)
    }

    /// True when `id` is claimed here or no longer listed at all.
    ///
    /// Authorities stop listing a reward once it is claimed, so absence
    /// counts as claimed. A reward held back as unavailable is not absent.
    pub fn is_settled(&self, id: &RewardId) -> bool {
        match self.get(id) {
            Some(r) => r.state == RewardState::Claimed,
            None => !self.unavailable.iter().any(|u| &u.id == id),
        }
    }
}

/// Post-attempt classification of one selected reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum ReconciledState {
    /// The authority now reports the reward claimed (or no longer lists it).
    Claimed,
    /// Still claimable, no item-level error.
    StillPending,
    /// Still unclaimed and the attempt recorded an error for it.
    Failed(ClaimError),
}

/// A state change of one reward between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The reward.
    pub id: RewardId,
    /// State in the previous snapshot; `None` if it was not listed.
    pub before: Option<RewardState>,
    /// State in the new snapshot; `None` if it is no longer listed.
    pub after: Option<RewardState>,
}

/// Output of reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconcileDiff {
    /// Classification of every selected reward.
    pub outcomes: BTreeMap<RewardId, ReconciledState>,
    /// Every reward whose state differs between the two snapshots.
    pub transitions: Vec<Transition>,
    /// The batch-level error of the attempt being reconciled, if any.
    pub batch_error: Option<ClaimError>,
}

impl ReconcileDiff {
    /// True when any selected reward is still pending.
    pub fn has_pending(&self) -> bool {
        self.outcomes
            .values()
            .any(|s| matches!(s, ReconciledState::StillPending))
    }

    /// Ids reconciled as claimed.
    pub fn claimed(&self) -> Vec<&RewardId> {
        self.outcomes
            .iter()
            .filter(|(_, s)| matches!(s, ReconciledState::Claimed))
            .map(|(id, _)| id)
            .collect()
    }
}
