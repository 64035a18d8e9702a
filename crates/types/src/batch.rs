// Path: crates/types/src/batch.rs
//! Claim batches and their per-item outcomes.

use crate::error::ClaimError;
use crate::reward::{ClaimableReward, RewardId, RewardSource};
use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user-selected group of rewards submitted through one claim mechanism.
///
/// Construction enforces the batch rules: non-empty, a single source, a
/// single chain for on-chain batches, only `unclaimed` items, no duplicates
/// and a total amount that fits in `U256`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimBatch {
    source: RewardSource,
    chain_id: Option<u64>,
    items: Vec<ClaimableReward>,
    total_amount: U256,
}

impl ClaimBatch {
    /// Validates `items` and builds a batch.
    pub fn new(items: Vec<ClaimableReward>) -> Result<Self, ClaimError> {
        let first = items
            .first()
            .ok_or_else(|| ClaimError::InvalidBatch("batch is empty".into()))?;
        let source = first.source();
        let chain_id = first.chain_id();

        let mut seen = std::collections::HashSet::with_capacity(items.len());
        let mut total_amount = U256::ZERO;
        for item in &items {
            let id = item.id();
            if item.source() != source {
                return Err(ClaimError::InvalidBatch(format!(
                    "{id} is a {} reward in a {source} batch",
                    item.source()
                )));
            }
            if item.chain_id() != chain_id {
                return Err(ClaimError::InvalidBatch(format!(
                    "{id} is not on the batch's chain"
                )));
            }
            if !item.is_claimable() {
                return Err(ClaimError::InvalidBatch(format!(
                    "{id} is not claimable (state {:?})",
                    item.state
                )));
            }
            if !seen.insert(id.clone()) {
                return Err(ClaimError::InvalidBatch(format!("{id} selected twice")));
            }
            total_amount = total_amount
                .checked_add(item.amount)
                .ok_or_else(|| ClaimError::InvalidBatch("total amount overflows".into()))?;
        }

        Ok(Self {
            source,
            chain_id,
            items,
            total_amount,
        })
    }

    /// The claim path shared by every item.
    pub fn source(&self) -> RewardSource {
        self.source
    }

    /// The chain of an on-chain batch.
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// The selected items, in selection order.
    pub fn items(&self) -> &[ClaimableReward] {
        &self.items
    }

    /// Ids of the selected items, in selection order.
    pub fn ids(&self) -> Vec<RewardId> {
        self.items.iter().map(ClaimableReward::id).collect()
    }

    /// Number of items; never zero.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Exact sum of the selected amounts.
    pub fn total_amount(&self) -> U256 {
        self.total_amount
    }

    /// A key identifying this selection independently of item order, used
    /// by the in-flight guard.
    pub fn key(&self) -> String {
        let mut ids: Vec<String> = self.items.iter().map(|i| i.id().to_string()).collect();
        ids.sort();
        let chain = self
            .chain_id
            .map(|c| c.to_string())
            .unwrap_or_else(|| "ledger".to_string());
        format!("{chain}|{}", ids.join(","))
    }
}

/// Result for one item of a submitted batch, from the router's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The authority accepted the claim.
    Claimed,
    /// The outcome is unknown or the item is still claimable.
    Pending,
    /// The claim failed for this specific item.
    Failed(ClaimError),
}

/// Overall status of a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every item was claimed.
    Success,
    /// Some items were claimed and some failed.
    PartialSuccess,
    /// No item was claimed.
    Failure,
    /// The outcome is not known yet; a refresh will tell.
    Pending,
}

/// The router's view of a submitted batch. Reconciliation, not this
/// value, decides what the authorities actually recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// The batch key (see [`ClaimBatch::key`]).
    pub batch_key: String,
    /// The claim path used.
    pub source: RewardSource,
    /// Per-item results.
    pub per_item: BTreeMap<RewardId, ItemOutcome>,
    /// Transaction hash for on-chain batches that reached the chain.
    pub tx_hash: Option<B256>,
    /// Batch-level failure, e.g. a revert that failed every item at once.
    pub error: Option<ClaimError>,
}

impl BatchOutcome {
    /// Number of items reported claimed.
    pub fn claimed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Claimed))
    }

    /// Number of items reported failed.
    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    /// Number of items whose outcome is not known.
    pub fn pending_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Pending))
    }

    fn count(&self, f: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.per_item.values().filter(|o| f(o)).count()
    }

    /// Summarizes the per-item results.
    pub fn status(&self) -> BatchStatus {
        let claimed = self.claimed_count();
        let failed = self.failed_count();
        let pending = self.pending_count();
        let ambiguous = self.error.as_ref().map_or(true, ClaimError::is_ambiguous);
        if claimed > 0 {
            if failed == 0 && pending == 0 {
                BatchStatus::Success
            } else {
                BatchStatus::PartialSuccess
            }
        } else if pending > 0 && failed == 0 && ambiguous {
            BatchStatus::Pending
        } else {
            BatchStatus::Failure
        }
    }

    /// The item-level error recorded for `id`, if any.
    pub fn item_error(&self, id: &RewardId) -> Option<&ClaimError> {
        match self.per_item.get(id) {
            Some(ItemOutcome::Failed(e)) => Some(e),
            _ => None,
        }
    }
}
