// Path: crates/api/src/source.rs
//! The two read/claim adapters the engine drives: one per reward authority.

use async_trait::async_trait;
use claimkit_types::prelude::*;
use std::time::Duration;

/// Arguments of one `claimReward` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCall {
    /// The distributor's campaign id.
    pub campaign_id: U256,
    /// The Merkle leaf amount.
    pub amount: U256,
    /// Sibling hashes, leaf to root.
    pub proof: Vec<B256>,
}

impl ClaimCall {
    /// Builds the call for an on-chain reward.
    ///
    /// Fails with `MissingClaimProof` when the reward has no proof or the
    /// proof is empty, and with `InvalidBatch` for a ledger reward.
    pub fn for_reward(reward: &ClaimableReward) -> Result<Self, ClaimError> {
        let ClaimPath::OnChain(terms) = &reward.path else {
            return Err(ClaimError::InvalidBatch(format!(
                "{} is not an on-chain reward",
                reward.id()
            )));
        };
        match &terms.proof {
            Some(proof) if !proof.is_empty() => Ok(Self {
                campaign_id: terms.campaign_id,
                amount: proof.leaf_amount,
                proof: proof.siblings.clone(),
            }),
            _ => Err(ClaimError::MissingClaimProof(reward.id())),
        }
    }
}

/// Terminal state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Included with success status.
    Confirmed {
        /// Inclusion block.
        block_number: u64,
    },
    /// Included with failure status.
    Reverted {
        /// Revert reason recovered by replaying the call, when available.
        reason: Option<String>,
    },
}

/// Read and submit access to one chain's reward distributor contract.
///
/// Implementations normalize every provider and contract failure into
/// [`ClaimError`] so callers never see transport-specific error shapes.
#[async_trait]
pub trait CampaignSource: Send + Sync {
    /// The chain this adapter talks to.
    fn chain_id(&self) -> u64;

    /// False when the configured distributor address is the zero sentinel.
    fn is_contract_deployed(&self) -> bool;

    /// Reads a campaign record.
    async fn get_campaign(&self, campaign_id: U256) -> Result<CampaignInfo, ClaimError>;

    /// Authoritative per-user claim status.
    async fn has_claimed(&self, campaign_id: U256, user: Address) -> Result<bool, ClaimError>;

    /// Whether the distributor is paused.
    async fn is_paused(&self) -> Result<bool, ClaimError>;

    /// Whether `account` is registered as a quest manager.
    async fn is_quest_manager(&self, account: Address) -> Result<bool, ClaimError>;

    /// Current network gas price in wei.
    async fn gas_price(&self) -> Result<u128, ClaimError>;

    /// Dry-run gas estimate of a single `claimReward`; never mutates state.
    async fn estimate_claim_gas(&self, user: Address, call: &ClaimCall) -> Result<u64, ClaimError>;

    /// Submits `claimReward` and returns the transaction hash without waiting.
    async fn claim_reward(&self, session: &ClaimSession, call: &ClaimCall)
        -> Result<B256, ClaimError>;

    /// Submits `batchClaimRewards` and returns the transaction hash without waiting.
    async fn batch_claim_rewards(
        &self,
        session: &ClaimSession,
        calls: &[ClaimCall],
    ) -> Result<B256, ClaimError>;

    /// Waits for the receipt of `tx_hash`. `None` waits indefinitely;
    /// otherwise elapsing yields `TransactionTimeout`.
    async fn await_confirmation(
        &self,
        tx_hash: B256,
        timeout: Option<Duration>,
    ) -> Result<Confirmation, ClaimError>;
}

/// What the ledger publishes for a user in one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerListing {
    /// Ledger-issued rewards.
    pub rewards: Vec<ClaimableReward>,
    /// On-chain allocations (with Merkle proofs) published for the user.
    pub entitlements: Vec<Entitlement>,
}

/// Authenticated access to the backend reward ledger.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Lists the user's ledger rewards and on-chain entitlements.
    async fn fetch_claimable(
        &self,
        session: &ClaimSession,
        user: Address,
    ) -> Result<LedgerListing, ClaimError>;

    /// Claims one ledger reward. The backend is idempotent per reward id.
    async fn claim(&self, session: &ClaimSession, reward_id: &str) -> Result<(), ClaimError>;
}

/// Source of the current time, injectable for deadline tests.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
